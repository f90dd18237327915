use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::command::Upserted;
use crate::database::models::Entity;
use crate::database::repository::Page;
use crate::error::ApiError;

/// Successful response body: `{status: true, ...}`
#[derive(Debug)]
pub struct ApiResponse {
    pub body: Value,
    pub status_code: StatusCode,
}

impl ApiResponse {
    fn with_status(body: Value, status_code: StatusCode) -> Self {
        Self { body, status_code }
    }

    /// `{status, data, updated}` for a single entity
    pub fn entity<E: Entity>(entity: &E) -> Result<Self, ApiError> {
        Ok(Self::with_status(
            json!({
                "status": true,
                "data": to_data(entity)?,
                "updated": entity.last_modified()
            }),
            StatusCode::OK,
        ))
    }

    /// `{status, data, updated}` where `updated` is the latest change in the listing, or null
    pub fn collection<E: Entity>(entities: &[E]) -> Result<Self, ApiError> {
        let updated = entities.iter().map(Entity::last_modified).max();
        Ok(Self::with_status(
            json!({
                "status": true,
                "data": to_data(&entities)?,
                "updated": updated
            }),
            StatusCode::OK,
        ))
    }

    /// Listing plus `pagination`
    pub fn page<E: Entity>(page: &Page<E>) -> Result<Self, ApiError> {
        let mut response = Self::collection(&page.data)?;
        response.body["pagination"] = to_data(&page.pagination)?;
        Ok(response)
    }

    /// 201 `{status, data}`
    pub fn created<T: Serialize>(data: &T) -> Result<Self, ApiError> {
        Ok(Self::with_status(
            json!({ "status": true, "data": to_data(data)? }),
            StatusCode::CREATED,
        ))
    }

    /// `{status, data}`, 201 when the row was inserted and 200 when it was replaced
    pub fn upserted<E: Entity>(upserted: &Upserted<E>) -> Result<Self, ApiError> {
        let status = if upserted.created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Ok(Self::with_status(
            json!({ "status": true, "data": to_data(&upserted.entity)? }),
            status,
        ))
    }

    /// `{status, data}` with a 200
    pub fn data<T: Serialize>(data: &T) -> Result<Self, ApiError> {
        Ok(Self::with_status(
            json!({ "status": true, "data": to_data(data)? }),
            StatusCode::OK,
        ))
    }

    pub fn deleted(count: u64) -> Self {
        Self::with_status(json!({ "status": true, "deleted": count }), StatusCode::OK)
    }

    pub fn done() -> Self {
        Self::with_status(json!({ "status": true }), StatusCode::OK)
    }
}

fn to_data<T: Serialize + ?Sized>(data: &T) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        ApiError::internal("Failed to serialize response data")
    })
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status_code, Json(self.body)).into_response()
    }
}

pub type ApiResult = Result<ApiResponse, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Tag;
    use chrono::{Duration, Utc};

    fn tag(name: &str, age_secs: i64) -> Tag {
        let mut tag = Tag::new(1, 1, name);
        tag.id = Some(1);
        tag.created_at = Utc::now() - Duration::seconds(age_secs);
        tag
    }

    #[test]
    fn single_entities_carry_their_last_change() {
        let tag = tag("vip", 0);
        let response = ApiResponse::entity(&tag).unwrap();
        assert_eq!(response.status_code, StatusCode::OK);
        assert_eq!(response.body["status"], true);
        assert_eq!(response.body["data"]["name"], "vip");
        assert_eq!(response.body["updated"], tag.last_modified());
    }

    #[test]
    fn empty_listings_have_no_update_time() {
        let response = ApiResponse::collection::<Tag>(&[]).unwrap();
        assert_eq!(response.body["data"], json!([]));
        assert!(response.body["updated"].is_null());

        let (old, new) = (tag("old", 500), tag("new", 10));
        let response = ApiResponse::collection(&[old, new.clone()]).unwrap();
        assert_eq!(response.body["updated"], new.last_modified());
    }

    #[test]
    fn upserts_answer_created_or_ok() {
        let inserted = Upserted {
            entity: tag("vip", 0),
            created: true,
        };
        assert_eq!(ApiResponse::upserted(&inserted).unwrap().status_code, StatusCode::CREATED);

        let replaced = Upserted {
            created: false,
            ..inserted
        };
        assert_eq!(ApiResponse::upserted(&replaced).unwrap().status_code, StatusCode::OK);
    }

    #[test]
    fn pages_carry_their_position() {
        let data = vec![tag("vip", 0)];
        let pagination = crate::database::repository::Pagination::new(3, 2, 2, data.len());
        let response = ApiResponse::page(&Page { data, pagination }).unwrap();
        assert_eq!(response.body["data"][0]["name"], "vip");
        assert_eq!(response.body["pagination"]["total"], 3);
        assert_eq!(response.body["pagination"]["current_page"], 2);
        assert_eq!(response.body["pagination"]["from"], 3);
    }

    #[test]
    fn deletions() {
        assert_eq!(ApiResponse::deleted(3).body, json!({"status": true, "deleted": 3}));
        assert_eq!(ApiResponse::done().body, json!({"status": true}));
    }
}
