use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::manager::DatabaseManager;

/// GET /1.0/ - service description and the public route table
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": true,
        "data": {
            "name": "idOS API",
            "version": env!("CARGO_PKG_VERSION"),
            "commands": state.bus.registered().len(),
            "endpoints": {
                "health": "GET /1.0/health (public)",
                "sso": "POST /1.0/sso (public)",
                "companies": "/1.0/companies[/:companySlug] (company token)",
                "credentials": "/1.0/companies/:companySlug/credentials[/:pubKey] (company token)",
                "hooks": "/1.0/companies/:companySlug/credentials/:pubKey/hooks[/:hookId] (company token)",
                "services": "/1.0/companies/:companySlug/services[/:serviceId] (company token)",
                "settings": "/1.0/companies/:companySlug/settings[/:settingId] (company token)",
                "members": "/1.0/companies/:companySlug/members[/:memberId] (company token)",
                "access": "/1.0/access/roles[/:roleAccessId] (company token)",
                "profiles": "/1.0/profiles[/:userName] (credential token)",
                "profile_data": "/1.0/profiles/:userName/{attributes,features,scores,sources,candidates,tags,raw} (credential token)"
            }
        }
    }))
}

/// GET /1.0/health
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now().timestamp();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": false,
                    "error": {
                        "code": 503,
                        "message": "Database unavailable"
                    },
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
