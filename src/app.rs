//! Router assembly.

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bus::CommandBus;
use crate::config::config;
use crate::controllers::*;
use crate::database::Repositories;
use crate::error::ApiError;

/// Shared by every request: the bus runs commands, repositories back authentication
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<CommandBus>,
    pub repos: Repositories,
}

impl AppState {
    pub fn new(bus: CommandBus, repos: Repositories) -> Self {
        Self {
            bus: Arc::new(bus),
            repos,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(main::root))
        .route("/health", get(main::health))
        .route("/sso", post(sso::create_new))
        .merge(company_routes())
        .merge(profile_routes())
        .fallback(not_found);

    let app = Router::new()
        .nest("/1.0", api)
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive());

    if config().api.enable_request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Company token routes
fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", post(companies::create_new))
        .route(
            "/companies/:companySlug",
            get(companies::get_one).delete(companies::delete_one),
        )
        .route(
            "/companies/:companySlug/credentials",
            get(credentials::list_all).post(credentials::create_new),
        )
        .route(
            "/companies/:companySlug/credentials/:pubKey",
            get(credentials::get_one).delete(credentials::delete_one),
        )
        .route(
            "/companies/:companySlug/credentials/:pubKey/hooks",
            get(hooks::list_all).post(hooks::create_new).delete(hooks::delete_all),
        )
        .route(
            "/companies/:companySlug/credentials/:pubKey/hooks/:hookId",
            get(hooks::get_one).patch(hooks::update_one).delete(hooks::delete_one),
        )
        .route(
            "/companies/:companySlug/services",
            get(services::list_all).post(services::create_new).delete(services::delete_all),
        )
        .route(
            "/companies/:companySlug/services/:serviceId",
            get(services::get_one).patch(services::update_one).delete(services::delete_one),
        )
        .route(
            "/companies/:companySlug/settings",
            get(settings::list_all).post(settings::create_new).delete(settings::delete_all),
        )
        .route(
            "/companies/:companySlug/settings/:settingId",
            get(settings::get_one).patch(settings::update_one).delete(settings::delete_one),
        )
        .route(
            "/companies/:companySlug/members",
            get(members::list_all).post(members::create_new),
        )
        .route(
            "/companies/:companySlug/members/:memberId",
            axum::routing::patch(members::update_one).delete(members::delete_one),
        )
        .route(
            "/companies/:companySlug/permissions",
            get(permissions::list_all)
                .post(permissions::create_new)
                .delete(permissions::delete_all),
        )
        .route(
            "/companies/:companySlug/permissions/:routeName",
            get(permissions::get_one).delete(permissions::delete_one),
        )
        .route(
            "/access/roles",
            get(role_access::list_all).post(role_access::create_new),
        )
        .route(
            "/access/roles/:roleAccessId",
            axum::routing::patch(role_access::update_one).delete(role_access::delete_one),
        )
}

/// Credential token routes
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(profiles::create_new))
        .route("/profiles/:userName", axum::routing::delete(profiles::delete_one))
        .route(
            "/profiles/:userName/attributes",
            get(attributes::list_all)
                .post(attributes::create_new)
                .delete(attributes::delete_all),
        )
        .route(
            "/profiles/:userName/attributes/:attributeId",
            get(attributes::get_one)
                .patch(attributes::update_one)
                .delete(attributes::delete_one),
        )
        .route(
            "/profiles/:userName/features",
            get(features::list_all)
                .post(features::create_new)
                .put(features::upsert)
                .delete(features::delete_all),
        )
        .route("/profiles/:userName/features/bulk", put(features::upsert_bulk))
        .route(
            "/profiles/:userName/features/:featureId",
            get(features::get_one)
                .patch(features::update_one)
                .delete(features::delete_one),
        )
        .route(
            "/profiles/:userName/scores",
            get(scores::list_all)
                .post(scores::create_new)
                .put(scores::upsert)
                .delete(scores::delete_all),
        )
        .route(
            "/profiles/:userName/scores/:scoreId",
            get(scores::get_one).delete(scores::delete_one),
        )
        .route(
            "/profiles/:userName/sources",
            get(sources::list_all)
                .post(sources::create_new)
                .delete(sources::delete_all),
        )
        .route(
            "/profiles/:userName/sources/:sourceId",
            get(sources::get_one).delete(sources::delete_one),
        )
        .route(
            "/profiles/:userName/candidates",
            get(candidates::list_all)
                .post(candidates::create_new)
                .delete(candidates::delete_all),
        )
        .route(
            "/profiles/:userName/tags",
            get(tags::list_all).post(tags::create_new).delete(tags::delete_all),
        )
        .route("/profiles/:userName/tags/:tagSlug", axum::routing::delete(tags::delete_one))
        .route(
            "/profiles/:userName/raw",
            get(raw::list_all)
                .post(raw::create_new)
                .patch(raw::update_one)
                .put(raw::upsert)
                .delete(raw::delete_all),
        )
        .route(
            "/profiles/:userName/gates",
            get(gates::list_all)
                .post(gates::create_new)
                .put(gates::upsert)
                .delete(gates::delete_all),
        )
        .route(
            "/profiles/:userName/gates/:gateId",
            get(gates::get_one)
                .patch(gates::update_one)
                .delete(gates::delete_one),
        )
        .route(
            "/profiles/:userName/reviews",
            get(reviews::list_all)
                .post(reviews::create_new)
                .put(reviews::upsert)
                .delete(reviews::delete_all),
        )
        .route(
            "/profiles/:userName/reviews/:reviewId",
            get(reviews::get_one)
                .patch(reviews::update_one)
                .delete(reviews::delete_one),
        )
        .route(
            "/profiles/:userName/warnings",
            get(warnings::list_all)
                .post(warnings::create_new)
                .put(warnings::upsert)
                .delete(warnings::delete_all),
        )
        .route(
            "/profiles/:userName/warnings/:warningId",
            get(warnings::get_one)
                .patch(warnings::update_one)
                .delete(warnings::delete_one),
        )
        .route(
            "/profiles/:userName/flags",
            get(flags::list_all)
                .post(flags::create_new)
                .put(flags::upsert)
                .delete(flags::delete_all),
        )
        .route(
            "/profiles/:userName/flags/:flagId",
            get(flags::get_one).delete(flags::delete_one),
        )
        .route(
            "/profiles/:userName/processes",
            get(processes::list_all)
                .post(processes::create_new)
                .delete(processes::delete_all),
        )
        .route(
            "/profiles/:userName/processes/:processId",
            get(processes::get_one).delete(processes::delete_one),
        )
        .route(
            "/profiles/:userName/processes/:processId/tasks",
            get(tasks::list_all).post(tasks::create_new),
        )
        .route(
            "/profiles/:userName/processes/:processId/tasks/:taskId",
            get(tasks::get_one).patch(tasks::update_one).delete(tasks::delete_one),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{sign, Claims};
    use crate::bus::Collaborators;
    use crate::database::models::{Credential, Hook, User};
    use crate::optimus::optimus;
    use crate::testing::{
        repositories, seed_company, seed_credential, FakeHandshake, FakeProvider, InMemoryRepository,
        RecordingCache, RecordingQueue,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        company_token: String,
        credential: Credential,
        users: Arc<InMemoryRepository<User>>,
        hooks: Arc<InMemoryRepository<Hook>>,
    }

    async fn fixture() -> Fixture {
        let companies = Arc::new(InMemoryRepository::new());
        let credentials = Arc::new(InMemoryRepository::new());
        let users = Arc::new(InMemoryRepository::new());
        let hooks = Arc::new(InMemoryRepository::new());
        let mut repos = repositories();
        repos.companies = companies.clone();
        repos.credentials = credentials.clone();
        repos.users = users.clone();
        repos.hooks = hooks.clone();

        let company = seed_company(&companies, "Acme").await;
        let credential = seed_credential(&credentials, company.id.unwrap()).await;
        let company_token = sign(&Claims::new(company.public_key.clone(), None), &company.private_key).unwrap();

        let bus = CommandBus::wired(
            &repos,
            Collaborators {
                handshake: Arc::new(FakeHandshake::accepting()),
                provider: Arc::new(FakeProvider::answering(json!({"id": "fb-1"}))),
                cache: Arc::new(RecordingCache::default()),
                queue: Arc::new(RecordingQueue::default()),
            },
        );
        Fixture {
            app: router(AppState::new(bus, repos)),
            company_token,
            credential,
            users,
            hooks,
        }
    }

    impl Fixture {
        fn credential_token(&self, subject: Option<&str>) -> String {
            let claims = Claims::new(self.credential.public.clone(), subject.map(str::to_string));
            sign(&claims, &self.credential.private).unwrap()
        }

        async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header("authorization", format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => request
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, body)
        }
    }

    #[tokio::test]
    async fn root_is_public() {
        let f = fixture().await;
        let (status, body) = f.call("GET", "/1.0", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], true);
        assert_eq!(body["data"]["name"], "idOS API");
    }

    #[tokio::test]
    async fn unknown_routes_use_the_error_envelope() {
        let f = fixture().await;
        let (status, body) = f.call("GET", "/1.0/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], false);
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn company_routes_need_a_company_token() {
        let f = fixture().await;
        let (status, body) = f.call("GET", "/1.0/companies/acme", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], false);

        // A credential token is signed by the wrong kind of key pair
        let token = f.credential_token(None);
        let (status, _) = f.call("GET", "/1.0/companies/acme", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = f.call("GET", "/1.0/companies/acme", Some(&f.company_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "acme");
        assert!(body["data"].get("private_key").is_none());
        assert!(body["updated"].is_i64());
    }

    #[tokio::test]
    async fn other_company_slugs_are_not_found() {
        let f = fixture().await;
        let (status, _) = f
            .call("GET", "/1.0/companies/globex/credentials", Some(&f.company_token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn hooks_are_created_through_the_bus() {
        let f = fixture().await;
        let uri = format!("/1.0/companies/acme/credentials/{}/hooks", f.credential.public);
        let (status, body) = f
            .call(
                "POST",
                &uri,
                Some(&f.company_token),
                Some(json!({"trigger": "idos:feature.created", "url": "https://hooks.example.com/x", "subscribed": true})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], true);
        assert_eq!(body["data"]["trigger"], "idos:feature.created");
        assert_eq!(body["data"]["subscribed"], true);
        assert_eq!(f.hooks.len(), 1);

        let hook_id = body["data"]["id"].as_i64().unwrap();
        let (status, body) = f
            .call("GET", &format!("{}/{}", uri, hook_id), Some(&f.company_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["url"], "https://hooks.example.com/x");

        let (status, body) = f.call("DELETE", &uri, Some(&f.company_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": true, "deleted": 1}));
    }

    #[tokio::test]
    async fn undecodable_path_ids_are_not_found() {
        let f = fixture().await;
        let uri = format!("/1.0/companies/acme/credentials/{}/hooks/abc", f.credential.public);
        let (status, _) = f.call("GET", &uri, Some(&f.company_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profiles_and_features() {
        let f = fixture().await;
        let token = f.credential_token(None);

        let (status, body) = f
            .call("POST", "/1.0/profiles", Some(&token), Some(json!({"username": "jdoe"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["username"], "jdoe");
        assert_eq!(f.users.len(), 1);

        let (status, body) = f
            .call(
                "PUT",
                "/1.0/profiles/jdoe/features",
                Some(&token),
                Some(json!({"name": "age", "value": 30})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "age");

        let (status, _) = f
            .call(
                "PUT",
                "/1.0/profiles/jdoe/features",
                Some(&token),
                Some(json!({"name": "age", "value": 31})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = f.call("GET", "/1.0/profiles/jdoe/features", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["value"], 31);

        let (_, body) = f.call("DELETE", "/1.0/profiles/jdoe/features", Some(&token), None).await;
        assert_eq!(body["deleted"], 1);
        let (_, body) = f.call("GET", "/1.0/profiles/jdoe/features", Some(&token), None).await;
        assert_eq!(body["data"], json!([]));
        assert!(body["updated"].is_null());
    }

    #[tokio::test]
    async fn gates_and_their_reviews() {
        let f = fixture().await;
        let token = f.credential_token(None);
        f.call("POST", "/1.0/profiles", Some(&token), Some(json!({"username": "jdoe"})))
            .await;

        let (status, body) = f
            .call(
                "PUT",
                "/1.0/profiles/jdoe/gates",
                Some(&token),
                Some(json!({"name": "KYC Basic", "pass": false})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["slug"], "kyc-basic");
        let gate_id = body["data"]["id"].clone();

        let (status, body) = f
            .call(
                "PUT",
                "/1.0/profiles/jdoe/reviews",
                Some(&token),
                Some(json!({"gate_id": gate_id, "positive": true, "description": "documents match"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["gate_id"], gate_id);

        let (status, body) = f.call("GET", "/1.0/profiles/jdoe/reviews", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["positive"], true);

        let (_, body) = f
            .call("DELETE", &format!("/1.0/profiles/jdoe/gates/{}", gate_id), Some(&token), None)
            .await;
        assert_eq!(body, json!({"status": true}));
        let (_, body) = f.call("GET", "/1.0/profiles/jdoe/reviews", Some(&token), None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn tasks_are_listed_by_page() {
        let f = fixture().await;
        let token = f.credential_token(None);
        f.call("POST", "/1.0/profiles", Some(&token), Some(json!({"username": "jdoe"})))
            .await;

        let (status, body) = f
            .call(
                "POST",
                "/1.0/profiles/jdoe/processes",
                Some(&token),
                Some(json!({"name": "scrape", "event": "idos:source.created"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let tasks = format!("/1.0/profiles/jdoe/processes/{}/tasks", body["data"]["id"]);

        for name in ["fetch", "parse", "map"] {
            let (status, _) = f
                .call(
                    "POST",
                    &tasks,
                    Some(&token),
                    Some(json!({"name": name, "event": "idos:source.created", "running": true})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = f
            .call("GET", &format!("{}?page=1&perPage=2", tasks), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["last_page"], 2);
    }

    #[tokio::test]
    async fn permissions_are_granted_per_company() {
        let f = fixture().await;
        let uri = "/1.0/companies/acme/permissions";
        let (status, body) = f
            .call("POST", uri, Some(&f.company_token), Some(json!({"route_name": "gate:listAll"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["route_name"], "gate:listAll");

        let (status, body) = f
            .call("GET", &format!("{}/gate:listAll", uri), Some(&f.company_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["route_name"], "gate:listAll");

        let (status, _) = f
            .call("GET", &format!("{}/gate:getOne", uri), Some(&f.company_token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = f.call("DELETE", uri, Some(&f.company_token), None).await;
        assert_eq!(body, json!({"status": true, "deleted": 1}));
    }

    #[tokio::test]
    async fn unknown_profiles_are_not_found() {
        let f = fixture().await;
        let token = f.credential_token(None);
        let (status, body) = f.call("GET", "/1.0/profiles/ghost/tags", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "User not found");
    }

    #[tokio::test]
    async fn user_tokens_only_reach_their_own_profile() {
        let f = fixture().await;
        let token = f.credential_token(None);
        for username in ["alice", "bob"] {
            f.call("POST", "/1.0/profiles", Some(&token), Some(json!({"username": username})))
                .await;
        }

        let alice = f.credential_token(Some("alice"));
        let (status, _) = f.call("GET", "/1.0/profiles/alice/tags", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = f.call("GET", "/1.0/profiles/bob/tags", Some(&alice), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let invalid = f.credential_token(Some("invalid*subject"));
        let (status, body) = f.call("GET", "/1.0/profiles/alice/tags", Some(&invalid), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid Subject Claim");
    }

    #[tokio::test]
    async fn sso_returns_a_user_token() {
        let f = fixture().await;
        let (status, body) = f
            .call(
                "POST",
                "/1.0/sso",
                None,
                Some(json!({"provider": "facebook", "credential": f.credential.public, "access_token": "t"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["data"].as_str().unwrap();
        let claims = crate::auth::verify(token, &f.credential.private).unwrap();
        assert_eq!(claims.iss, f.credential.public);
        assert_eq!(f.users.len(), 1);
    }

    #[tokio::test]
    async fn encoded_body_ids_are_decoded() {
        let f = fixture().await;
        let token = f.credential_token(None);
        f.call("POST", "/1.0/profiles", Some(&token), Some(json!({"username": "jdoe"})))
            .await;

        // No source 5 exists for the user, so the decoded id fails the ownership check
        let source_id = optimus().encode(5).unwrap();
        let (status, _) = f
            .call(
                "POST",
                "/1.0/profiles/jdoe/features",
                Some(&token),
                Some(json!({"name": "age", "value": 1, "source_id": source_id})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = f
            .call(
                "POST",
                "/1.0/profiles/jdoe/features",
                Some(&token),
                Some(json!({"name": "age", "value": 1, "source_id": "garbage"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
