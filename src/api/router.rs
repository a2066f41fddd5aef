//! Clinic API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Auth validator (protected routes) → 3. Audit logger

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints::{self, reference};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;
use crate::models::ReferenceTable;

/// Build the clinic API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/profile", get(endpoints::auth::profile))
        // Patients
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/exists", get(endpoints::patients::exists))
        .route("/patients/import-excel", post(endpoints::patients::import))
        .route(
            "/patients/:id",
            get(endpoints::patients::get)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        // Companies
        .route(
            "/companies",
            get(endpoints::companies::list).post(endpoints::companies::create),
        )
        .route(
            "/companies/:id",
            get(endpoints::companies::get)
                .put(endpoints::companies::update)
                .delete(endpoints::companies::delete),
        )
        .route(
            "/companies/:id/units",
            get(endpoints::companies::list_units).post(endpoints::companies::create_unit),
        )
        // Protocols
        .route(
            "/protocols",
            get(endpoints::protocols::list).post(endpoints::protocols::create),
        )
        .route(
            "/protocols/:id",
            get(endpoints::protocols::get)
                .put(endpoints::protocols::update)
                .delete(endpoints::protocols::delete),
        )
        // Payments
        .route(
            "/payments",
            get(endpoints::payments::list).post(endpoints::payments::create),
        )
        .route("/payments/summary", get(endpoints::payments::summary))
        .route(
            "/payments/:id",
            get(endpoints::payments::get)
                .put(endpoints::payments::update)
                .delete(endpoints::payments::delete),
        )
        // Lab results
        .route(
            "/lab-results",
            get(endpoints::lab_results::list).post(endpoints::lab_results::create),
        )
        .route(
            "/lab-results/:id",
            get(endpoints::lab_results::get)
                .put(endpoints::lab_results::update)
                .delete(endpoints::lab_results::delete),
        )
        .route("/lab-results/:id/accept", post(endpoints::lab_results::accept))
        .route("/lab-results/:id/approve", post(endpoints::lab_results::approve))
        // Reference data
        .route(
            "/examination-types",
            reference::named_collection(ReferenceTable::ExaminationTypes),
        )
        .route(
            "/service-groups",
            reference::named_collection(ReferenceTable::ServiceGroups),
        )
        .route(
            "/payment-types",
            reference::named_collection(ReferenceTable::PaymentTypes),
        )
        .route(
            "/cash-registers",
            reference::named_collection(ReferenceTable::CashRegisters),
        )
        .route(
            "/sample-rejection-reasons",
            reference::named_collection(ReferenceTable::SampleRejectionReasons),
        )
        .route(
            "/sample-statuses",
            get(reference::list_sample_statuses).post(reference::create_sample_status),
        )
        .route(
            "/external-labs",
            get(reference::list_external_labs).post(reference::create_external_lab),
        )
        .route(
            "/services",
            get(reference::list_services).post(reference::create_service),
        )
        .route(
            "/web-result-users",
            get(reference::list_web_result_users).post(reference::create_web_result_user),
        )
        .route(
            "/protocol-services",
            get(reference::list_protocol_services).post(reference::create_protocol_service),
        )
        .route(
            "/external-lab-submissions",
            get(reference::list_submissions).post(reference::create_submission),
        )
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (no token yet, or liveness probes)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/init-admin", post(endpoints::auth::init_admin))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Datelike;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{AppConfig, ProtocolDeletePolicy};

    struct TestApp {
        app: Router,
        _tmp: tempfile::TempDir,
    }

    fn test_app_with(policy: ProtocolDeletePolicy) -> TestApp {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::with_db_path(tmp.path().join("osgb.db"));
        config.protocol_delete_policy = policy;
        let core = Arc::new(CoreState::initialize(config).unwrap());
        TestApp {
            app: api_router(core),
            _tmp: tmp,
        }
    }

    fn test_app() -> TestApp {
        test_app_with(ProtocolDeletePolicy::Restrict)
    }

    impl TestApp {
        async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(t) = token {
                builder = builder.header("Authorization", format!("Bearer {t}"));
            }
            let req = match body {
                Some(json) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.dispatch(req).await
        }

        async fn dispatch(&self, req: Request<Body>) -> (StatusCode, Value) {
            let response = self.app.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        /// Bootstrap the admin account and return its token.
        async fn admin_token(&self) -> String {
            let (status, _) = self
                .send(
                    "POST",
                    "/api/auth/init-admin",
                    None,
                    Some(json!({"username": "admin", "password": "admin-pass", "full_name": "Admin"})),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            self.login("admin", "admin-pass").await
        }

        async fn login(&self, username: &str, password: &str) -> String {
            let (status, body) = self
                .send(
                    "POST",
                    "/api/auth/login",
                    None,
                    Some(json!({"username": username, "password": password})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "login failed: {body}");
            body["token"].as_str().unwrap().to_string()
        }

        async fn staff_token(&self, admin: &str) -> String {
            let (status, _) = self
                .send(
                    "POST",
                    "/api/auth/register",
                    Some(admin),
                    Some(json!({
                        "username": "nurse",
                        "password": "nurse-pass",
                        "full_name": "Nurse One",
                        "role": "user"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            self.login("nurse", "nurse-pass").await
        }

        async fn create(&self, token: &str, uri: &str, body: Value) -> Value {
            let (status, json) = self.send("POST", uri, Some(token), Some(body)).await;
            assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {json}");
            json
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let t = test_app();
        let (status, body) = t.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let t = test_app();
        let (status, body) = t.send("GET", "/api/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = t.send("GET", "/api/patients", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn init_admin_only_works_once() {
        let t = test_app();
        t.admin_token().await;
        let (status, _) = t
            .send(
                "POST",
                "/api/auth/init-admin",
                None,
                Some(json!({"username": "second", "password": "x", "full_name": "Second"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let t = test_app();
        t.admin_token().await;
        let (status, _) = t
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"username": "admin", "password": "wrong"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = t
            .send("POST", "/api/auth/login", None, Some(json!({"username": "admin"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_returns_current_user_without_hash() {
        let t = test_app();
        let token = t.admin_token().await;
        let (status, body) = t.send("GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "admin");
        assert_eq!(body["role"], "admin");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_is_admin_only() {
        let t = test_app();
        let admin = t.admin_token().await;
        let staff = t.staff_token(&admin).await;
        let (status, _) = t
            .send(
                "POST",
                "/api/auth/register",
                Some(&staff),
                Some(json!({"username": "x", "password": "y", "full_name": "Z", "role": "user"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_json_is_a_400_with_error_body() {
        let t = test_app();
        let token = t.admin_token().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/patients")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = t.dispatch(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn ayse_hemogram_protocol_end_to_end() {
        let t = test_app();
        let token = t.admin_token().await;

        let patient = t
            .create(
                &token,
                "/api/patients",
                json!({"first_name": "Ayşe", "last_name": "Yılmaz", "gender": "Kadın"}),
            )
            .await;
        let exam = t
            .create(&token, "/api/examination-types", json!({"name": "Hemogram"}))
            .await;
        let protocol = t
            .create(
                &token,
                "/api/protocols",
                json!({
                    "patient_id": patient["id"],
                    "examination_type_id": exam["id"],
                    "total_amount": 450
                }),
            )
            .await;

        let year = chrono::Utc::now().year();
        assert_eq!(protocol["protocol_number"], format!("P{year}000001"));
        assert_eq!(protocol["paid_amount"], 0.0);
        assert_eq!(protocol["total_amount"], 450.0);
        assert_eq!(protocol["patient"]["first_name"], "Ayşe");
        assert_eq!(protocol["examination_type"]["name"], "Hemogram");
    }

    #[tokio::test]
    async fn payments_keep_paid_amount_in_sync() {
        let t = test_app();
        let token = t.admin_token().await;
        let patient = t
            .create(
                &token,
                "/api/patients",
                json!({"first_name": "Mehmet", "last_name": "Kaya", "gender": "Erkek"}),
            )
            .await;
        let exam = t
            .create(&token, "/api/examination-types", json!({"name": "Odyometri"}))
            .await;
        let protocol = t
            .create(
                &token,
                "/api/protocols",
                json!({"patient_id": patient["id"], "examination_type_id": exam["id"], "total_amount": 300}),
            )
            .await;
        let protocol_uri = format!("/api/protocols/{}", protocol["id"]);

        let first = t
            .create(&token, "/api/payments", json!({"protocol_id": protocol["id"], "amount": 100, "payment_type_id": 1}))
            .await;
        t.create(&token, "/api/payments", json!({"protocol_id": protocol["id"], "amount": 50.5}))
            .await;

        let (_, body) = t.send("GET", &protocol_uri, Some(&token), None).await;
        assert_eq!(body["paid_amount"], 150.5);
        assert_eq!(body["payments"].as_array().unwrap().len(), 2);

        let (status, _) = t
            .send("DELETE", &format!("/api/payments/{}", first["id"]), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = t.send("GET", &protocol_uri, Some(&token), None).await;
        assert_eq!(body["paid_amount"], 50.5);

        let (status, summary) = t.send("GET", "/api/payments/summary", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total"], 50.5);

        let (status, _) = t
            .send("GET", "/api/payments?start_date=not-a-date", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patient_exists_endpoint() {
        let t = test_app();
        let token = t.admin_token().await;
        let uri = "/api/patients/exists?tc_identity_number=12345678901";

        let (status, body) = t.send("GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"exists": false}));

        let patient = t
            .create(
                &token,
                "/api/patients",
                json!({
                    "first_name": "Ali",
                    "last_name": "Demir",
                    "gender": "Erkek",
                    "tc_identity_number": "12345678901"
                }),
            )
            .await;
        let (_, body) = t.send("GET", uri, Some(&token), None).await;
        assert_eq!(body, json!({"exists": true, "id": patient["id"]}));

        let (status, _) = t
            .send("GET", "/api/patients/exists?tc_identity_number=123", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_national_id_is_a_conflict() {
        let t = test_app();
        let token = t.admin_token().await;
        let body = json!({
            "first_name": "Zeynep",
            "last_name": "Ak",
            "gender": "Kadın",
            "tc_identity_number": "10000000146"
        });
        t.create(&token, "/api/patients", body.clone()).await;
        let (status, json) = t.send("POST", "/api/patients", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "CONFLICT");

        // No national id: never checked.
        for _ in 0..2 {
            t.create(
                &token,
                "/api/patients",
                json!({"first_name": "Anon", "last_name": "Hasta", "gender": "Diğer"}),
            )
            .await;
        }
    }

    #[tokio::test]
    async fn deletes_are_admin_only() {
        let t = test_app();
        let admin = t.admin_token().await;
        let staff = t.staff_token(&admin).await;
        let patient = t
            .create(
                &staff,
                "/api/patients",
                json!({"first_name": "Can", "last_name": "Öz", "gender": "Erkek"}),
            )
            .await;
        let uri = format!("/api/patients/{}", patient["id"]);

        let (status, _) = t.send("DELETE", &uri, Some(&staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = t.send("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = t.send("GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patient_update_clears_with_null_and_keeps_absent() {
        let t = test_app();
        let token = t.admin_token().await;
        let patient = t
            .create(
                &token,
                "/api/patients",
                json!({"first_name": "Elif", "last_name": "Şen", "gender": "Kadın", "mobile_phone": "5551112233", "email": "e@x.com"}),
            )
            .await;
        let uri = format!("/api/patients/{}", patient["id"]);

        let (status, body) = t
            .send("PUT", &uri, Some(&token), Some(json!({"mobile_phone": null})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mobile_phone"], Value::Null);
        assert_eq!(body["email"], "e@x.com");

        let (status, _) = t
            .send("PUT", &uri, Some(&token), Some(json!({"first_name": null})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn companies_embed_units() {
        let t = test_app();
        let token = t.admin_token().await;
        let company = t
            .create(&token, "/api/companies", json!({"name": "Acme Tekstil"}))
            .await;
        assert_eq!(company["is_active"], true);
        let units_uri = format!("/api/companies/{}/units", company["id"]);
        t.create(&token, &units_uri, json!({"name": "Boyahane"})).await;

        let (_, units) = t.send("GET", &units_uri, Some(&token), None).await;
        assert_eq!(units.as_array().unwrap().len(), 1);

        let (_, list) = t
            .send("GET", "/api/companies?search=acme&is_active=true", Some(&token), None)
            .await;
        assert_eq!(list[0]["units"][0]["name"], "Boyahane");

        let (status, _) = t
            .send("POST", "/api/companies/999/units", Some(&token), Some(json!({"name": "X"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lab_sample_workflow_has_no_transition_guard() {
        let t = test_app();
        let token = t.admin_token().await;
        let patient = t
            .create(
                &token,
                "/api/patients",
                json!({"first_name": "Deniz", "last_name": "Kurt", "gender": "Erkek"}),
            )
            .await;
        let exam = t
            .create(&token, "/api/examination-types", json!({"name": "Biyokimya"}))
            .await;
        let group = t
            .create(&token, "/api/service-groups", json!({"name": "Laboratuvar"}))
            .await;
        let service = t
            .create(
                &token,
                "/api/services",
                json!({"name": "Glukoz", "service_group_id": group["id"], "price": 80}),
            )
            .await;
        let protocol = t
            .create(
                &token,
                "/api/protocols",
                json!({
                    "patient_id": patient["id"],
                    "examination_type_id": exam["id"],
                    "total_amount": 80,
                    "services": [{"service_id": service["id"]}, {"service_id": 9999}]
                }),
            )
            .await;
        assert_eq!(protocol["services"][0]["price"], 80.0);
        assert_eq!(protocol["skipped_services"][0]["service_id"], 9999);

        let line_id = protocol["services"][0]["id"].clone();
        let result = t
            .create(&token, "/api/lab-results", json!({"protocol_service_id": line_id, "barcode_number": "B-1"}))
            .await;
        assert_eq!(result["status"], "pending");

        let approve_uri = format!("/api/lab-results/{}/approve", result["id"]);
        let (status, approved) = t.send("POST", &approve_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "completed");
        assert!(approved["approval_date"].is_string());

        let accept_uri = format!("/api/lab-results/{}/accept", result["id"]);
        let (status, accepted) = t.send("POST", &accept_uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "processing");
        assert!(accepted["acceptance_date"].is_string());
    }

    #[tokio::test]
    async fn protocol_delete_restrict_blocks_payments() {
        let t = test_app();
        let token = t.admin_token().await;
        let patient = t
            .create(&token, "/api/patients", json!({"first_name": "Oya", "last_name": "Er", "gender": "Kadın"}))
            .await;
        let exam = t
            .create(&token, "/api/examination-types", json!({"name": "EKG"}))
            .await;
        let protocol = t
            .create(
                &token,
                "/api/protocols",
                json!({"patient_id": patient["id"], "examination_type_id": exam["id"], "total_amount": 100}),
            )
            .await;
        t.create(&token, "/api/payments", json!({"protocol_id": protocol["id"], "amount": 100}))
            .await;

        let uri = format!("/api/protocols/{}", protocol["id"]);
        let (status, body) = t.send("DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn protocol_delete_cascade_removes_dependents() {
        let t = test_app_with(ProtocolDeletePolicy::Cascade);
        let token = t.admin_token().await;
        let patient = t
            .create(&token, "/api/patients", json!({"first_name": "Oya", "last_name": "Er", "gender": "Kadın"}))
            .await;
        let exam = t
            .create(&token, "/api/examination-types", json!({"name": "EKG"}))
            .await;
        let protocol = t
            .create(
                &token,
                "/api/protocols",
                json!({"patient_id": patient["id"], "examination_type_id": exam["id"], "total_amount": 100}),
            )
            .await;
        t.create(&token, "/api/payments", json!({"protocol_id": protocol["id"], "amount": 100}))
            .await;

        let uri = format!("/api/protocols/{}", protocol["id"]);
        let (status, _) = t.send("DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, payments) = t.send("GET", "/api/payments", Some(&token), None).await;
        assert!(payments.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reference_tables_list_seeded_rows() {
        let t = test_app();
        let token = t.admin_token().await;

        let (status, types) = t.send("GET", "/api/payment-types", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(types.as_array().unwrap().len(), 3);

        let (_, statuses) = t.send("GET", "/api/sample-statuses", Some(&token), None).await;
        let codes: Vec<&str> = statuses
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["code"].as_str())
            .collect();
        assert!(codes.contains(&"accepted"));
        assert!(codes.contains(&"completed"));

        let (status, _) = t
            .send("POST", "/api/cash-registers", Some(&token), Some(json!({"description": "no name"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_endpoint_accepts_multipart_csv() {
        let t = test_app();
        let token = t.admin_token().await;

        let csv = "first_name,last_name,gender\nAyşe,Yılmaz,Kadın\nAli,Veli,\n";
        let boundary = "osgb-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"patients.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/patients/import-excel")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let (status, report) = t.dispatch(req).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["imported"], 1);
        assert_eq!(report["skipped"][0]["row"], 3);
    }

    #[tokio::test]
    async fn import_endpoint_accepts_xlsx_upload() {
        let t = test_app();
        let token = t.admin_token().await;

        let mut book = rust_xlsxwriter::Workbook::new();
        let sheet = book.add_worksheet();
        for (col, text) in ["first_name", "last_name", "gender"].iter().enumerate() {
            sheet.write_string(0, col as u16, *text).unwrap();
        }
        for (col, text) in ["Zeynep", "Şahin", "Kadın"].iter().enumerate() {
            sheet.write_string(1, col as u16, *text).unwrap();
        }
        let xlsx = book.save_to_buffer().unwrap();

        let boundary = "osgb-test-boundary";
        let mut body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"hastalar.xlsx\"\r\n\
             Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&xlsx);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        let req = Request::builder()
            .method("POST")
            .uri("/api/patients/import-excel")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let (status, report) = t.dispatch(req).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["imported"], 1);
        assert_eq!(report["patients"][0]["first_name"], "Zeynep");
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let t = test_app();
        let (status, _) = t.send("GET", "/api/nonexistent", None, None).await;
        // Unmatched paths 404 before the auth layer runs.
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
