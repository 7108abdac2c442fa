//! HTTP surface tests
//!
//! Drives the full router (auth extractors, validation, error mapping)
//! over the in-memory store.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{admin, user, Fixture, PRINCIPAL};
use quickfund_server::auth::AuthService;
use quickfund_server::loan::LoanStatus;
use quickfund_server::models::Actor;
use quickfund_server::routes::{app_router, health_routes};
use quickfund_server::state::AppState;

const SECRET: &str = "api-test-secret";

struct TestApp {
    fx: Fixture,
    router: Router,
    auth: Arc<AuthService>,
}

impl TestApp {
    fn new() -> Self {
        let fx = Fixture::new();
        let auth = Arc::new(AuthService::new(SECRET.to_string(), 900));
        let router = app_router(AppState::new(
            fx.ledger.clone(),
            fx.reports.clone(),
            auth.clone(),
        ));
        Self { fx, router, auth }
    }

    fn token(&self, actor: &Actor) -> String {
        self.auth
            .issue_access_token(actor.id, actor.role)
            .expect("issue token")
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn as_actor(
        &self,
        actor: &Actor,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token(actor);
        self.send(method, uri, Some(&token), body).await
    }
}

// ============================================================================
// Recording repayments
// ============================================================================

#[tokio::test]
async fn test_create_repayment_returns_created_record() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;

    let (status, body) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": loan.id, "amount": 5000 })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["loanId"], loan.id.to_string());
    assert_eq!(body["amount"], 5000.0);
    assert!(body["id"].as_str().is_some());
    assert!(body["date"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_path_variant_records_repayment_and_closes_loan() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;

    let (status, _) = app
        .as_actor(
            &owner,
            Method::POST,
            &format!("/api/users/loans/{}/repayments", loan.id),
            Some(json!({ "amount": PRINCIPAL })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.fx.status(&loan).await, LoanStatus::Closed);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/users/repayment", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let app = TestApp::new();
    let forged = AuthService::new("other-secret".to_string(), 900)
        .issue_access_token(Uuid::new_v4(), quickfund_server::models::UserRole::Admin)
        .unwrap();

    let (status, body) = app
        .send(Method::GET, "/api/admin/loans", Some(&forged), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;

    for body in [json!({ "loanId": loan.id }), json!({ "amount": 10 }), json!({})] {
        let (status, response) = app
            .as_actor(&owner, Method::POST, "/api/users/repayment", Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = TestApp::new();
    let owner = user();

    for body in [
        json!({ "loanId": "not-an-id", "amount": 10 }),
        json!({ "loanId": Uuid::new_v4(), "amount": "ten" }),
    ] {
        let (status, _) = app
            .as_actor(&owner, Method::POST, "/api/users/repayment", Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/loans/not-an-id/repayments",
            Some(json!({ "amount": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_positive_amount_is_bad_request() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;

    let (status, body) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": loan.id, "amount": -1 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_ledger_refusals_map_to_status_codes() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;
    let closed = app.fx.loan(&owner, 100.0, LoanStatus::Closed).await;

    let (status, _) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": Uuid::new_v4(), "amount": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .as_actor(
            &user(),
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": loan.id, "amount": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": closed.id, "amount": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = app
        .as_actor(
            &owner,
            Method::POST,
            "/api/users/repayment",
            Some(json!({ "loanId": loan.id, "amount": PRINCIPAL + 1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ============================================================================
// Owner views
// ============================================================================

#[tokio::test]
async fn test_owner_views() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;
    app.fx.loan(&owner, 500.0, LoanStatus::Pending).await;
    app.fx.ledger.record_repayment(&owner, loan.id, 1000.0).await.unwrap();

    let (status, body) = app
        .as_actor(&owner, Method::GET, "/api/users/repayment", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .as_actor(&owner, Method::GET, "/api/users/loan-summary", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loans"].as_array().unwrap().len(), 2);
    assert_eq!(body["repayments"][0]["amount"], 1000.0);
    assert!(body["loans"][0]["userId"].is_string());

    let (status, body) = app
        .as_actor(
            &owner,
            Method::GET,
            &format!("/api/users/loans/{}/balance", loan.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outstandingBalance"], PRINCIPAL - 1000.0);
    assert_eq!(body["totalRepaid"], 1000.0);
}

#[tokio::test]
async fn test_owner_without_loans_gets_empty_list() {
    let app = TestApp::new();
    let (status, body) = app
        .as_actor(&user(), Method::GET, "/api/users/repayment", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// ============================================================================
// Admin views
// ============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::new();
    let uri_for_user = format!("/api/admin/users/{}/details", Uuid::new_v4());
    for uri in [
        "/api/admin/loans",
        "/api/admin/repayments",
        "/api/admin/reports/repayment",
        "/api/admin/reports/repayments/history",
        uri_for_user.as_str(),
    ] {
        let (status, body) = app.as_actor(&user(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }
}

#[tokio::test]
async fn test_admin_loan_overview_and_filter() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;
    app.fx.loan(&owner, 100.0, LoanStatus::Rejected).await;
    app.fx.ledger.record_repayment(&owner, loan.id, 400.0).await.unwrap();

    let (status, body) = app
        .as_actor(&admin(), Method::GET, "/api/admin/loans", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app
        .as_actor(&admin(), Method::GET, "/api/admin/loans?status=active", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["outstandingBalance"], PRINCIPAL - 400.0);

    let (status, _) = app
        .as_actor(&admin(), Method::GET, "/api/admin/loans?status=overdue", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_repayments_and_reports() {
    let app = TestApp::new();
    let owner = app.fx.customer("Asha Rao").await;
    let loan = app.fx.active_loan(&owner).await;
    app.fx.ledger.record_repayment(&owner, loan.id, 100.0).await.unwrap();

    let (status, body) = app
        .as_actor(&admin(), Method::GET, "/api/admin/repayments", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .as_actor(&admin(), Method::GET, "/api/admin/reports/repayment", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["count"], 1);
    assert_eq!(body[0]["total"], 100.0);

    let (status, body) = app
        .as_actor(
            &admin(),
            Method::GET,
            "/api/admin/reports/repayments/history?timeFilter=Last%2030%20Days&customerFilter=Asha%20Rao",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["customer"], "Asha Rao");
    assert_eq!(body[0]["loanId"], loan.id.to_string());
    assert_eq!(body[0]["amount"], 100.0);
    assert_eq!(body[0]["status"], "Completed");

    let (status, body) = app
        .as_actor(
            &admin(),
            Method::GET,
            "/api/admin/reports/repayments/history?customerFilter=Ravi",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_history_rejects_unknown_time_filter() {
    let app = TestApp::new();
    let (status, body) = app
        .as_actor(
            &admin(),
            Method::GET,
            "/api/admin/reports/repayments/history?timeFilter=Yesterday",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_admin_user_details() {
    let app = TestApp::new();
    let owner = app.fx.customer("Asha Rao").await;
    let loan = app.fx.active_loan(&owner).await;
    app.fx.ledger.record_repayment(&owner, loan.id, 4000.0).await.unwrap();

    let (status, body) = app
        .as_actor(
            &admin(),
            Method::GET,
            &format!("/api/admin/users/{}/details", owner.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha Rao");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["totalLoaned"], PRINCIPAL);
    assert_eq!(body["totalRepaid"], 4000.0);
    assert_eq!(body["loans"][0]["outstandingBalance"], PRINCIPAL - 4000.0);

    let (status, _) = app
        .as_actor(
            &admin(),
            Method::GET,
            &format!("/api/admin/users/{}/details", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .as_actor(&admin(), Method::GET, "/api/admin/users/nope/details", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_reconcile_closes_fully_paid_loan() {
    let app = TestApp::new();
    let owner = user();
    let loan = app.fx.active_loan(&owner).await;
    app.fx.prior_repayment(&loan, PRINCIPAL).await;

    let (status, body) = app
        .as_actor(
            &admin(),
            Method::POST,
            &format!("/api/admin/loans/{}/reconcile", loan.id),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Closed");
    assert_eq!(app.fx.status(&loan).await, LoanStatus::Closed);
}

// ============================================================================
// Service routes
// ============================================================================

#[tokio::test]
async fn test_health_reports_in_memory_backend() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = health_routes(None).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "in-memory");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_needs_no_token() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = health_routes(None).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
