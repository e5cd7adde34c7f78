use super::*;
use crate::net::error::{ResponseBody, classify, ErrorKind};
use crate::test_helpers::{RecordingNavigator, ScriptedTransport, fail, json_ok, memory_store, user};
use serde_json::json;

const BASE: &str = "http://api.test/api";

struct Harness {
    transport: Arc<ScriptedTransport>,
    navigator: Arc<RecordingNavigator>,
    store: Arc<SessionStore>,
    interceptor: AuthInterceptor<Arc<ScriptedTransport>>,
}

fn harness(responses: Vec<Result<ApiResponse, HttpFailure>>) -> Harness {
    let transport = ScriptedTransport::new(responses);
    let navigator = Arc::new(RecordingNavigator::default());
    let (_, store) = memory_store();
    let interceptor = AuthInterceptor::new(transport.clone(), store.clone(), navigator.clone(), BASE);
    Harness { transport, navigator, store, interceptor }
}

// =============================================================================
// targets_api
// =============================================================================

#[test]
fn targets_api_matches_base_and_children() {
    let h = harness(vec![]);
    assert!(h.interceptor.targets_api("http://api.test/api"));
    assert!(h.interceptor.targets_api("http://api.test/api/store/products"));
    assert!(h.interceptor.targets_api("http://api.test/api?x=1"));
}

#[test]
fn targets_api_rejects_other_destinations() {
    let h = harness(vec![]);
    assert!(!h.interceptor.targets_api("http://api.test/apiary"));
    assert!(!h.interceptor.targets_api("http://cdn.test/api/logo.png"));
    assert!(!h.interceptor.targets_api("http://api.test/assets/app.css"));
}

#[test]
fn trailing_slash_on_base_is_ignored() {
    let (_, store) = memory_store();
    let interceptor = AuthInterceptor::new(
        ScriptedTransport::new(vec![]),
        store,
        Arc::new(RecordingNavigator::default()),
        "http://api.test/api/",
    );
    assert!(interceptor.targets_api("http://api.test/api/store"));
}

// =============================================================================
// credential injection
// =============================================================================

#[tokio::test]
async fn api_request_carries_bearer_token() {
    let h = harness(vec![]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    h.interceptor.send(ApiRequest::get(format!("{BASE}/store/products"))).await.unwrap();

    assert_eq!(h.transport.last_request().header("authorization"), Some("Bearer T"));
}

#[tokio::test]
async fn non_api_request_never_carries_token() {
    let h = harness(vec![]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    h.interceptor.send(ApiRequest::get("http://cdn.test/img/logo.png")).await.unwrap();

    assert!(h.transport.last_request().header("authorization").is_none());
}

#[tokio::test]
async fn no_session_means_no_header() {
    let h = harness(vec![]);
    h.interceptor.send(ApiRequest::get(format!("{BASE}/store/products"))).await.unwrap();
    assert!(h.transport.last_request().header("authorization").is_none());
}

#[tokio::test]
async fn token_is_read_per_request() {
    let h = harness(vec![]);
    h.store.set_session("T1", user(1, "a@b.com")).unwrap();
    h.interceptor.send(ApiRequest::get(format!("{BASE}/a"))).await.unwrap();
    h.store.set_session("T2", user(1, "a@b.com")).unwrap();
    h.interceptor.send(ApiRequest::get(format!("{BASE}/b"))).await.unwrap();

    let sent: Vec<String> = h
        .transport
        .requests()
        .iter()
        .map(|r| r.header("authorization").unwrap_or_default().to_owned())
        .collect();
    assert_eq!(sent, vec!["Bearer T1", "Bearer T2"]);
}

// =============================================================================
// response handling
// =============================================================================

#[tokio::test]
async fn success_passes_through_unchanged() {
    let h = harness(vec![json_ok(json!([{ "id": 1 }]))]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    let response = h.interceptor.send(ApiRequest::get(format!("{BASE}/store/products"))).await.unwrap();

    assert_eq!(response.body, ResponseBody::Json(json!([{ "id": 1 }])));
    assert!(h.store.current().is_some());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn forbidden_clears_session_navigates_once_and_reraises() {
    let h = harness(vec![fail(403, ResponseBody::Absent)]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    let failure = h
        .interceptor
        .send(ApiRequest::get(format!("{BASE}/store/dashboard")))
        .await
        .unwrap_err();

    assert_eq!(failure, HttpFailure::new(403, ResponseBody::Absent));
    assert!(h.store.current().is_none());
    assert_eq!(h.navigator.routes(), vec![Route::Login]);

    // The caller still classifies and displays the original failure.
    assert_eq!(classify(failure.status, &failure.body).kind, ErrorKind::Forbidden);
    assert_eq!(h.navigator.routes().len(), 1);
}

#[tokio::test]
async fn unauthorized_clears_session() {
    let h = harness(vec![fail(401, ResponseBody::Text("expired".into()))]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    let failure = h.interceptor.send(ApiRequest::get(format!("{BASE}/x"))).await.unwrap_err();

    assert_eq!(failure.body, ResponseBody::Text("expired".into()));
    assert!(h.store.current().is_none());
    assert_eq!(h.navigator.routes(), vec![Route::Login]);
}

#[tokio::test]
async fn other_failures_leave_session_alone() {
    let h = harness(vec![fail(500, ResponseBody::Absent), fail(404, ResponseBody::Absent)]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    assert!(h.interceptor.send(ApiRequest::get(format!("{BASE}/x"))).await.is_err());
    assert!(h.interceptor.send(ApiRequest::get(format!("{BASE}/y"))).await.is_err());

    assert!(h.store.current().is_some());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn rejection_from_non_api_destination_is_ignored() {
    let h = harness(vec![fail(403, ResponseBody::Absent)]);
    h.store.set_session("T", user(1, "a@b.com")).unwrap();

    let failure = h.interceptor.send(ApiRequest::get("http://cdn.test/private.png")).await.unwrap_err();

    assert_eq!(failure.status, 403);
    assert!(h.store.current().is_some());
    assert!(h.navigator.routes().is_empty());
}

// =============================================================================
// rejections that keep the session
// =============================================================================

#[tokio::test]
async fn login_rejection_keeps_existing_session() {
    let h = harness(vec![fail(401, ResponseBody::Json(json!({ "message": "Invalid email or password" })))]);
    h.store.set_session("OLD", user(1, "a@b.com")).unwrap();

    let failure = h
        .interceptor
        .send(ApiRequest::post(format!("{BASE}/Authentication/login"), json!({})))
        .await
        .unwrap_err();

    assert_eq!(failure.status, 401);
    assert_eq!(h.store.current().unwrap().token, "OLD");
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn register_rejection_keeps_existing_session() {
    let h = harness(vec![fail(403, ResponseBody::Absent)]);
    h.store.set_session("OLD", user(1, "a@b.com")).unwrap();

    assert!(h
        .interceptor
        .send(ApiRequest::post(format!("{BASE}/Authentication/register"), json!({})))
        .await
        .is_err());

    assert!(h.store.current().is_some());
    assert!(h.navigator.routes().is_empty());
}

#[test]
fn auth_endpoint_match_is_anchored_at_base() {
    let h = harness(vec![]);
    assert!(h.interceptor.is_auth_endpoint("http://api.test/api/Authentication/login"));
    assert!(!h.interceptor.is_auth_endpoint("http://api.test/api/store/Authentication/login"));
    assert!(!h.interceptor.is_auth_endpoint("http://other.test/api/Authentication/login"));
}

/// Installs a new session while the request is in flight, then rejects it.
struct SessionRotatingTransport {
    store: Arc<SessionStore>,
}

#[async_trait::async_trait]
impl HttpTransport for SessionRotatingTransport {
    async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        self.store.set_session("NEW", user(2, "a@b.com")).unwrap();
        Err(HttpFailure::new(401, ResponseBody::Absent))
    }
}

fn rotating(store: &Arc<SessionStore>, navigator: &Arc<RecordingNavigator>) -> AuthInterceptor<SessionRotatingTransport> {
    AuthInterceptor::new(SessionRotatingTransport { store: store.clone() }, store.clone(), navigator.clone(), BASE)
}

#[tokio::test]
async fn rejection_of_replaced_token_keeps_newer_session() {
    let (_, store) = memory_store();
    let navigator = Arc::new(RecordingNavigator::default());
    store.set_session("OLD", user(1, "a@b.com")).unwrap();

    let failure = rotating(&store, &navigator)
        .send(ApiRequest::get(format!("{BASE}/store/products")))
        .await
        .unwrap_err();

    assert_eq!(failure.status, 401);
    assert_eq!(store.current().unwrap().token, "NEW");
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn rejection_of_anonymous_request_keeps_session_installed_meanwhile() {
    let (_, store) = memory_store();
    let navigator = Arc::new(RecordingNavigator::default());

    let _ = rotating(&store, &navigator)
        .send(ApiRequest::get(format!("{BASE}/store/products")))
        .await;

    assert_eq!(store.current().unwrap().token, "NEW");
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn anonymous_rejection_still_navigates() {
    let h = harness(vec![fail(401, ResponseBody::Absent)]);

    assert!(h.interceptor.send(ApiRequest::get(format!("{BASE}/store/products"))).await.is_err());

    assert_eq!(h.navigator.routes(), vec![Route::Login]);
}
