//! End-to-end session flow against a local stub of the store API.

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use shopdesk_core::auth::{MemoryTokenStore, TokenError, TokenStore};
use shopdesk_core::models::{LoginRequest, OrderInput, ProductInput};
use shopdesk_core::{ApiClient, ApiError, GuardDecision, LoginOutcome, SessionContext, View};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    body: String,
}

type Responder = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responder = responder.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, responder, recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}/api", addr),
            requests,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn handle(
    mut stream: TcpStream,
    responder: Responder,
    recorded: Arc<Mutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request = Recorded {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    };
    let (status, body) = responder(&request);
    recorded.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn jwt(payload: &str) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

fn setup(base_url: &str, store: Arc<MemoryTokenStore>) -> (ApiClient, SessionContext) {
    let api = ApiClient::new(base_url, store.clone()).unwrap();
    (api, SessionContext::new(store))
}

#[tokio::test]
async fn test_login_then_requests_carry_bearer_token() {
    let token = jwt(r#"{"sub":"1","exp":9999999999}"#);
    let expected = format!("Bearer {}", token);
    let issued = token.clone();

    let server = StubServer::start(move |req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/login") => (200, format!(r#"{{"token":"{}"}}"#, issued)),
        ("GET", "/api/products") if req.authorization.as_deref() == Some(expected.as_str()) => (
            200,
            r#"[{"id":1,"name":"Prod A","price":5,"available":true}]"#.to_string(),
        ),
        _ => (401, r#"{"error":"unauthorized"}"#.to_string()),
    })
    .await;

    let store = Arc::new(MemoryTokenStore::new());
    let (api, session) = setup(&server.base_url, store.clone());

    assert_eq!(session.guard(View::Products), GuardDecision::Redirect(View::Login));
    assert_eq!(session.guard(View::Login), GuardDecision::Render);

    let outcome = session
        .login(&api, &LoginRequest::new("cy_user", "cy_pass_123"))
        .await
        .expect("login should succeed");
    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert_eq!(store.get(), Some(token.clone()));

    assert_eq!(session.guard(View::Products), GuardDecision::Render);
    assert_eq!(session.guard(View::Login), GuardDecision::Redirect(View::Home));

    let products = api.list_products().await.expect("products should load");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Prod A");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/login");
    assert_eq!(requests[0].authorization, None);
    assert!(requests[0].body.contains(r#""login":"cy_user""#));
    assert_eq!(requests[1].authorization, Some(format!("Bearer {}", token)));
}

#[tokio::test]
async fn test_unauthorized_response_clears_session() {
    let server = StubServer::start(|_| (401, r#"{"error":"token expired"}"#.to_string())).await;

    let store = Arc::new(MemoryTokenStore::with_token(&jwt("{}")));
    let (api, session) = setup(&server.base_url, store.clone());
    assert_eq!(session.guard(View::Orders), GuardDecision::Render);

    let err = api.list_orders().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
    assert_eq!(store.get(), None);

    assert_eq!(
        session.handle_error(&err),
        Some(GuardDecision::Redirect(View::Login))
    );
    assert_eq!(session.guard(View::Orders), GuardDecision::Redirect(View::Login));
}

#[tokio::test]
async fn test_missing_token_sends_unauthenticated_request() {
    let server = StubServer::start(|_| (401, String::new())).await;

    let store = Arc::new(MemoryTokenStore::new());
    let (api, _) = setup(&server.base_url, store.clone());

    let err = api.list_users().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization, None);
}

#[tokio::test]
async fn test_rejected_login_keeps_existing_token() {
    let server = StubServer::start(|_| (401, r#"{"error":"invalid credentials"}"#.to_string())).await;

    let previous = jwt("{}");
    let store = Arc::new(MemoryTokenStore::with_token(&previous));
    let (api, session) = setup(&server.base_url, store.clone());

    let err = session
        .login(&api, &LoginRequest::new("cy_user", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
    assert_eq!(store.get(), Some(previous));
}

#[tokio::test]
async fn test_login_reports_unusable_token() {
    let server = StubServer::start(|_| (200, r#"{"token":"opaque-session-id"}"#.to_string())).await;

    let store = Arc::new(MemoryTokenStore::new());
    let (api, session) = setup(&server.base_url, store.clone());

    let outcome = session
        .login(&api, &LoginRequest::new("cy_user", "cy_pass_123"))
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::UnusableToken(TokenError::Segments(1)));
    assert_eq!(store.get().as_deref(), Some("opaque-session-id"));

    assert_eq!(session.guard(View::Orders), GuardDecision::Redirect(View::Login));
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn test_login_reports_expired_token() {
    let expired = jwt(r#"{"exp":1}"#);
    let body = format!(r#"{{"token":"{}"}}"#, expired);
    let server = StubServer::start(move |_| (200, body.clone())).await;

    let store = Arc::new(MemoryTokenStore::new());
    let (api, session) = setup(&server.base_url, store);

    let outcome = session
        .login(&api, &LoginRequest::new("cy_user", "cy_pass_123"))
        .await
        .unwrap();
    assert_eq!(outcome, LoginOutcome::UnusableToken(TokenError::Expired));
}

#[tokio::test]
async fn test_crud_paths_and_empty_bodies() {
    let server = StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/products") => (
            201,
            r#"{"id":7,"name":"Prod B","price":7,"available":true}"#.to_string(),
        ),
        ("PUT", "/api/products/7") => (204, String::new()),
        ("DELETE", "/api/products/7") => (200, String::new()),
        ("POST", "/api/orders") => (
            201,
            r#"{"id":3,"customerName":"Cypress","customerEmail":"c@ex.com","status":"pending","totalAmount":7,"products":[{"id":7,"name":"Prod B","price":7}]}"#.to_string(),
        ),
        ("DELETE", "/api/orders/3") => (204, String::new()),
        _ => (404, r#"{"error":"no route"}"#.to_string()),
    })
    .await;

    let store = Arc::new(MemoryTokenStore::with_token(&jwt("{}")));
    let (api, _) = setup(&server.base_url, store);

    let input = ProductInput {
        name: "Prod B".to_string(),
        price: 7.0,
        ..Default::default()
    };
    let created = api.create_product(&input).await.unwrap().expect("created product");
    assert_eq!(created.id, 7);

    assert_eq!(api.update_product(7, &input).await.unwrap(), None);
    api.delete_product(7).await.unwrap();

    let order = api
        .create_order(&OrderInput {
            customer_name: "Cypress".to_string(),
            customer_email: "c@ex.com".to_string(),
            product_ids: vec![7],
            ..Default::default()
        })
        .await
        .unwrap()
        .expect("created order");
    assert_eq!(order.products_display(), "Prod B");
    api.delete_order(3).await.unwrap();

    let err = api.delete_order(99).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::NotFound(m)) if m == "no route"
    ));

    let requests = server.requests();
    assert!(requests.iter().all(|r| r.authorization.is_some()));
    assert!(requests[0].body.contains(r#""name":"Prod B""#));
    assert!(requests[3].body.contains(r#""productIds":[7]"#));
}
