use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use crate::config::Settings;
use crate::storage::{CredentialStore, ProductStore};

pub mod routes;
pub mod session;

/// Server state: both stores, opened once at start-up
pub struct AppState {
    pub users: CredentialStore,
    pub products: ProductStore,
}

impl AppState {
    pub fn open(users_database: &Path, products_database: &Path) -> crate::Result<Self> {
        Ok(Self {
            users: CredentialStore::open(users_database)?,
            products: ProductStore::open(products_database)?,
        })
    }
}

/// Build the router with every route and the session layer attached.
pub fn app(state: Arc<AppState>, sessions: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/user/signup", post(routes::signup))
        .route("/user/login", post(routes::login))
        .route("/user/signout", get(routes::signout).post(routes::signout))
        .route("/products", get(routes::list_products))
        .route("/products/names", get(routes::list_names))
        .route("/products/add", post(routes::add_product))
        .route("/products/update", post(routes::update_product))
        .route("/products/remove", post(routes::remove_product))
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(settings: &Settings) -> anyhow::Result<()> {
    let state = Arc::new(AppState::open(&settings.users_database, &settings.products_database)?);
    let sessions = session::create_session_layer(settings.session_hours, settings.secure_cookies);
    let app = app(state, sessions);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let state = AppState::open(&dir.path().join("users.db"), &dir.path().join("inventory.db")).unwrap();
        let router = app(Arc::new(state), session::create_session_layer(8, false));
        (dir, router)
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Send a request, returning the status, the session cookie pair (if set) and the JSON body
    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cookie, body)
    }

    async fn signed_in(app: &Router) -> String {
        let (status, _, _) = send(app, form_request("/user/signup", "username=Alice&password=rightpw", None)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, cookie, _) = send(app, form_request("/user/login", "username=alice&password=rightpw", None)).await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("login sets a session cookie")
    }

    #[tokio::test]
    async fn test_home_reports_first_account_flow() {
        let (_dir, app) = test_app();

        let (status, _, body) = send(&app, get_request("/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_users"], false);
        assert_eq!(body["user"], Value::Null);

        let cookie = signed_in(&app).await;
        let (_, _, body) = send(&app, get_request("/", Some(&cookie))).await;
        assert_eq!(body["has_users"], true);
        assert_eq!(body["user"], "alice");
    }

    #[tokio::test]
    async fn test_product_routes_require_session() {
        let (_dir, app) = test_app();

        let (status, _, body) = send(&app, get_request("/products", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _, _) = send(&app, form_request("/products/add", "name=x&cost_price=1&sell_price=1&in_stock=1", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_forms_answer_in_json() {
        let (_dir, app) = test_app();

        // The session check comes before the body is looked at
        for uri in ["/products/add", "/products/update", "/products/remove"] {
            let (status, _, body) = send(&app, form_request(uri, "cost_price=abc", None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert!(body["error"].is_string(), "{}", uri);
        }

        let cookie = signed_in(&app).await;
        let (status, _, body) = send(&app, form_request("/products/add", "name=x&cost_price=abc&sell_price=1&in_stock=1", Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("cost_price"));

        let (status, _, body) = send(&app, form_request("/products/update", "name=x&in_stock=lots", Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, _, body) = send(&app, form_request("/user/login", "username=alice", None)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_issues_a_new_session_id() {
        let (_dir, app) = test_app();
        let first = signed_in(&app).await;

        let (status, second, _) = send(&app, form_request("/user/login", "username=alice&password=rightpw", Some(&first))).await;
        assert_eq!(status, StatusCode::OK);
        let second = second.expect("login sets a session cookie");
        assert_ne!(first, second);

        let (status, _, _) = send(&app, get_request("/products", Some(&first))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, get_request("/products", Some(&second))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signup_and_login_messages() {
        let (_dir, app) = test_app();
        let cookie = signed_in(&app).await;

        let (status, _, _) = send(&app, form_request("/user/signup", "username=ALICE&password=other", None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, _) = send(&app, form_request("/user/signup", "username=bob&password=pw", Some(&cookie))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, wrong_password) = send(&app, form_request("/user/login", "username=Alice&password=nope", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, unknown_user) = send(&app, form_request("/user/login", "username=zed&password=nope", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(wrong_password["error"], unknown_user["error"]);
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let (_dir, app) = test_app();
        let cookie = signed_in(&app).await;
        let cookie = Some(cookie.as_str());

        let (status, _, _) = send(&app, form_request("/products/add", "name=Widget&cost_price=1&sell_price=2&in_stock=10", cookie)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, _) = send(&app, form_request("/products/add", "name=widget&cost_price=1&sell_price=2&in_stock=10", cookie)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Blank fields mean "no change"; zero is a real value
        let (status, _, body) = send(&app, form_request("/products/update", "name=widget&cost_price=&sell_price=&in_stock=0", cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);

        let (_, _, body) = send(&app, form_request("/products/update", "name=widget&cost_price=", cookie)).await;
        assert_eq!(body["updated"], false);

        let (status, _, body) = send(&app, get_request("/products", cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "WIDGET");
        assert_eq!(body[0]["cost_price"], 1.0);
        assert_eq!(body[0]["in_stock"], 0);

        let (_, _, body) = send(&app, get_request("/products/names", cookie)).await;
        assert_eq!(body, serde_json::json!(["WIDGET"]));

        let (status, _, _) = send(&app, form_request("/products/remove", "name=ghost", cookie)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&app, form_request("/products/remove", "name=Widget", cookie)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = send(&app, get_request("/products/names", cookie)).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_signout_ends_session() {
        let (_dir, app) = test_app();
        let cookie = signed_in(&app).await;

        let (status, _, _) = send(&app, get_request("/user/signout", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(&app, get_request("/products", Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, _, body) = send(&app, get_request("/user/signout", None)).await;
        assert_eq!(body["message"], "There was no user to sign out");
    }
}
