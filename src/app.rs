use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{self, SESSION_COOKIE};
use crate::config::{AppConfig, ServiceAccountKey};
use crate::error::Error;
use crate::record::{available_tags, MovieUpdate, NewMovie};
use crate::sheets::SheetsClient;
use crate::store::{MovieStore, SheetBackend, StoredRecord};

/// Shared application state. Generic over the backend so the handlers can
/// be exercised against the in-memory sheet in tests.
pub struct AppState<B: SheetBackend> {
    pub store: MovieStore<B>,
    pub config: AppConfig,
    /// Session-scoped scratch tags, offered in the pickers but not
    /// persisted anywhere until they are attached to a record.
    custom_tags: RwLock<Vec<String>>,
}

impl<B: SheetBackend> AppState<B> {
    pub fn new(store: MovieStore<B>, config: AppConfig) -> Self {
        AppState {
            store,
            config,
            custom_tags: RwLock::new(Vec::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TagForm {
    tag: String,
}

#[derive(Debug, Serialize)]
struct ApiResponse {
    status: String,
    message: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        ApiResponse {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn ignored(message: &str) -> Self {
        ApiResponse {
            status: "ignored".to_string(),
            message: Some(message.to_string()),
        }
    }
}

/// Build the Sheets-backed state and serve until shutdown.
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    let client = SheetsClient::new(key, &config)?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(MovieStore::new(client), config));

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the router: the main page and the JSON API sit behind the session
/// gate, the login routes in front of it.
pub fn router<B: SheetBackend + 'static>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", get(serve_app_page))
        .route("/api/movies", get(list_movies::<B>).post(add_movie::<B>))
        .route(
            "/api/movies/:id",
            put(update_movie::<B>).delete(delete_movie::<B>),
        )
        .route("/api/tags", get(list_tags::<B>).post(add_tag::<B>))
        .route_layer(middleware::from_fn(auth::require_auth))
        .route("/login", get(serve_login_page).post(handle_login::<B>))
        .route("/logout", axum::routing::post(handle_logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_app_page() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn serve_login_page(jar: CookieJar) -> Response {
    if auth::session_from_jar(&jar) {
        return Redirect::to("/").into_response();
    }
    Html(include_str!("./static/login.html")).into_response()
}

/// Handle login form submissions: verify the password against the
/// configured hash and open a session on success.
async fn handle_login<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    match auth::verify_password(&form.password, &state.config.password_hash) {
        Ok(true) => {
            let session_id = auth::create_session();
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Ok(false) => (StatusCode::UNAUTHORIZED, "Wrong password").into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configured password hash is invalid; regenerate it with hashpw",
        )
            .into_response(),
    }
}

/// Handle logout: drop the session and blank the cookie.
async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        auth::destroy_session(cookie.value());
    }

    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/");
    (jar.add(cookie), Redirect::to("/login"))
}

async fn list_movies<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<Vec<StoredRecord>>, Error> {
    Ok(Json(state.store.list().await?))
}

/// Create an entry. A blank title performs no mutation at all; the
/// response says so and the page simply keeps its state.
async fn add_movie<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(new): Json<NewMovie>,
) -> Result<Json<ApiResponse>, Error> {
    if new.title.trim().is_empty() {
        return Ok(Json(ApiResponse::ignored("Title is required")));
    }

    state.store.append(new).await?;
    Ok(Json(ApiResponse::ok()))
}

async fn update_movie<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
    Json(update): Json<MovieUpdate>,
) -> Result<Json<ApiResponse>, Error> {
    state.store.update(&id, update).await?;
    Ok(Json(ApiResponse::ok()))
}

async fn delete_movie<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, Error> {
    state.store.delete(&id).await?;
    Ok(Json(ApiResponse::ok()))
}

/// The tag vocabulary: base set, tags used by current records, and the
/// session's custom tags.
async fn list_tags<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<Vec<String>>, Error> {
    let records = state.store.list().await?;
    let movies: Vec<_> = records.into_iter().map(|r| r.movie).collect();
    let custom = state.custom_tags.read().unwrap().clone();

    Ok(Json(available_tags(&movies, &custom)))
}

/// Remember a custom tag for this session.
async fn add_tag<B: SheetBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(form): Json<TagForm>,
) -> Json<ApiResponse> {
    let tag = form.tag.trim().to_string();
    if tag.is_empty() {
        return Json(ApiResponse::ignored("Tag is empty"));
    }

    let mut custom = state.custom_tags.write().unwrap();
    if !custom.contains(&tag) {
        custom.push(tag);
    }

    Json(ApiResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::MemorySheet;

    fn test_state() -> Arc<AppState<MemorySheet>> {
        let config = AppConfig {
            credentials_path: "unused.json".into(),
            spreadsheet_id: "test-sheet".to_string(),
            password_hash: auth::hash_password("letmein").unwrap(),
            sheet_title: None,
            proxy: None,
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        Arc::new(AppState::new(
            MovieStore::new(MemorySheet::with_header()),
            config,
        ))
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            poster_url: String::new(),
            rating: 7.0,
            tags: vec!["drama".to_string()],
            review: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_movie_ignores_blank_title() {
        let state = test_state();
        let before = state.store.list().await.unwrap();

        let response = add_movie(State(state.clone()), Json(new_movie("   ")))
            .await
            .unwrap();

        assert_eq!(response.0.status, "ignored");
        assert_eq!(state.store.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_movie_appends() {
        let state = test_state();

        let response = add_movie(State(state.clone()), Json(new_movie("Ran")))
            .await
            .unwrap();

        assert_eq!(response.0.status, "ok");
        let listed = state.store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].movie.title, "Ran");
    }

    #[tokio::test]
    async fn test_custom_tag_enters_vocabulary() {
        let state = test_state();

        add_tag(
            State(state.clone()),
            Json(TagForm {
                tag: " noir ".to_string(),
            }),
        )
        .await;
        add_tag(
            State(state.clone()),
            Json(TagForm {
                tag: "noir".to_string(),
            }),
        )
        .await;

        let tags = list_tags(State(state.clone())).await.unwrap().0;
        assert_eq!(tags.iter().filter(|t| t.as_str() == "noir").count(), 1);
    }

    #[tokio::test]
    async fn test_blank_tag_ignored() {
        let state = test_state();
        let response = add_tag(
            State(state.clone()),
            Json(TagForm {
                tag: "  ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.0.status, "ignored");
        assert!(state.custom_tags.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let state = test_state();
        let response = handle_login(
            State(state),
            CookieJar::new(),
            axum::Form(LoginForm {
                password: "guess".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_accepts_configured_password() {
        let state = test_state();
        let response = handle_login(
            State(state),
            CookieJar::new(),
            axum::Form(LoginForm {
                password: "letmein".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
