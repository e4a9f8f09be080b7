pub mod error;

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::{
        DefaultBodyLimit, FromRequest, FromRequestParts, MatchedPath, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{
        HeaderValue, Method, Request, StatusCode,
        header::{self, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use nota_api_models::{
    ApiResponse, AuthResponse, Comment, CreateCommentRequest, CreateNoteRequest, LoginRequest,
    Note, PaginatedResponse, PaginationQuery, RegisterRequest, UpdateCommentRequest,
    UpdateNoteRequest, User,
};
use nota_config::AppSettings;
use nota_data::{
    CommentCreateOutcome, CommentWriteOutcome, IssuedSession, NotaStore, NoteWriteOutcome,
    RegisterOutcome,
};
use nota_telemetry::{
    Metrics, build_sha, propagate_request_id_layer, set_request_context, set_request_id_layer,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::{Service, ServiceBuilder, layer::Layer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Span, error, info, warn};
use uuid::Uuid;

pub use error::{ApiServerError, ApiServerResult};

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Token bucket applied per email to the register and login endpoints.
const CREDENTIAL_THROTTLE: ThrottleConfig = ThrottleConfig {
    burst: 5,
    replenish_period: Duration::from_secs(50),
};

/// Storage operations the HTTP surface depends on.
#[async_trait]
pub trait StoreFacade: Send + Sync {
    async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome>;
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>>;
    async fn open_session(&self, user_id: Uuid, ttl_secs: u64) -> Result<IssuedSession>;
    async fn session_user(&self, token: &str) -> Result<Option<User>>;
    async fn create_note(&self, author_id: Uuid, request: &CreateNoteRequest) -> Result<Note>;
    async fn open_note(&self, note_id: Uuid) -> Result<Option<Note>>;
    async fn list_notes(&self, limit: u64, offset: u64) -> Result<(Vec<Note>, u64)>;
    async fn update_note(
        &self,
        note_id: Uuid,
        author_id: Uuid,
        request: &UpdateNoteRequest,
    ) -> Result<NoteWriteOutcome>;
    async fn delete_note(&self, note_id: Uuid, author_id: Uuid) -> Result<NoteWriteOutcome>;
    async fn like_note(&self, note_id: Uuid) -> Result<Option<Note>>;
    async fn unlike_note(&self, note_id: Uuid) -> Result<Option<Note>>;
    async fn create_comment(
        &self,
        author_id: Uuid,
        request: &CreateCommentRequest,
    ) -> Result<CommentCreateOutcome>;
    async fn comment_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>>;
    async fn update_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        request: &UpdateCommentRequest,
    ) -> Result<CommentWriteOutcome>;
    async fn delete_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentWriteOutcome>;
    async fn comments_for_note(
        &self,
        note_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Comment>, u64)>;
    async fn ping(&self) -> Result<()>;
}

type SharedStore = Arc<dyn StoreFacade>;

#[async_trait]
impl StoreFacade for NotaStore {
    async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome> {
        Ok(Self::register_user(self, username, email, password).await?)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        Ok(Self::verify_credentials(self, email, password).await?)
    }

    async fn open_session(&self, user_id: Uuid, ttl_secs: u64) -> Result<IssuedSession> {
        Ok(Self::open_session(self, user_id, ttl_secs).await?)
    }

    async fn session_user(&self, token: &str) -> Result<Option<User>> {
        Ok(Self::session_user(self, token).await?)
    }

    async fn create_note(&self, author_id: Uuid, request: &CreateNoteRequest) -> Result<Note> {
        Ok(Self::create_note(self, author_id, request).await?)
    }

    async fn open_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        Ok(Self::open_note(self, note_id).await?)
    }

    async fn list_notes(&self, limit: u64, offset: u64) -> Result<(Vec<Note>, u64)> {
        Ok(Self::list_notes(self, limit, offset).await?)
    }

    async fn update_note(
        &self,
        note_id: Uuid,
        author_id: Uuid,
        request: &UpdateNoteRequest,
    ) -> Result<NoteWriteOutcome> {
        Ok(Self::update_note(self, note_id, author_id, request).await?)
    }

    async fn delete_note(&self, note_id: Uuid, author_id: Uuid) -> Result<NoteWriteOutcome> {
        Ok(Self::delete_note(self, note_id, author_id).await?)
    }

    async fn like_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        Ok(Self::like_note(self, note_id).await?)
    }

    async fn unlike_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        Ok(Self::unlike_note(self, note_id).await?)
    }

    async fn create_comment(
        &self,
        author_id: Uuid,
        request: &CreateCommentRequest,
    ) -> Result<CommentCreateOutcome> {
        Ok(Self::create_comment(self, author_id, request).await?)
    }

    async fn comment_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(Self::comment_by_id(self, comment_id).await?)
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        request: &UpdateCommentRequest,
    ) -> Result<CommentWriteOutcome> {
        Ok(Self::update_comment(self, comment_id, author_id, request).await?)
    }

    async fn delete_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentWriteOutcome> {
        Ok(Self::delete_comment(self, comment_id, author_id).await?)
    }

    async fn comments_for_note(
        &self,
        note_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Comment>, u64)> {
        Ok(Self::comments_for_note(self, note_id, limit, offset).await?)
    }

    async fn ping(&self) -> Result<()> {
        Ok(Self::ping(self).await?)
    }
}

/// HTTP server exposing the Nota API contract.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(store: NotaStore, settings: &AppSettings, telemetry: Metrics) -> Self {
        Self::with_store(Arc::new(store), settings, telemetry)
    }

    #[allow(clippy::too_many_lines)]
    fn with_store(store: SharedStore, settings: &AppSettings, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(
            store,
            settings.session_ttl_secs,
            telemetry.clone(),
        ));

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();

                let span = tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                );
                set_request_context(&span, request_id, uri_path.to_string());
                span
            })
            .on_request(|request: &Request<_>, span: &Span| {
                if let Some(matched) = request.extensions().get::<MatchedPath>() {
                    let request_id = request
                        .headers()
                        .get(HEADER_REQUEST_ID)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    set_request_context(span, request_id, matched.as_str().to_string());
                }
            })
            .on_response(|response: &Response, latency: Duration, span: &Span| {
                let status = response.status().as_u16();
                span.record("status_code", status);
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            });

        let layered = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/notes", get(list_notes).post(create_note))
            .route(
                "/api/notes/{id}",
                get(get_note).put(update_note).delete(delete_note),
            )
            .route("/api/notes/{id}/like", post(like_note))
            .route("/api/notes/{id}/unlike", delete(unlike_note))
            .route("/api/comments", post(create_comment))
            .route(
                "/api/comments/{id}",
                get(get_comment).put(update_comment).delete(delete_comment),
            )
            .route("/api/comments/note/{note_id}", get(note_comments))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .layer(DefaultBodyLimit::max(settings.body_limit_bytes))
            .layer(build_cors_layer(&settings.cors_origin))
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    /// Bind the listener and serve until the connection loop ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server stops
    /// abnormally.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        Ok(())
    }
}

struct ApiState {
    store: SharedStore,
    session_ttl_secs: u64,
    telemetry: Metrics,
    rate_limiters: Mutex<HashMap<String, RateLimiter>>,
}

impl ApiState {
    fn new(store: SharedStore, session_ttl_secs: u64, telemetry: Metrics) -> Self {
        Self {
            store,
            session_ttl_secs,
            telemetry,
            rate_limiters: Mutex::new(HashMap::new()),
        }
    }

    fn enforce_credential_throttle(&self, email: &str) -> Result<(), ApiError> {
        self.enforce_credential_throttle_at(email, Instant::now())
    }

    fn enforce_credential_throttle_at(&self, email: &str, now: Instant) -> Result<(), ApiError> {
        // Buckets are keyed by trimmed, lowercased email; case variants of
        // one address share a single bucket. The keys are attacker-chosen,
        // so stale buckets are dropped on every pass to bound the map: a
        // bucket idle for a full replenish period would refill to burst
        // anyway, making eviction indistinguishable from keeping it.
        let key = email.trim().to_ascii_lowercase();
        let allowed = {
            let mut limiters = self
                .rate_limiters
                .lock()
                .expect("rate limiters mutex poisoned");
            limiters.retain(|_, limiter| !limiter.is_stale(&CREDENTIAL_THROTTLE, now));
            let limiter = limiters
                .entry(key)
                .or_insert_with(|| RateLimiter::new(&CREDENTIAL_THROTTLE, now));
            limiter.allow(&CREDENTIAL_THROTTLE, now)
        };
        if allowed {
            Ok(())
        } else {
            self.telemetry.inc_rate_limit_throttled();
            warn!("credential endpoint throttled");
            Err(ApiError::too_many_requests("Too many attempts, slow down"))
        }
    }

    async fn open_session_for(&self, user: &User) -> Result<IssuedSession, ApiError> {
        let user_id = author_uuid(user)?;
        self.store
            .open_session(user_id, self.session_ttl_secs)
            .await
            .map_err(|err| {
                error!(error = %err, "failed to open session");
                ApiError::internal("failed to open session")
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct ThrottleConfig {
    burst: u32,
    replenish_period: Duration,
}

/// Token bucket over injected instants. The throttle config is a process
/// constant, so buckets carry no config of their own and a bucket untouched
/// for a full replenish period is indistinguishable from a fresh one.
struct RateLimiter {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    fn new(config: &ThrottleConfig, now: Instant) -> Self {
        Self {
            tokens: f64::from(config.burst),
            last_refill: now,
        }
    }

    fn allow(&mut self, config: &ThrottleConfig, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed >= config.replenish_period {
            self.tokens = f64::from(config.burst);
            self.last_refill = now;
        } else if elapsed > Duration::ZERO {
            let refill_rate = f64::from(config.burst) / config.replenish_period.as_secs_f64();
            let replenished = refill_rate * elapsed.as_secs_f64();
            if replenished > 0.0 {
                self.tokens = (self.tokens + replenished).clamp(0.0, f64::from(config.burst));
                self.last_refill = now;
            }
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_stale(&self, config: &ThrottleConfig, now: Instant) -> bool {
        now.saturating_duration_since(self.last_refill) >= config.replenish_period
    }
}

/// Account resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
struct CurrentUser(User);

impl FromRequestParts<Arc<ApiState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header_value) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(auth_failure(state, "missing authorization header"));
        };
        let Ok(raw) = header_value.to_str() else {
            return Err(auth_failure(state, "authorization header is not valid text"));
        };
        let Some(token) = raw.trim().strip_prefix("Bearer ") else {
            return Err(auth_failure(state, "authorization scheme is not bearer"));
        };
        let user = state
            .store
            .session_user(token.trim())
            .await
            .map_err(|err| {
                error!(error = %err, "failed to resolve bearer session");
                ApiError::internal("failed to resolve bearer session")
            })?;
        let Some(user) = user else {
            return Err(auth_failure(state, "bearer token rejected"));
        };
        Ok(Self(user))
    }
}

fn auth_failure(state: &ApiState, reason: &'static str) -> ApiError {
    state.telemetry.inc_auth_failure();
    warn!(reason, "rejected bearer credentials");
    ApiError::unauthorized("Unauthorized")
}

/// `axum::Json` with rejections rendered as the failure envelope instead of
/// axum's plain-text defaults.
#[derive(Debug)]
struct Json<T>(T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

impl<T> IntoResponse for Json<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// `axum::extract::Query` with rejections rendered as the failure envelope.
#[derive(Debug)]
struct Query<T>(T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    axum::extract::Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// `axum::extract::Path` with rejections rendered as the failure envelope.
#[derive(Debug)]
struct Path<T>(T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

#[derive(Clone)]
struct HttpMetricsLayer {
    telemetry: Metrics,
}

impl HttpMetricsLayer {
    const fn new(telemetry: Metrics) -> Self {
        Self { telemetry }
    }
}

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService {
            inner,
            telemetry: self.telemetry.clone(),
        }
    }
}

#[derive(Clone)]
struct HttpMetricsService<S> {
    inner: S,
    telemetry: Metrics,
}

impl<S, B> Service<Request<B>> for HttpMetricsService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let route = req.extensions().get::<MatchedPath>().map_or_else(
            || req.uri().path().to_string(),
            |matched| matched.as_str().to_string(),
        );
        let telemetry = self.telemetry.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            telemetry.inc_http_request(&route, response.status().as_u16());
            Ok(response)
        })
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = ApiResponse::<Value>::failure(self.message, status.as_u16());
        (status, Json(body)).into_response()
    }
}

fn parse_cors_origin(origin: &str) -> Option<HeaderValue> {
    origin.trim().parse::<HeaderValue>().ok()
}

fn build_cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match parse_cors_origin(origin) {
        Some(value) => base.allow_origin(value),
        None => {
            // Fail closed: no allow-origin means browsers refuse cross-origin
            // calls until the configuration is corrected.
            warn!(origin = %origin, "configured CORS origin is not a valid header value");
            base
        }
    }
}

async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    state.enforce_credential_throttle(&payload.email)?;

    let outcome = state
        .store
        .register_user(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to register account");
            ApiError::internal("failed to register account")
        })?;
    let user = match outcome {
        RegisterOutcome::Created(user) => user,
        RegisterOutcome::EmailTaken => return Err(ApiError::conflict("Email already exists")),
    };

    let session = state.open_session_for(&user).await?;
    state.telemetry.inc_session_issued();
    info!(username = %user.username, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            token: session.token,
            message: "Registration successful".to_string(),
        }),
    ))
}

async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    state.enforce_credential_throttle(&payload.email)?;

    let user = state
        .store
        .verify_credentials(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to verify credentials");
            ApiError::internal("failed to verify credentials")
        })?;
    let Some(user) = user else {
        state.telemetry.inc_auth_failure();
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let session = state.open_session_for(&user).await?;
    state.telemetry.inc_session_issued();
    info!(username = %user.username, "login succeeded");
    Ok(Json(AuthResponse {
        user,
        token: session.token,
        message: "Login successful".to_string(),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

async fn list_notes(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<Note>>, ApiError> {
    let (notes, total) = state
        .store
        .list_notes(query.per_page(), query.offset())
        .await
        .map_err(|err| {
            error!(error = %err, "failed to list notes");
            ApiError::internal("failed to list notes")
        })?;
    Ok(Json(PaginatedResponse::new(
        notes,
        total,
        query.page_number(),
        query.per_page(),
    )))
}

async fn create_note(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    let author_id = author_uuid(&user)?;
    let note = state
        .store
        .create_note(author_id, &payload)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to create note");
            ApiError::internal("failed to create note")
        })?;
    state.telemetry.inc_note_created();
    Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let note_id = parse_path_id(&id)?;
    let note = state.store.open_note(note_id).await.map_err(|err| {
        error!(error = %err, "failed to load note");
        ApiError::internal("failed to load note")
    })?;
    note.map(Json).ok_or_else(|| ApiError::not_found("Not found"))
}

async fn update_note(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    let note_id = parse_path_id(&id)?;
    let author_id = author_uuid(&user)?;
    let outcome = state
        .store
        .update_note(note_id, author_id, &payload)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to update note");
            ApiError::internal("failed to update note")
        })?;
    match outcome {
        NoteWriteOutcome::Done(note) => Ok(Json(note)),
        NoteWriteOutcome::NotFound => Err(ApiError::not_found("Not found")),
        NoteWriteOutcome::Forbidden => Err(ApiError::forbidden("Forbidden")),
    }
}

async fn delete_note(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let note_id = parse_path_id(&id)?;
    let author_id = author_uuid(&user)?;
    let outcome = state
        .store
        .delete_note(note_id, author_id)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to delete note");
            ApiError::internal("failed to delete note")
        })?;
    match outcome {
        NoteWriteOutcome::Done(_) => Ok(Json(ApiResponse::message("Note deleted successfully"))),
        NoteWriteOutcome::NotFound => Err(ApiError::not_found("Not found")),
        NoteWriteOutcome::Forbidden => Err(ApiError::forbidden("Forbidden")),
    }
}

async fn like_note(
    State(state): State<Arc<ApiState>>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let note_id = parse_path_id(&id)?;
    let note = state.store.like_note(note_id).await.map_err(|err| {
        error!(error = %err, "failed to like note");
        ApiError::internal("failed to like note")
    })?;
    if note.is_none() {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(Json(ApiResponse::message("Note liked successfully")))
}

async fn unlike_note(
    State(state): State<Arc<ApiState>>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let note_id = parse_path_id(&id)?;
    let note = state.store.unlike_note(note_id).await.map_err(|err| {
        error!(error = %err, "failed to unlike note");
        ApiError::internal("failed to unlike note")
    })?;
    if note.is_none() {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(Json(ApiResponse::message("Note unliked successfully")))
}

async fn create_comment(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    let author_id = author_uuid(&user)?;
    let outcome = state
        .store
        .create_comment(author_id, &payload)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to create comment");
            ApiError::internal("failed to create comment")
        })?;
    let comment = match outcome {
        CommentCreateOutcome::Created(comment) => comment,
        CommentCreateOutcome::MissingNote | CommentCreateOutcome::MissingParent => {
            return Err(ApiError::not_found("Not found"));
        }
    };
    state.telemetry.inc_comment_created();
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Comment>, ApiError> {
    let comment_id = parse_path_id(&id)?;
    let comment = state
        .store
        .comment_by_id(comment_id)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to load comment");
            ApiError::internal("failed to load comment")
        })?;
    comment
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Not found"))
}

async fn update_comment(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    if let Some(reason) = payload.reject_reason() {
        return Err(ApiError::bad_request(reason));
    }
    let comment_id = parse_path_id(&id)?;
    let author_id = author_uuid(&user)?;
    let outcome = state
        .store
        .update_comment(comment_id, author_id, &payload)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to update comment");
            ApiError::internal("failed to update comment")
        })?;
    match outcome {
        CommentWriteOutcome::Done(comment) => Ok(Json(comment)),
        CommentWriteOutcome::NotFound => Err(ApiError::not_found("Not found")),
        CommentWriteOutcome::Forbidden => Err(ApiError::forbidden("Forbidden")),
    }
}

async fn delete_comment(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let comment_id = parse_path_id(&id)?;
    let author_id = author_uuid(&user)?;
    let outcome = state
        .store
        .delete_comment(comment_id, author_id)
        .await
        .map_err(|err| {
            error!(error = %err, "failed to delete comment");
            ApiError::internal("failed to delete comment")
        })?;
    match outcome {
        CommentWriteOutcome::Done(_) => {
            Ok(Json(ApiResponse::message("Comment deleted successfully")))
        }
        CommentWriteOutcome::NotFound => Err(ApiError::not_found("Not found")),
        CommentWriteOutcome::Forbidden => Err(ApiError::forbidden("Forbidden")),
    }
}

async fn note_comments(
    State(state): State<Arc<ApiState>>,
    Path(note_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<Comment>>, ApiError> {
    let note_id = parse_path_id(&note_id)?;
    let (comments, total) = state
        .store
        .comments_for_note(note_id, query.per_page(), query.offset())
        .await
        .map_err(|err| {
            error!(error = %err, "failed to list comments");
            ApiError::internal("failed to list comments")
        })?;
    Ok(Json(PaginatedResponse::new(
        comments,
        total,
        query.page_number(),
        query.per_page(),
    )))
}

async fn health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    state.store.ping().await.map_err(|err| {
        warn!(error = %err, "health check failed to reach database");
        ApiError::service_unavailable("database is currently unavailable")
    })?;
    Ok(Json(
        ApiResponse::message("ok").with_status(StatusCode::OK.as_u16()),
    ))
}

async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

fn author_uuid(user: &User) -> Result<Uuid, ApiError> {
    Uuid::try_parse(&user.id).map_err(|_| {
        error!(user_id = %user.id, "stored account id is not a uuid");
        ApiError::internal("stored account id is malformed")
    })
}

fn parse_path_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(raw.trim()).map_err(|_| ApiError::not_found("Not found"))
}
