//! HTTP server for the quote API.
//!
//! CRUD over quotes and categories, model-backed quote creation, and the
//! quote of the day. Errors are returned as `{"error": "..."}`.

use crate::clean::clean;
use crate::clock::{utc_midnight, Clock, SharedClock};
use crate::config::Config;
use crate::extract::extract;
use crate::model::{
    ApiError, Category, CreateQuoteRequest, HealthResponse, NewQuote, QuotaStatus, Quote,
    QuoteFilter, QuoteKind, QuoteUpdate, UpdateQuoteRequest,
};
use crate::qotd::{QotdError, QuoteOfDay};
use crate::quota::QuotaError;
use crate::retry::{GenerationError, ResilientGenerator};
use crate::store::{Store, StoreError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};
use utoipa::OpenApi;
use uuid::Uuid;

/// OpenAPI documentation for the quote API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quote of the Day API",
        version = "0.1.0",
        description = "Quotes organised by category, generated on demand with Gemini \
                       and promoted to a daily quote of the day."
    ),
    paths(
        health_check,
        get_quota,
        create_quote,
        list_quotes,
        get_quote,
        get_quote_by_uuid,
        update_quote,
        delete_quote,
        quote_of_the_day,
        list_categories,
    ),
    components(schemas(
        crate::model::Quote,
        crate::model::Category,
        crate::model::CreateQuoteRequest,
        crate::model::UpdateQuoteRequest,
        crate::model::QuotaStatus,
        crate::model::HealthResponse,
        crate::model::ApiError,
    )),
    tags(
        (name = "Quotes", description = "Quote CRUD and generation"),
        (name = "Categories", description = "Quote categories"),
        (name = "Quota", description = "Generation quota usage"),
        (name = "Health", description = "Server health and status")
    )
)]
pub struct ApiDoc;

/// Shared application state
pub struct AppState {
    pub store: Store,
    pub generator: Arc<ResilientGenerator>,
    pub qotd: QuoteOfDay,
    pub clock: SharedClock,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Store,
        generator: Arc<ResilientGenerator>,
        clock: SharedClock,
        config: Config,
    ) -> Self {
        Self {
            qotd: QuoteOfDay::new(store.clone(), clock.clone()),
            store,
            generator,
            clock,
            config,
        }
    }
}

/// JSON body extractor whose rejections use the `{"error": ...}` shape
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct ApiJson<T>(T);

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/random/of-the-day", get(quote_of_the_day))
        .route("/quotes/uuid/:uuid", get(get_quote_by_uuid))
        .route(
            "/quotes/:id",
            get(get_quote).put(update_quote).delete(delete_quote),
        )
        .route("/categories", get(list_categories))
        .route("/quota", get(get_quota))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OpenAPI JSON document
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server health status", body = HealthResponse)
    )
)]
#[instrument(skip(state))]
async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let categories = state.store.list_categories().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        categories: categories.len(),
    }))
}

/// Get quota status
#[utoipa::path(
    get,
    path = "/quota",
    tag = "Quota",
    responses(
        (status = 200, description = "Current quota usage status", body = QuotaStatus)
    )
)]
#[instrument(skip(state))]
async fn get_quota(State(state): State<Arc<AppState>>) -> Json<QuotaStatus> {
    let quota = state.generator.quota();
    let stats = quota.stats().await;

    Json(QuotaStatus {
        requests_today: stats.requests_today,
        requests_per_day_limit: quota.config().per_day,
        requests_last_minute: stats.requests_last_minute,
        requests_per_minute_limit: quota.config().per_minute,
        last_error: stats.last_error,
    })
}

/// Generate a quote with the model and store it
#[utoipa::path(
    post,
    path = "/quotes",
    tag = "Quotes",
    request_body = CreateQuoteRequest,
    responses(
        (status = 201, description = "Quote created", body = Quote),
        (status = 400, description = "Missing or unknown category, bad date", body = ApiError),
        (status = 429, description = "Generation quota exhausted", body = ApiError),
        (status = 500, description = "Generation or storage failure", body = ApiError)
    )
)]
#[instrument(skip(state, request), fields(category = ?request.category))]
async fn create_quote(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), AppError> {
    let category_name = request
        .category
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Category is required.".to_string()))?;
    let category = require_category(&state.store, category_name).await?;

    let author = request
        .author
        .as_deref()
        .map(str::trim)
        .filter(|author| !author.is_empty());
    let kind_name = request
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|kind| !kind.is_empty());
    let kind = kind_name.map(QuoteKind::from).unwrap_or(QuoteKind::OnDemand);
    let mut date = request
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| state.clock.utc());
    if kind == QuoteKind::Daily {
        date = utc_midnight(date);
    }

    let prompt = request_prompt(&category.name, author, kind_name, request.date.as_deref());
    debug!("Generation prompt: {}", prompt);

    let raw = state.generator.call_with_retry(&prompt).await?;
    let parsed = extract(&clean(&raw));
    if parsed.quote.is_empty() {
        return Err(AppError::InternalError(
            "Model response contained no quote".to_string(),
        ));
    }

    let quote = state
        .store
        .insert_quote(NewQuote {
            quote: parsed.quote,
            author: author.map(str::to_string).unwrap_or(parsed.author),
            category_id: category.id,
            kind,
            date,
        })
        .await?;

    info!("Created quote {} in {}", quote.id, quote.category);
    Ok((StatusCode::CREATED, Json(quote)))
}

/// List quotes
#[utoipa::path(
    get,
    path = "/quotes",
    tag = "Quotes",
    params(QuoteFilter),
    responses(
        (status = 200, description = "Matching quotes", body = [Quote])
    )
)]
#[instrument(skip(state))]
async fn list_quotes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<QuoteFilter>,
) -> Result<Json<Vec<Quote>>, AppError> {
    Ok(Json(state.store.list_quotes(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/quotes/{id}",
    tag = "Quotes",
    params(("id" = i64, Path, description = "Quote id")),
    responses(
        (status = 200, description = "The quote", body = Quote),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Quote not found", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, AppError> {
    let id = parse_id(&id)?;
    state
        .store
        .get_quote(id)
        .await?
        .map(Json)
        .ok_or_else(quote_not_found)
}

#[utoipa::path(
    get,
    path = "/quotes/uuid/{uuid}",
    tag = "Quotes",
    params(("uuid" = Uuid, Path, description = "Quote uuid")),
    responses(
        (status = 200, description = "The quote", body = Quote),
        (status = 400, description = "Invalid UUID", body = ApiError),
        (status = 404, description = "Quote not found", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn get_quote_by_uuid(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<Json<Quote>, AppError> {
    let uuid = Uuid::parse_str(uuid.trim())
        .map_err(|_| AppError::InvalidRequest("Invalid UUID".to_string()))?;
    state
        .store
        .get_quote_by_uuid(uuid)
        .await?
        .map(Json)
        .ok_or_else(quote_not_found)
}

/// Manually edit a quote
#[utoipa::path(
    put,
    path = "/quotes/{id}",
    tag = "Quotes",
    params(("id" = i64, Path, description = "Quote id")),
    request_body = UpdateQuoteRequest,
    responses(
        (status = 200, description = "The updated quote", body = Quote),
        (status = 400, description = "Invalid ID, category or date", body = ApiError),
        (status = 404, description = "Quote not found", body = ApiError)
    )
)]
#[instrument(skip(state, request))]
async fn update_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateQuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let id = parse_id(&id)?;

    let category_id = match request.category.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(require_category(&state.store, name).await?.id),
        _ => None,
    };

    let existing = state.store.get_quote(id).await?.ok_or_else(quote_not_found)?;

    let mut update = QuoteUpdate {
        quote: request.quote,
        author: request.author,
        category_id,
        kind: request.kind.map(QuoteKind::from),
        date: request.date.as_deref().map(parse_date).transpose()?,
    };

    // A daily quote always sits on UTC midnight of its day
    let is_daily = update.kind.as_ref().unwrap_or(&existing.kind) == &QuoteKind::Daily;
    if is_daily {
        update.date = Some(utc_midnight(update.date.unwrap_or(existing.date)));
    }

    state
        .store
        .update_quote(id, update)
        .await?
        .map(Json)
        .ok_or_else(quote_not_found)
}

#[utoipa::path(
    delete,
    path = "/quotes/{id}",
    tag = "Quotes",
    params(("id" = i64, Path, description = "Quote id")),
    responses(
        (status = 200, description = "The deleted quote", body = Quote),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Quote not found", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn delete_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, AppError> {
    let id = parse_id(&id)?;
    let deleted = state
        .store
        .delete_quote(id)
        .await?
        .ok_or_else(quote_not_found)?;

    info!("Deleted quote {}", deleted.id);
    Ok(Json(deleted))
}

/// Today's quote, promoting one from the pool on the first call of the day
#[utoipa::path(
    get,
    path = "/quotes/random/of-the-day",
    tag = "Quotes",
    responses(
        (status = 200, description = "Quote of the day", body = Quote),
        (status = 404, description = "No quotes stored yet", body = ApiError)
    )
)]
#[instrument(skip(state))]
async fn quote_of_the_day(State(state): State<Arc<AppState>>) -> Result<Json<Quote>, AppError> {
    Ok(Json(state.qotd.get_quote_of_day().await?))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "All categories", body = [Category])
    )
)]
#[instrument(skip(state))]
async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.store.list_categories().await?))
}

/// Prompt for an explicit creation request
fn request_prompt(
    category: &str,
    author: Option<&str>,
    kind: Option<&str>,
    date: Option<&str>,
) -> String {
    let mut prompt = String::from("Give me a quote");
    if let Some(author) = author {
        prompt.push_str(&format!(" by {}", author));
    }
    prompt.push_str(&format!(" in the category {}.", category));
    if let Some(kind) = kind {
        prompt.push_str(&format!(" The quote type is {}.", kind));
    }
    if let Some(date) = date {
        prompt.push_str(&format!(" For the date {}.", date));
    }
    prompt.push_str(
        "\nRespond ONLY with the quote and the attributed author, e.g.:\n\"Quote text here.\" - Author Name",
    );
    prompt
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest("Invalid ID".to_string()))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (UTC midnight)
fn parse_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| AppError::InvalidRequest(format!("Invalid date \"{}\"", raw)))
}

async fn require_category(store: &Store, name: &str) -> Result<Category, AppError> {
    store
        .find_category_by_name(name)
        .await?
        .ok_or_else(|| AppError::InvalidRequest(format!("Category \"{}\" not found.", name)))
}

fn quote_not_found() -> AppError {
    AppError::NotFound("Quote not found.".to_string())
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    NotFound(String),
    QuotaExceeded(QuotaError),
    Generation(GenerationError),
    InternalError(String),
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::QuotaExhausted(quota) => AppError::QuotaExceeded(quota),
            other => AppError::Generation(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::InternalError(e.to_string())
    }
}

impl From<QotdError> for AppError {
    fn from(e: QotdError) -> Self {
        match e {
            QotdError::EmptyPool => AppError::NotFound(e.to_string()),
            QotdError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::QuotaExceeded(e) => (StatusCode::TOO_MANY_REQUESTS, e.to_string()),
            AppError::Generation(e) => {
                error!("Quote generation failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ApiError::new(message))).into_response()
    }
}

/// Start the HTTP server, running until `shutdown` resolves
pub async fn start_server(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = state.config.server_addr();
    let router = create_router(state);

    info!("Starting quote server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
