//! HTTP API over the ledger service.

use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::submission::parse_date;
use crate::{
    DailySummary, ErrorKind, LedgerError, LedgerService, Player, PlayerStats, RecordSubmission,
    SessionRecord, Settings,
};

const SAVE_RECORD: &str = "Failed to save record";
const LOAD_RECORDS: &str = "Failed to load records";
const LOAD_STATS: &str = "Failed to load stats";
const LOAD_DAILY_RECORDS: &str = "Failed to load daily records";
const LOAD_DATES: &str = "Failed to load dates";
const LOAD_PLAYERS: &str = "Failed to load players";
const ADD_PLAYER: &str = "Failed to add player";
const DELETE_PLAYER: &str = "Failed to delete player";
const LOAD_SETTINGS: &str = "Failed to load settings";
const UPDATE_SETTINGS: &str = "Failed to update settings";

/// Rejection message for a missing or non-positive default stake.
pub const INVALID_DEFAULT_POINTS: &str = "Default initial points must be a positive number";

/// Shown instead of the raw constraint text when a player name is taken.
pub const DUPLICATE_PLAYER_MESSAGE: &str = "A player with that name already exists";

/// JSON error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// What went wrong.
    pub error: String,
}

/// Error returned from a handler: a status plus a client-facing message.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Maps a ledger failure for `operation` onto a status and message.
    #[instrument(skip(err), fields(kind = %err.kind()))]
    pub fn from_ledger(operation: &'static str, err: LedgerError) -> Self {
        match err.kind() {
            ErrorKind::Validation => {
                warn!(error = %err, "Rejected request");
                Self::bad_request(err.detail())
            }
            ErrorKind::NotFound => {
                warn!(error = %err, "Referenced entity missing");
                Self::new(StatusCode::NOT_FOUND, format!("{}: {}", operation, err.detail()))
            }
            ErrorKind::Conflict => {
                warn!(error = %err, "Conflicting write");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, DUPLICATE_PLAYER_MESSAGE)
            }
            ErrorKind::Storage => {
                error!(error = %err, "Storage fault");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", operation, err.detail()),
                )
            }
        }
    }

    fn rejected(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Malformed JSON body");
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// `?playerName=` query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerQuery {
    /// Player to look up.
    pub player_name: Option<String>,
}

/// `?date=` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    /// Date to look up, `YYYY-MM-DD`.
    pub date: Option<String>,
}

/// `POST /players` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddPlayerRequest {
    /// Display name of the new player.
    pub name: Option<String>,
}

/// `DELETE /players` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeletePlayerRequest {
    /// Id of the player to remove.
    pub id: Option<String>,
}

/// `PUT /settings` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    /// New default initial stake as raw JSON; read it through [`Self::positive_points`].
    pub default_initial_points: Option<Value>,
}

impl UpdateSettingsRequest {
    /// The stake as a positive integer. Integral floats such as `20000.0`
    /// are accepted; fractions, strings and values `<= 0` are not.
    pub fn positive_points(&self) -> Option<i64> {
        let points = match self.default_initial_points.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        };
        points.filter(|points| *points > 0)
    }
}

/// Builds the HTTP router for a ledger service.
#[derive(Debug, Clone)]
pub struct LedgerApi {
    service: LedgerService,
}

impl LedgerApi {
    /// Creates a new API over the given service.
    #[instrument(skip(service))]
    pub fn new(service: LedgerService) -> Self {
        Self { service }
    }

    /// Routes every endpoint and wraps them in request logging.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/records", get(list_records).post(create_record))
            .route("/stats", get(player_stats))
            .route("/daily-records", get(daily_records))
            .route("/daily-summary", get(daily_summary))
            .route("/dates", get(list_dates))
            .route(
                "/players",
                get(list_players).post(add_player).delete(delete_player),
            )
            .route("/settings", get(get_settings).put(update_settings))
            .route("/health", get(health))
            .layer(middleware::from_fn(log_requests))
            .with_state(self.service.clone())
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    info!(%method, %uri, "Incoming HTTP request");
    let response = next.run(req).await;
    info!(%method, %uri, status = %response.status(), "Response sent");
    response
}

/// Runs storage work off the async runtime.
async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(operation, error = %e, "Blocking task failed");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: {}", operation, e),
        )
    })
}

fn require_player_name(query: PlayerQuery) -> Result<String, ApiError> {
    query
        .player_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("Player name is required"))
}

fn require_date(query: DateQuery) -> Result<NaiveDate, ApiError> {
    match query.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            parse_date("date", raw).map_err(|e| ApiError::bad_request(e.message))
        }
        _ => Err(ApiError::bad_request("Date is required")),
    }
}

async fn create_record(
    State(service): State<LedgerService>,
    payload: Result<Json<RecordSubmission>, JsonRejection>,
) -> Result<Json<SessionRecord>, ApiError> {
    let Json(submission) = payload.map_err(ApiError::rejected)?;
    let record = blocking(SAVE_RECORD, move || service.submit_record(submission))
        .await?
        .map_err(|e| ApiError::from_ledger(SAVE_RECORD, e))?;
    Ok(Json(record))
}

async fn list_records(
    State(service): State<LedgerService>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let player_name = require_player_name(query)?;
    let records = blocking(LOAD_RECORDS, move || service.records(&player_name)).await?;
    Ok(Json(records))
}

async fn player_stats(
    State(service): State<LedgerService>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<Option<PlayerStats>>, ApiError> {
    let player_name = require_player_name(query)?;
    let stats = blocking(LOAD_STATS, move || service.stats(&player_name)).await?;
    Ok(Json(stats))
}

async fn daily_records(
    State(service): State<LedgerService>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let date = require_date(query)?;
    let records = blocking(LOAD_DAILY_RECORDS, move || service.daily_records(date)).await?;
    Ok(Json(records))
}

async fn daily_summary(
    State(service): State<LedgerService>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DailySummary>, ApiError> {
    let date = require_date(query)?;
    let summary = blocking(LOAD_DAILY_RECORDS, move || service.daily_summary(date)).await?;
    Ok(Json(summary))
}

async fn list_dates(
    State(service): State<LedgerService>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    let dates = blocking(LOAD_DATES, move || service.dates()).await?;
    Ok(Json(dates))
}

async fn list_players(
    State(service): State<LedgerService>,
) -> Result<Json<Vec<Player>>, ApiError> {
    let players = blocking(LOAD_PLAYERS, move || service.players()).await?;
    Ok(Json(players))
}

async fn add_player(
    State(service): State<LedgerService>,
    payload: Result<Json<AddPlayerRequest>, JsonRejection>,
) -> Result<Json<Player>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let name = request
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Player name is required"))?;
    let player = blocking(ADD_PLAYER, move || service.add_player(&name))
        .await?
        .map_err(|e| ApiError::from_ledger(ADD_PLAYER, e))?;
    Ok(Json(player))
}

async fn delete_player(
    State(service): State<LedgerService>,
    payload: Result<Json<DeletePlayerRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Player id is required"))?;
    blocking(DELETE_PLAYER, move || service.delete_player(&id))
        .await?
        .map_err(|e| ApiError::from_ledger(DELETE_PLAYER, e))?;
    Ok(Json(json!({ "success": true })))
}

async fn get_settings(State(service): State<LedgerService>) -> Result<Json<Settings>, ApiError> {
    let settings = blocking(LOAD_SETTINGS, move || service.settings()).await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(service): State<LedgerService>,
    payload: Result<Json<UpdateSettingsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let value = request
        .positive_points()
        .ok_or_else(|| ApiError::bad_request(INVALID_DEFAULT_POINTS))?;
    blocking(UPDATE_SETTINGS, move || {
        service.update_default_initial_points(value)
    })
    .await?
    .map_err(|e| ApiError::from_ledger(UPDATE_SETTINGS, e))?;
    Ok(Json(json!({ "success": true })))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
