//! REST endpoint handlers for the read-back API.
//!
//! Every handler reads through the [`MileageStore`] held in [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness |
//! | `GET` | `/api/run` | Report of the run that produced the dataset |
//! | `GET` | `/api/mileage/{member_id}` | Account balance record |
//! | `GET` | `/api/mileage/{member_id}/history` | History, optionally by `kind` |
//! | `GET` | `/api/summaries` | Daily summaries in `[start, end]` |
//! | `GET` | `/api/summaries/{date}` | One daily summary |
//! | `POST` | `/api/jobs/aggregate` | Run the daily summary job |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;

use mileage_core::AggregationJob;
use mileage_db::MileageStore;
use mileage_types::{MemberId, MileageKind};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/mileage/{member_id}/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one kind: `EARN`, `USE` or `EXPIRE` (case-insensitive).
    pub kind: Option<String>,
}

/// Query parameters for `GET /api/summaries`.
#[derive(Debug, Deserialize)]
pub struct SummariesQuery {
    /// First day, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// Last day, `YYYY-MM-DD`.
    pub end: Option<String>,
}

/// Body of `POST /api/jobs/aggregate`: either `date` or `start` and `end`.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    /// Summarize this single day.
    pub date: Option<NaiveDate>,
    /// First day of a range.
    pub start: Option<NaiveDate>,
    /// Last day of a range.
    pub end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_member_id(raw: &str) -> Result<MemberId, ObserverError> {
    raw.parse()
        .map_err(|e: mileage_types::InvalidMemberId| ObserverError::InvalidRequest(e.to_string()))
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ObserverError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        ObserverError::InvalidRequest(format!("{field}: {raw:?} is not a YYYY-MM-DD date ({e})"))
    })
}

fn required_date(field: &str, raw: Option<&str>) -> Result<NaiveDate, ObserverError> {
    let raw = raw.ok_or_else(|| ObserverError::InvalidRequest(format!("missing `{field}`")))?;
    parse_date(field, raw)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// GET /api/run
// ---------------------------------------------------------------------------

/// Report of the generation run this process performed.
pub async fn get_run<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<impl IntoResponse, ObserverError> {
    state
        .last_report
        .clone()
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound("no generation run in this process".to_owned()))
}

// ---------------------------------------------------------------------------
// GET /api/mileage/{member_id}
// ---------------------------------------------------------------------------

/// The account of one member.
pub async fn get_account<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let member_id = parse_member_id(&raw_id)?;
    let account = state
        .store
        .find_account(member_id)
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("account {member_id}")))?;
    Ok(Json(account))
}

// ---------------------------------------------------------------------------
// GET /api/mileage/{member_id}/history
// ---------------------------------------------------------------------------

/// History of one member in occurrence order.
///
/// # Query Parameters
///
/// - `kind`: `EARN` | `USE` | `EXPIRE` (default: all kinds)
pub async fn get_history<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let member_id = parse_member_id(&raw_id)?;
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<MileageKind>)
        .transpose()
        .map_err(|e| ObserverError::InvalidRequest(e.to_string()))?;

    let count = state.store.count_events_by_member(member_id, kind).await?;
    let events = state.store.events_by_member(member_id, kind).await?;

    Ok(Json(serde_json::json!({
        "member_id": member_id,
        "kind": kind,
        "count": count,
        "events": events,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/summaries
// ---------------------------------------------------------------------------

/// Daily summaries in `[start, end]`, ascending by date.
pub async fn list_summaries<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SummariesQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let start = required_date("start", query.start.as_deref())?;
    let end = required_date("end", query.end.as_deref())?;
    let summaries = AggregationJob::new(&state.store)
        .summaries_between(start, end)
        .await?;

    Ok(Json(serde_json::json!({
        "start": start,
        "end": end,
        "count": summaries.len(),
        "summaries": summaries,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/summaries/{date}
// ---------------------------------------------------------------------------

/// The summary of one day.
pub async fn get_summary<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(raw_date): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let date = parse_date("date", &raw_date)?;
    let summary = AggregationJob::new(&state.store)
        .summary_for(date)
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("summary for {date}")))?;
    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// POST /api/jobs/aggregate
// ---------------------------------------------------------------------------

/// Run the daily summary job for one day or an inclusive range.
pub async fn run_aggregation<S: MileageStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<AggregateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ObserverError> {
    let Json(request) = payload.map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
    let job = AggregationJob::new(&state.store);

    match request {
        AggregateRequest {
            date: Some(date),
            start: None,
            end: None,
        } => {
            let summary = job.aggregate_day(date).await?;
            Ok(Json(serde_json::json!({
                "date": date,
                "aggregated": u32::from(summary.is_some()),
                "summary": summary,
            })))
        }
        AggregateRequest {
            date: None,
            start: Some(start),
            end: Some(end),
        } => {
            let aggregated = job.aggregate_range(start, end).await?;
            Ok(Json(serde_json::json!({
                "start": start,
                "end": end,
                "aggregated": aggregated,
            })))
        }
        _ => Err(ObserverError::InvalidRequest(
            "expected either `date` or both `start` and `end`".to_owned(),
        )),
    }
}
