//! HTTP transport for the pool API.
//!
//! Thin translation layer: request DTOs map onto the core-facing contract,
//! core outcomes map back onto JSON. Malformed input is rejected here;
//! policy rejections, lease conflicts, and empty pools pass through as
//! structured bodies with `ok` flags and stable error codes.
//!
//! Endpoints:
//! - `POST /api/report`  — scanner submits one or many server descriptors
//! - `POST /api/next`    — client requests a lease
//! - `POST /api/confirm` — client heartbeats its lease
//! - `POST /api/release` — client returns (or quarantines) a handle
//! - `GET  /api/stats`   — per-partition counts, counters, active config
//! - `GET  /metrics`     — Prometheus exposition
//!
//! The four `POST` endpoints require the `x-api-key` header.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jobpool_core::{HandleReport, NextOutcome, PartitionStats, Pool, PoolConfig};
use serde::{Deserialize, Serialize};

use crate::auth::ApiKey;
use crate::metrics::DaemonMetrics;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The lease pool core.
    pub pool: Arc<Pool>,
    /// Prometheus metrics.
    pub metrics: Arc<DaemonMetrics>,
    /// Configured API key.
    pub api_key: ApiKey,
}

/// Builds the daemon's router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/api/report", post(report))
        .route("/api/next", post(next))
        .route("/api/confirm", post(confirm))
        .route("/api/release", post(release))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(authed)
        .route("/api/stats", get(stats))
        .route("/metrics", get(metrics))
        .route("/", get(banner))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: &'static str,
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorBody { ok: false, error })).into_response()
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.api_key.authorizes(request.headers()) {
        return next.run(request).await;
    }
    tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
    state.metrics.observe_request("auth", "unauthorized");
    error_response(StatusCode::FORBIDDEN, "unauthorized")
}

/// One server descriptor as posted by the scanner.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerReport {
    job_id: String,
    #[serde(default)]
    occupancy: u32,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    region: String,
    #[serde(default)]
    latency_hint: String,
    #[serde(default)]
    restricted: bool,
}

impl From<ServerReport> for HandleReport {
    fn from(report: ServerReport) -> Self {
        Self {
            handle_id: report.job_id,
            occupancy: report.occupancy,
            capacity: report.capacity,
            region: report.region,
            latency_hint: report.latency_hint,
            restricted: report.restricted,
        }
    }
}

/// The scanner may post a single descriptor or a whole batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(ServerReport),
    Many(Vec<ServerReport>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<ServerReport> {
        match self {
            Self::One(report) => vec![report],
            Self::Many(reports) => reports,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    place_id: Option<String>,
    servers: Option<OneOrMany>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    ok: bool,
    added: usize,
    ignored: usize,
    pool_size: usize,
}

async fn report(State(state): State<AppState>, Json(body): Json<ReportRequest>) -> Response {
    let Some(place_id) = body.place_id.filter(|p| !p.is_empty()) else {
        state.metrics.observe_request("report", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_place_id");
    };
    let Some(servers) = body.servers else {
        state.metrics.observe_request("report", "bad_request");
        return error_response(StatusCode::OK, "no_servers");
    };

    let mut added = 0;
    let mut ignored = 0;
    let mut pool_size = 0;
    for server in servers.into_vec() {
        let outcome = state.pool.report(&place_id, &server.into());
        if outcome.stored {
            added += 1;
        } else {
            ignored += 1;
        }
        pool_size = outcome.pool_size;
    }

    state.metrics.observe_request("report", "ok");
    Json(ReportResponse {
        ok: true,
        added,
        ignored,
        pool_size,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextRequest {
    place_id: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum NextResponse {
    #[serde(rename_all = "camelCase")]
    Granted {
        ok: bool,
        job_id: String,
        occupancy: u32,
        capacity: u32,
        region: String,
        latency_hint: String,
        lease_sec: u64,
    },
    #[serde(rename_all = "camelCase")]
    EmptyPool { ok: bool, empty_pool: bool },
}

async fn next(State(state): State<AppState>, Json(body): Json<NextRequest>) -> Response {
    let Some(place_id) = body.place_id.filter(|p| !p.is_empty()) else {
        state.metrics.observe_request("next", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_place_id");
    };
    let Some(bot_id) = body.bot_id.filter(|b| !b.is_empty()) else {
        state.metrics.observe_request("next", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_bot_id");
    };

    match state.pool.next(&place_id, &bot_id) {
        NextOutcome::Granted(grant) => {
            state.metrics.observe_request("next", "granted");
            Json(NextResponse::Granted {
                ok: true,
                job_id: grant.handle_id,
                occupancy: grant.occupancy,
                capacity: grant.capacity,
                region: grant.region,
                latency_hint: grant.latency_hint,
                lease_sec: grant.lease_secs,
            })
            .into_response()
        },
        NextOutcome::EmptyPool => {
            state.metrics.observe_request("next", "empty_pool");
            Json(NextResponse::EmptyPool {
                ok: true,
                empty_pool: true,
            })
            .into_response()
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest {
    place_id: Option<String>,
    job_id: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmResponse {
    ok: bool,
    extended_lease_sec: u64,
}

async fn confirm(State(state): State<AppState>, Json(body): Json<ConfirmRequest>) -> Response {
    let Some(place_id) = body.place_id.filter(|p| !p.is_empty()) else {
        state.metrics.observe_request("confirm", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_place_id");
    };
    let Some(job_id) = body.job_id.filter(|j| !j.is_empty()) else {
        state.metrics.observe_request("confirm", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_job_id");
    };
    let Some(bot_id) = body.bot_id.filter(|b| !b.is_empty()) else {
        state.metrics.observe_request("confirm", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_bot_id");
    };

    match state.pool.confirm(&place_id, &job_id, &bot_id) {
        Ok(extended_lease_sec) => {
            state.metrics.observe_request("confirm", "ok");
            Json(ConfirmResponse {
                ok: true,
                extended_lease_sec,
            })
            .into_response()
        },
        Err(err) => {
            state.metrics.observe_request("confirm", err.code());
            error_response(StatusCode::OK, err.code())
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRequest {
    place_id: Option<String>,
    job_id: Option<String>,
    #[serde(default)]
    quarantine: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseResponse {
    ok: bool,
    existed: bool,
    quarantined: bool,
}

async fn release(State(state): State<AppState>, Json(body): Json<ReleaseRequest>) -> Response {
    let Some(place_id) = body.place_id.filter(|p| !p.is_empty()) else {
        state.metrics.observe_request("release", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_place_id");
    };
    let Some(job_id) = body.job_id.filter(|j| !j.is_empty()) else {
        state.metrics.observe_request("release", "bad_request");
        return error_response(StatusCode::BAD_REQUEST, "missing_job_id");
    };

    let outcome = state.pool.release(&place_id, &job_id, body.quarantine);
    state.metrics.observe_request("release", "ok");
    Json(ReleaseResponse {
        ok: true,
        existed: outcome.existed,
        quarantined: outcome.quarantined,
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsQuery {
    place_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    ok: bool,
    partitions: Vec<PartitionStatsDto>,
    config: PoolConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PartitionStatsDto {
    place_id: String,
    pool_size: usize,
    active_leases: usize,
    active_vetoes: usize,
    total_added: u64,
    total_ignored: u64,
    total_leases: u64,
    total_confirms: u64,
    total_releases: u64,
    total_quarantined: u64,
}

impl From<PartitionStats> for PartitionStatsDto {
    fn from(stats: PartitionStats) -> Self {
        Self {
            place_id: stats.partition,
            pool_size: stats.pool_size,
            active_leases: stats.active_leases,
            active_vetoes: stats.active_vetoes,
            total_added: stats.metrics.total_added,
            total_ignored: stats.metrics.total_ignored,
            total_leases: stats.metrics.total_leases,
            total_confirms: stats.metrics.total_confirms,
            total_releases: stats.metrics.total_releases,
            total_quarantined: stats.metrics.total_quarantined,
        }
    }
}

async fn stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Response {
    let partitions = state
        .pool
        .stats(query.place_id.as_deref())
        .into_iter()
        .map(PartitionStatsDto::from)
        .collect();
    state.metrics.observe_request("stats", "ok");
    Json(StatsResponse {
        ok: true,
        partitions,
        config: state.pool.config().clone(),
    })
    .into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode_text(&state.pool) {
        Ok(body) => (
            StatusCode::OK,
            [(
                "content-type",
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        },
    }
}

async fn banner() -> &'static str {
    "jobpoold\n\n\
     POST /api/report  - submit scanned servers\n\
     POST /api/next    - acquire a lease\n\
     POST /api/confirm - heartbeat a lease\n\
     POST /api/release - return or quarantine a handle\n\
     GET  /api/stats   - pool statistics\n\
     GET  /metrics     - Prometheus metrics\n"
}
