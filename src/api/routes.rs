use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthSnapshot;
use crate::api::latency::LatencySummary;
use crate::cache::OddsCache;
use crate::config::parse_id_list;
use crate::error::CacheError;
use crate::types::{BetStop, MarketOrder, OddsChange};

#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<OddsCache>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/fixtures/:id", delete(delete_fixture))
        .route("/fixtures/:id/markets", get(get_markets).delete(delete_markets))
        .route("/fixtures/:id/markets/:market_id", get(get_market))
        .route("/fixtures/:id/odds/:market_id/:outcome_id", get(get_odds))
        .route("/fixtures/:id/default-market", get(get_default_market))
        .route("/fixtures/:id/producer", get(get_producer))
        .route("/odds-change", post(post_odds_change))
        .route("/bet-stop", post(post_bet_stop))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct MarketsQuery {
    /// Comma-separated market ids to put first.
    pub order: Option<String>,
    /// Comma-separated market ids to return, nothing else.
    pub only: Option<String>,
}

#[derive(Deserialize)]
pub struct SpecifierQuery {
    #[serde(default)]
    pub specifier: String,
}

#[derive(Deserialize)]
pub struct DefaultMarketQuery {
    pub sport_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct DeleteMarketsQuery {
    pub producer_id: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct DefaultMarketResponse {
    pub fixture_id: i64,
    pub market_id: i64,
}

#[derive(Serialize)]
pub struct AppliedResponse {
    pub processed: usize,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub odds_change: LatencySummary,
    pub bet_stop: LatencySummary,
}

/// 200 with the value, or an empty 404 on a cache miss.
fn found<T: Serialize>(value: Option<T>) -> Response {
    match value {
        Some(v) => Json(v).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn order_list(raw: &str) -> Result<Vec<MarketOrder>, (StatusCode, String)> {
    parse_id_list(raw)
        .map(|ids| ids.into_iter().map(MarketOrder::new).collect())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid market id list: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_markets(
    State(state): State<ApiState>,
    Path(fixture_id): Path<i64>,
    Query(params): Query<MarketsQuery>,
) -> Result<Response, (StatusCode, String)> {
    let markets = match (params.only.as_deref(), params.order.as_deref()) {
        (Some(only), _) => state.cache.specified_markets(fixture_id, &order_list(only)?).await,
        (None, Some(order)) => {
            state.cache.all_markets_ordered_by(fixture_id, &order_list(order)?).await
        }
        (None, None) => state.cache.all_markets(fixture_id).await,
    };
    Ok(found(markets))
}

async fn get_market(
    State(state): State<ApiState>,
    Path((fixture_id, market_id)): Path<(i64, i64)>,
    Query(params): Query<SpecifierQuery>,
) -> Response {
    found(state.cache.market(fixture_id, market_id, &params.specifier).await)
}

async fn get_odds(
    State(state): State<ApiState>,
    Path((fixture_id, market_id, outcome_id)): Path<(i64, i64, String)>,
    Query(params): Query<SpecifierQuery>,
) -> Response {
    found(
        state
            .cache
            .odds(fixture_id, market_id, &params.specifier, &outcome_id)
            .await,
    )
}

async fn get_default_market(
    State(state): State<ApiState>,
    Path(fixture_id): Path<i64>,
    Query(params): Query<DefaultMarketQuery>,
) -> Json<DefaultMarketResponse> {
    let market_id = state
        .cache
        .default_market_id(fixture_id, params.sport_id.unwrap_or(0))
        .await;
    Json(DefaultMarketResponse { fixture_id, market_id })
}

async fn get_producer(State(state): State<ApiState>, Path(fixture_id): Path<i64>) -> Response {
    let assignment = state.cache.producer_assignment(fixture_id).await;
    found((assignment.producer_id != 0).then_some(assignment))
}

async fn post_odds_change(
    State(state): State<ApiState>,
    Json(odds): Json<OddsChange>,
) -> Result<Json<AppliedResponse>, CacheError> {
    let processed = state.cache.apply_odds_change(&odds).await?;
    Ok(Json(AppliedResponse { processed }))
}

async fn post_bet_stop(
    State(state): State<ApiState>,
    Json(stop): Json<BetStop>,
) -> Result<StatusCode, CacheError> {
    state.cache.apply_bet_stop(&stop).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_fixture(
    State(state): State<ApiState>,
    Path(fixture_id): Path<i64>,
) -> Json<DeletedResponse> {
    let deleted = state.cache.delete_fixture_data(fixture_id).await;
    Json(DeletedResponse { deleted })
}

async fn delete_markets(
    State(state): State<ApiState>,
    Path(fixture_id): Path<i64>,
    Query(params): Query<DeleteMarketsQuery>,
) -> Json<DeletedResponse> {
    let deleted = state.cache.delete_all_markets(params.producer_id, fixture_id).await;
    Json(DeletedResponse { deleted })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.cache.health().snapshot())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let latency = state.cache.latency();
    Json(LatencyResponse {
        odds_change: latency.odds_change.summary(),
        bet_stop: latency.bet_stop.summary(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::testkit::cache_over;
    use crate::store::MemoryStore;
    use crate::types::Market;

    fn app() -> (Router, tokio::sync::mpsc::Receiver<crate::recovery::RecoveryRequest>) {
        let (cache, rx) = cache_over(MemoryStore::new());
        (router(ApiState { cache: Arc::new(cache) }), rx)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header("content-type", "application/json");
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    const ODDS_CHANGE: &str = r#"{
        "match_id": 77,
        "producer_id": 1,
        "sport_id": 1,
        "markets": [
            {"market_id": 1, "market_name": "1x2", "specifiers": "", "status": 0, "status_name": "active",
             "outcome": [{"outcome_id": "1", "outcome_name": "home", "odds": 1.8, "active": 1, "probability": 0.55}]},
            {"market_id": 18, "market_name": "Total", "specifiers": "total=2.5", "status": 0, "status_name": "active",
             "outcome": [{"outcome_id": "12", "outcome_name": "over", "odds": 2.1, "active": 1, "probability": 0.47}]}
        ]
    }"#;

    #[tokio::test]
    async fn ingest_then_read_back() {
        let (app, _rx) = app();
        let (status, body) = send(&app, Method::POST, "/odds-change", Some(ODDS_CHANGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap()["processed"], 2);

        let (status, body) = send(&app, Method::GET, "/fixtures/77/markets?order=18", None).await;
        assert_eq!(status, StatusCode::OK);
        let markets: Vec<Market> = serde_json::from_slice(&body).unwrap();
        assert_eq!(markets.iter().map(|m| m.market_id).collect::<Vec<_>>(), vec![18, 1]);

        let (status, body) =
            send(&app, Method::GET, "/fixtures/77/odds/18/12?specifier=total%3D2.5", None).await;
        assert_eq!(status, StatusCode::OK);
        let details: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(details["outcome_name"], "over");
        assert_eq!(details["producer_id"], 1);

        let (_, body) = send(&app, Method::GET, "/fixtures/77/default-market?sport_id=1", None).await;
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap()["market_id"], 1);

        let (status, _) = send(&app, Method::GET, "/fixtures/77/producer", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn miss_is_404_and_queues_recovery() {
        let (app, mut rx) = app();
        let (status, body) = send(&app, Method::GET, "/fixtures/5/markets/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
        assert_eq!(rx.try_recv().unwrap().fixture_id, 5);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn bad_order_list_is_rejected() {
        let (app, _rx) = app();
        let (status, _) = send(&app, Method::GET, "/fixtures/5/markets?order=1,x", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bet_stop_for_unknown_fixture_is_404() {
        let (app, _rx) = app();
        let body = r#"{"match_id": 9, "producer_id": 1, "status": 1, "status_name": "suspended"}"#;
        let (status, _) = send(&app, Method::POST, "/bet-stop", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bet_stop_then_delete_fixture() {
        let (app, _rx) = app();
        send(&app, Method::POST, "/odds-change", Some(ODDS_CHANGE)).await;

        let body = r#"{"match_id": 77, "producer_id": 1, "status": 1, "status_name": "suspended"}"#;
        let (status, _) = send(&app, Method::POST, "/bet-stop", Some(body)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/fixtures/77/markets/1", None).await;
        let market: Market = serde_json::from_slice(&body).unwrap();
        assert_eq!(market.status, 1);

        let (status, _) = send(&app, Method::DELETE, "/fixtures/77", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, "/fixtures/77/markets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn latency_and_health_report_ingest() {
        let (app, _rx) = app();
        send(&app, Method::POST, "/odds-change", Some(ODDS_CHANGE)).await;

        let (_, body) = send(&app, Method::GET, "/stats/latency", None).await;
        let latency: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(latency["odds_change"]["samples"], 1);
        assert_eq!(latency["bet_stop"]["samples"], 0);

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(health["last_ingest_at_ns"].as_u64().unwrap() > 0);
    }
}
