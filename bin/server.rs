// Mortgage Calculator - Web Server
// REST API with Axum over the calculator and the scenario store

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use mortgage_calc::{
    build_schedule, calculate, delete_scenario, find_scenario_by_name, get_events_for_entity,
    init_tracing, list_scenarios, load_scenario, save_scenario, AppConfig, CalculatorError, Event,
    LoanScenario, PaymentBreakdown, PaymentRow, SaveOutcome, SavedScenario, YearSummary,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::ok(data))).into_response()
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

fn calculator_error(err: CalculatorError) -> Response {
    fail(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
}

fn store_error(context: &str, err: anyhow::Error) -> Response {
    tracing::error!(error = %err, "{}", context);
    fail(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// Run `f` against the shared connection, mapping a poisoned lock to 500
fn with_db<T>(
    state: &AppState,
    f: impl FnOnce(&Connection) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let conn = state
        .db
        .lock()
        .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
    f(&conn)
}

/// Schedule response: the breakdown, every monthly row and the yearly rollup
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    breakdown: PaymentBreakdown,
    rows: Vec<PaymentRow>,
    yearly: Vec<YearSummary>,
}

#[derive(Deserialize)]
struct SaveRequest {
    name: String,
    inputs: LoanScenario,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/calculate - Payment breakdown for the posted loan terms
async fn post_calculate(Json(inputs): Json<LoanScenario>) -> Response {
    match calculate(&inputs) {
        Ok(breakdown) => respond(StatusCode::OK, breakdown),
        Err(e) => calculator_error(e),
    }
}

/// POST /api/schedule - Full amortization schedule
async fn post_schedule(Json(inputs): Json<LoanScenario>) -> Response {
    match build_schedule(&inputs) {
        Ok(schedule) => {
            let yearly = schedule.yearly_summary();
            respond(
                StatusCode::OK,
                ScheduleResponse {
                    breakdown: schedule.breakdown,
                    rows: schedule.rows,
                    yearly,
                },
            )
        }
        Err(e) => calculator_error(e),
    }
}

/// GET /api/scenarios - All saved scenarios, newest first
async fn get_scenarios(State(state): State<AppState>) -> Response {
    match with_db(&state, list_scenarios) {
        Ok(scenarios) => respond(StatusCode::OK, scenarios),
        Err(e) => store_error("Error listing scenarios", e),
    }
}

/// POST /api/scenarios - Calculate and save a named snapshot
async fn post_scenario(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Response {
    let snapshot = match SavedScenario::new(&request.name, request.inputs) {
        Ok(snapshot) => snapshot,
        Err(e) => return calculator_error(e),
    };

    match with_db(&state, |conn| save_scenario(conn, &snapshot)) {
        Ok(SaveOutcome::Saved) => respond(StatusCode::CREATED, snapshot),
        Ok(SaveOutcome::NameTaken) => fail(
            StatusCode::CONFLICT,
            format!("a scenario named \"{}\" already exists", snapshot.name),
        ),
        Err(e) => store_error("Error saving scenario", e),
    }
}

/// GET /api/scenarios/:id - Load a snapshot verbatim
async fn get_scenario(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match with_db(&state, |conn| load_scenario(conn, &id)) {
        Ok(Some(snapshot)) => respond(StatusCode::OK, snapshot),
        Ok(None) => fail(StatusCode::NOT_FOUND, format!("no scenario with id {}", id)),
        Err(e) => store_error("Error loading scenario", e),
    }
}

/// GET /api/scenarios/by-name/:name - Load a snapshot by name
///
/// `Path` has already percent-decoded the segment exactly once.
async fn get_scenario_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match with_db(&state, |conn| find_scenario_by_name(conn, &name)) {
        Ok(Some(snapshot)) => respond(StatusCode::OK, snapshot),
        Ok(None) => fail(StatusCode::NOT_FOUND, format!("no scenario named {}", name)),
        Err(e) => store_error("Error loading scenario", e),
    }
}

/// DELETE /api/scenarios/:id
async fn remove_scenario(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match with_db(&state, |conn| delete_scenario(conn, &id)) {
        Ok(true) => respond(StatusCode::OK, id),
        Ok(false) => fail(StatusCode::NOT_FOUND, format!("no scenario with id {}", id)),
        Err(e) => store_error("Error deleting scenario", e),
    }
}

/// GET /api/scenarios/:id/events - Audit trail
async fn get_scenario_events(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match with_db(&state, |conn| get_events_for_entity(conn, "scenario", &id)) {
        Ok(events) => respond::<Vec<Event>>(StatusCode::OK, events),
        Err(e) => store_error("Error loading events", e),
    }
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/calculate", post(post_calculate))
        .route("/schedule", post(post_schedule))
        .route("/scenarios", get(get_scenarios).post(post_scenario))
        .route("/scenarios/by-name/:name", get(get_scenario_by_name))
        .route("/scenarios/:id", get(get_scenario).delete(remove_scenario))
        .route("/scenarios/:id/events", get(get_scenario_events))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(&config.log_filter);

    let conn = config.open_database()?;
    tracing::info!(path = ?config.database_path, "database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let conn = Connection::open_in_memory().unwrap();
        mortgage_calc::setup_database(&conn).unwrap();
        build_router(AppState {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn reference_inputs() -> serde_json::Value {
        serde_json::json!({
            "price": 500000.0,
            "downPayment": 100000.0,
            "annualRatePercent": 6.5,
            "termYears": 30,
            "annualPropertyTax": 12000.0,
            "annualInsurance": 2400.0,
            "annualHOA": 1200.0
        })
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router();
        let (status, body) = send(&router, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_calculate_endpoint() {
        let router = test_router();
        let (status, body) =
            send(&router, Method::POST, "/api/calculate", Some(reference_inputs())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let payment = body["data"]["monthlyPayment"].as_f64().unwrap();
        assert!((payment - 3828.27).abs() < 0.01);
        assert_eq!(body["data"]["monthlyHOA"], 100.0);
    }

    #[tokio::test]
    async fn test_calculate_rejects_zero_term() {
        let router = test_router();
        let mut inputs = reference_inputs();
        inputs["termYears"] = serde_json::json!(0);

        let (status, body) = send(&router, Method::POST, "/api/calculate", Some(inputs)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("termYears"));
    }

    #[tokio::test]
    async fn test_schedule_endpoint() {
        let router = test_router();
        let (status, body) =
            send(&router, Method::POST, "/api/schedule", Some(reference_inputs())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rows"].as_array().unwrap().len(), 360);
        assert_eq!(body["data"]["yearly"].as_array().unwrap().len(), 30);
    }

    #[tokio::test]
    async fn test_scenario_lifecycle() {
        let router = test_router();
        let request = serde_json::json!({ "name": "Family home", "inputs": reference_inputs() });

        let (status, body) =
            send(&router, Method::POST, "/api/scenarios", Some(request.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let saved_outputs = body["data"]["outputs"].clone();

        let (status, _) = send(&router, Method::POST, "/api/scenarios", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/scenarios/{}", id);
        let (status, body) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outputs"], saved_outputs);

        let (status, body) =
            send(&router, Method::GET, "/api/scenarios/by-name/Family%20home", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (_, body) = send(&router, Method::GET, "/api/scenarios", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&router, Method::GET, &format!("{}/events", uri), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_inputs() {
        let router = test_router();
        let mut inputs = reference_inputs();
        inputs["downPayment"] = serde_json::json!(600000.0);

        let request = serde_json::json!({ "name": "Upside down", "inputs": inputs });
        let (status, _) = send(&router, Method::POST, "/api/scenarios", Some(request)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_name_with_percent_is_decoded_once() {
        let router = test_router();
        let request = serde_json::json!({ "name": "50%20off", "inputs": reference_inputs() });

        let (status, body) = send(&router, Method::POST, "/api/scenarios", Some(request)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].clone();

        let (status, body) =
            send(&router, Method::GET, "/api/scenarios/by-name/50%2520off", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id);
        assert_eq!(body["data"]["name"], "50%20off");
    }

    #[tokio::test]
    async fn test_schedule_rejects_huge_term() {
        let router = test_router();
        let mut inputs = reference_inputs();
        inputs["annualRatePercent"] = serde_json::json!(0.0);
        inputs["termYears"] = serde_json::json!(300_000_000u32);

        let (status, body) = send(&router, Method::POST, "/api/schedule", Some(inputs)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("termYears"));
    }
}
