use std::{net::SocketAddr, sync::Arc};

use admission::notice::applicant_message;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use server_api::{
    admission_letter, allocate_seats, check_marksheet, generate_merit_list, get_applicant,
    list_applicants, list_departments, list_selected, merit_list, register_applicant,
    review_documents, ApiContext,
};
use shared::{
    confirm::ReviewDecision,
    domain::{Applicant, ApplicantId},
    error::{ApiError, ErrorCode},
    protocol::{
        AllocationSummary, DepartmentSummary, MarksheetResponse, RegisterApplicantRequest,
        ReviewRequest, ReviewResponse, ServerEvent,
    },
};
use storage::Storage;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{error, info, warn};

mod app_state;
mod config;
mod pages;

use app_state::AppState;
use config::{load_settings, parse_departments, prepare_database_url};

const MAX_BODY_BYTES: usize = 256 * 1024;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Default, Deserialize)]
struct NameFilterQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct VerifyForm {
    action: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let departments = parse_departments(&settings.departments)?;
    let added = storage.seed_departments(&departments).await?;
    info!(added, configured = departments.len(), "departments seeded");

    let (events, _) = broadcast::channel(256);
    let _notifications = spawn_notification_log(&events);

    let state = AppState {
        api: ApiContext::new(storage),
        events,
        static_dir: settings.static_dir,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/healthz", get(healthz))
        .route("/departments", get(http_list_departments))
        .route("/applicants", get(http_list_applicants).post(http_register))
        .route("/applicants/:applicant_id", get(http_get_applicant))
        .route("/applicants/:applicant_id/review", post(http_review))
        .route("/applicants/:applicant_id/marksheet", post(http_marksheet))
        .route("/applicants/:applicant_id/letter", get(http_letter))
        .route("/merit", get(http_merit_list).post(http_generate_merit))
        .route("/allocate", post(http_allocate))
        .route("/selected", get(http_list_selected))
        .route("/dashboard", get(dashboard))
        .route("/verify", get(verify))
        .route("/verify/:applicant_id", post(verify_action))
        .route("/ws", get(ws_handler))
        .nest_service("/static", static_files)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Logs the applicant-facing message of every event that has one.
fn spawn_notification_log(events: &broadcast::Sender<ServerEvent>) -> JoinHandle<()> {
    let mut events_rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(event) => {
                    if let Some((to, message)) = applicant_message(&event) {
                        info!(to, %message, "email notification");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_list_departments(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DepartmentSummary>>> {
    let departments = list_departments(&state.api).await.map_err(api_error)?;
    Ok(Json(departments))
}

async fn http_list_applicants(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NameFilterQuery>,
) -> ApiResult<Json<Vec<Applicant>>> {
    let applicants = list_applicants(&state.api, &q.q).await.map_err(api_error)?;
    Ok(Json(applicants))
}

async fn http_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterApplicantRequest>,
) -> ApiResult<(StatusCode, Json<Applicant>)> {
    let outcome = register_applicant(&state.api, req)
        .await
        .map_err(api_error)?;
    state.publish(outcome.events);
    Ok((StatusCode::CREATED, Json(outcome.value)))
}

async fn http_get_applicant(
    State(state): State<Arc<AppState>>,
    Path(applicant_id): Path<i64>,
) -> ApiResult<Json<Applicant>> {
    let applicant = get_applicant(&state.api, ApplicantId(applicant_id))
        .await
        .map_err(api_error)?;
    Ok(Json(applicant))
}

async fn http_generate_merit(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Applicant>>> {
    let outcome = generate_merit_list(&state.api).await.map_err(api_error)?;
    state.publish(outcome.events);
    Ok(Json(outcome.value))
}

async fn http_merit_list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Applicant>>> {
    let applicants = merit_list(&state.api).await.map_err(api_error)?;
    Ok(Json(applicants))
}

async fn http_allocate(State(state): State<Arc<AppState>>) -> ApiResult<Json<AllocationSummary>> {
    let outcome = allocate_seats(&state.api).await.map_err(api_error)?;
    state.publish(outcome.events);
    Ok(Json(outcome.value))
}

async fn http_list_selected(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Applicant>>> {
    let applicants = list_selected(&state.api).await.map_err(api_error)?;
    Ok(Json(applicants))
}

async fn http_review(
    State(state): State<Arc<AppState>>,
    Path(applicant_id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    let outcome = review_documents(&state.api, ApplicantId(applicant_id), req.decision)
        .await
        .map_err(api_error)?;
    state.publish(outcome.events);
    Ok(Json(outcome.value))
}

async fn http_marksheet(
    State(state): State<Arc<AppState>>,
    Path(applicant_id): Path<i64>,
    document_text: String,
) -> ApiResult<Json<MarksheetResponse>> {
    if document_text.trim().is_empty() {
        return Err(api_error(ApiError::validation(
            "marksheet text cannot be empty",
        )));
    }
    let response = check_marksheet(&state.api, ApplicantId(applicant_id), &document_text)
        .await
        .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_letter(
    State(state): State<Arc<AppState>>,
    Path(applicant_id): Path<i64>,
) -> ApiResult<(StatusCode, HeaderMap, String)> {
    let letter = admission_letter(&state.api, ApplicantId(applicant_id))
        .await
        .map_err(api_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"admission_letter_{applicant_id}.txt\""
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, letter))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NameFilterQuery>,
) -> ApiResult<Html<String>> {
    let applicants = list_applicants(&state.api, &q.q).await.map_err(api_error)?;
    let departments = list_departments(&state.api).await.map_err(api_error)?;
    Ok(Html(pages::dashboard_page(&applicants, &departments, &q.q)))
}

async fn verify(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let selected = list_selected(&state.api).await.map_err(api_error)?;
    Ok(Html(pages::verify_page(&selected)))
}

async fn verify_action(
    State(state): State<Arc<AppState>>,
    Path(applicant_id): Path<i64>,
    Form(form): Form<VerifyForm>,
) -> ApiResult<Redirect> {
    let decision = ReviewDecision::from_form_value(&form.action);
    let outcome = review_documents(&state.api, ApplicantId(applicant_id), decision)
        .await
        .map_err(api_error)?;
    state.publish(outcome.events);
    Ok(Redirect::to("/verify"))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (sender, mut receiver) = socket.split();
    let send_task = tokio::spawn(forward_events(state.events.subscribe(), sender));

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

/// Streams events as JSON text frames until the bus closes or the sink fails.
/// A client that falls behind skips the missed events and keeps receiving.
async fn forward_events<S>(mut events_rx: broadcast::Receiver<ServerEvent>, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    loop {
        let event = match events_rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream client fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let text = match serde_json::to_string(&event) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
