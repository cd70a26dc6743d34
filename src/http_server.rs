//! HTTP binding of the ledger operations.
//!
//! Every operation is a form-encoded `POST` under [`ACCOUNT_MANAGER_PATH`].
//! Rejected operations answer `400 Bad Request` with the reason as plain text.

use {
    crate::{
        config::HttpConfig,
        ledger::{Ledger, error::LedgerError, interface::LedgerInterface},
        measure,
        metrics::{
            OPERATIONS_REJECTED_TOTAL, OPERATIONS_SUCCEEDED_TOTAL, REQUEST_TIME_SECONDS,
            handler::render_metrics,
        },
        models::{Account, AccountId, OwnerId},
    },
    axum::{
        Form, Json, Router,
        extract::{Request, State},
        http::StatusCode,
        middleware::{self, Next},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    std::sync::Arc,
    tokio::net::TcpListener,
    tracing::{error, info, warn},
};

pub const ACCOUNT_MANAGER_PATH: &str = "/accountmanager";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountForm {
    pub owner_id: OwnerId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAccountForm {
    pub account_id: AccountId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeForm {
    pub account_id: AccountId,
    pub money: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferForm {
    pub source_account_id: AccountId,
    pub target_account_id: AccountId,
    pub money: f64,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, self.to_string()).into_response()
    }
}

/// Counts and logs the outcome of a ledger call before it is turned into a response.
fn record<T>(operation: &str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match &result {
        Ok(_) => {
            OPERATIONS_SUCCEEDED_TOTAL.inc();
            info!("Successfully processed {} request", operation);
        }
        Err(e) if e.is_validation() => {
            OPERATIONS_REJECTED_TOTAL.inc();
            warn!("Rejected {} request: {}", operation, e);
        }
        Err(e) => error!("Failed to process {} request: {}", operation, e),
    }
    result
}

async fn open_account(
    State(ledger): State<Arc<Ledger>>,
    Form(form): Form<OpenAccountForm>,
) -> Result<Json<Account>, LedgerError> {
    record("open_account", ledger.open_account(form.owner_id)).map(Json)
}

async fn get_account(
    State(ledger): State<Arc<Ledger>>,
    Form(form): Form<GetAccountForm>,
) -> Result<Json<Account>, LedgerError> {
    record("get_account", ledger.get_account(form.account_id)).map(Json)
}

async fn deposit(
    State(ledger): State<Arc<Ledger>>,
    Form(form): Form<BalanceChangeForm>,
) -> Result<StatusCode, LedgerError> {
    record("deposit", ledger.deposit(form.account_id, form.money))?;
    Ok(StatusCode::OK)
}

async fn withdraw(
    State(ledger): State<Arc<Ledger>>,
    Form(form): Form<BalanceChangeForm>,
) -> Result<StatusCode, LedgerError> {
    record("withdraw", ledger.withdraw(form.account_id, form.money))?;
    Ok(StatusCode::OK)
}

async fn transfer(
    State(ledger): State<Arc<Ledger>>,
    Form(form): Form<TransferForm>,
) -> Result<StatusCode, LedgerError> {
    record(
        "transfer",
        ledger.transfer(form.source_account_id, form.target_account_id, form.money),
    )?;
    Ok(StatusCode::OK)
}

async fn metrics() -> Result<String, (StatusCode, String)> {
    render_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn track_request_time(request: Request, next: Next) -> Response {
    measure!(REQUEST_TIME_SECONDS, { next.run(request).await })
}

pub fn router(ledger: Arc<Ledger>) -> Router {
    let account_manager = Router::new()
        .route("/openAccount", post(open_account))
        .route("/getAccount", post(get_account))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/transfer", post(transfer));

    Router::new()
        .nest(ACCOUNT_MANAGER_PATH, account_manager)
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn(track_request_time))
        .with_state(ledger)
}

pub async fn serve(
    listener: TcpListener,
    ledger: Arc<Ledger>,
    mut shutdown_receiver: tokio::sync::broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let shutdown = async move {
        shutdown_receiver.recv().await.ok();
        info!("HTTP server is shutting down...");
    };

    axum::serve(listener, router(ledger))
        .with_graceful_shutdown(shutdown)
        .await
}

pub async fn start_http_service(
    config: HttpConfig,
    ledger: Arc<Ledger>,
    shutdown_receiver: tokio::sync::broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let address = config.socket_address();
    let listener = TcpListener::bind(&address).await.inspect_err(|e| {
        error!("Could not bind HTTP server to {}: {}", address, e);
    })?;

    info!("Initializing HTTP server at {}", address);

    serve(listener, ledger, shutdown_receiver)
        .await
        .inspect_err(|e| error!("Error in HTTP server: {}", e))
}
