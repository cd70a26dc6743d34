use {
    crate::{
        config::TallyServerConfig, http_server::start_http_service, ledger::Ledger,
        logging::init_logging, models::BalanceLimits,
    },
    std::sync::Arc,
    thiserror::Error,
    tokio::signal::ctrl_c,
    tracing::{error, info},
};

pub mod config;
pub mod http_server;
pub mod ledger;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod models;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::error::LedgerError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to broadcast shutdown signal")]
    Shutdown,
    #[error("HTTP service stopped unexpectedly")]
    ServiceStopped,
    #[error("HTTP service task failed: {0}")]
    ServiceTask(#[from] tokio::task::JoinError),
}

pub struct Tally {
    pub config: TallyServerConfig,
    ledger: Arc<Ledger>,
}

impl Tally {
    /// Builds the ledger from the configured limits, rejecting invalid ones.
    pub fn new(config: TallyServerConfig) -> Result<Self, TallyError> {
        let limits = BalanceLimits::try_from(config.limits)?;
        let ledger = Arc::new(Ledger::with_limits(limits));

        Ok(Tally { config, ledger })
    }

    pub async fn run(&mut self) -> Result<(), TallyError> {
        let (shutdown_sender, _) = tokio::sync::broadcast::channel::<()>(1);
        let mut services = tokio::task::JoinSet::new();
        init_logging(self.config.debug, &self.config.logging.directory)?;

        let limits = self.ledger.limits();
        info!(
            "Initializing ledger with balance limits [{}, {}]",
            limits.min_balance(),
            limits.max_balance()
        );

        {
            let http_ledger = Arc::clone(&self.ledger);
            let http_config = self.config.http.clone();
            let shutdown_receiver = shutdown_sender.subscribe();
            services.spawn(async move {
                start_http_service(http_config, http_ledger, shutdown_receiver).await
            })
        };

        tokio::select! {
            _ = ctrl_c() => {
                tracing::info!("Shutdown signal received, stopping services...");
                shutdown_sender.send(()).map_err(|_| TallyError::Shutdown)?;
                while services.join_next().await.is_some() {}

                tracing::info!(
                    "Ledger held {} accounts at shutdown",
                    self.ledger.account_count()?
                );
            }
            Some(res) = services.join_next() => {
                error!("HTTP service exited unexpectedly: {:?}", res);
                res??;
                return Err(TallyError::ServiceStopped);
            }
        }

        Ok(())
    }
}
