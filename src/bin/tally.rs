use {
    clap::Parser,
    std::process::ExitCode,
    tally::{Tally, config::TallyServerConfig},
    tracing::error,
};

#[derive(Parser)]
#[command(version, about = "In-memory account ledger server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match TallyServerConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load server config file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut app = match Tally::new(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Tally failed to run: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
