use {
    clap::Parser,
    rand::{Rng, SeedableRng, seq::IndexedRandom},
    reqwest::Client,
    std::{sync::Arc, time::Duration},
    tally::{
        config::TallyClientConfig,
        http_server::ACCOUNT_MANAGER_PATH,
        models::{Account, AccountId},
    },
    tokio::sync::RwLock,
    tracing::{error, info, warn},
};

#[derive(Parser, Debug)]
#[command(version, about = "Load generator for the tally ledger server", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "client.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = TallyClientConfig::from_file(&args.config)
        .map_err(|e| format!("Failed to load client configuration file: {}", e))?;

    tally::logging::init_logging(config.debug, &config.logging.directory)?;

    let base_url = format!("http://{}{}", config.http.socket_address(), ACCOUNT_MANAGER_PATH);
    let account_ids = Arc::new(RwLock::new(Vec::<AccountId>::new()));
    let client = Client::new();

    let mut join_handles = Vec::new();
    for worker_id in 0..config.tasks {
        let handle = tokio::spawn(run_worker(
            worker_id,
            client.clone(),
            base_url.clone(),
            account_ids.clone(),
            config.clone(),
        ));
        join_handles.push(handle);
    }

    info!("Starting load generator with {} tasks...", config.tasks);
    for handle in join_handles {
        if let Err(e) = handle.await {
            error!("One of the worker tasks failed: {}", e);
        };
    }
    Ok(())
}

/// Posts a form and returns the rejection reason for non-success statuses.
async fn post_form(
    client: &Client,
    url: String,
    form: &[(&str, String)],
) -> Result<reqwest::Response, String> {
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        Ok(response)
    } else {
        Err(response.text().await.unwrap_or_default())
    }
}

async fn run_worker(
    worker_id: usize,
    client: Client,
    base_url: String,
    account_ids: Arc<RwLock<Vec<AccountId>>>,
    config: TallyClientConfig,
) {
    let mut rng = rand::rngs::StdRng::from_os_rng();

    loop {
        let operation_chance = rng.random_range(0..100);

        if operation_chance < config.create_chance {
            let owner_id: i64 = rng.random_range(1..1000);
            let form = [("ownerId", owner_id.to_string())];

            let Ok(response) =
                post_form(&client, format!("{base_url}/openAccount"), &form).await
            else {
                continue;
            };

            match response.json::<Account>().await {
                Ok(account) => {
                    account_ids.write().await.push(account.id);
                    info!("[Worker {}] Opened account: {}", worker_id, account.id);
                }
                Err(e) => warn!("[Worker {}] Unreadable account: {}", worker_id, e),
            }
        } else if operation_chance
            < config.create_chance + config.deposit_chance + config.withdraw_chance
        {
            let is_deposit = operation_chance < config.create_chance + config.deposit_chance;
            let Some(account_id) = ({ account_ids.read().await.choose(&mut rng).cloned() })
            else {
                continue;
            };

            let amount: f64 = rng.random_range(1.0..500.0);
            let path = if is_deposit { "deposit" } else { "withdraw" };
            let form = [
                ("accountId", account_id.to_string()),
                ("money", amount.to_string()),
            ];

            match post_form(&client, format!("{base_url}/{path}"), &form).await {
                Ok(_) => info!(
                    "[Worker {}] {} {:.2} on account {}",
                    worker_id, path, amount, account_id
                ),
                Err(reason) => warn!(
                    "[Worker {}] {} {:.2} on account {} rejected: {}",
                    worker_id, path, amount, account_id, reason
                ),
            }
        } else {
            let (source_id, target_id) = {
                let ids_lock = account_ids.read().await;
                if ids_lock.len() < 2 {
                    // Need at least 2 accounts to transfer between
                    continue;
                }
                let sample: Vec<&AccountId> = ids_lock.choose_multiple(&mut rng, 2).collect();
                (*sample[0], *sample[1])
            };

            let amount: f64 = rng.random_range(1.0..250.0);
            let form = [
                ("sourceAccountId", source_id.to_string()),
                ("targetAccountId", target_id.to_string()),
                ("money", amount.to_string()),
            ];

            match post_form(&client, format!("{base_url}/transfer"), &form).await {
                Ok(_) => info!(
                    "[Worker {}] Transferred {:.2} from {} to {}",
                    worker_id, amount, source_id, target_id
                ),
                Err(reason) => warn!(
                    "[Worker {}] Transfer of {:.2} from {} to {} rejected: {}",
                    worker_id, amount, source_id, target_id, reason
                ),
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
