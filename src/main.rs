// src/main.rs
use broker_front::api::{self, AppState};
use broker_front::config::Config;
use log::{error, info};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return;
        }
    };
    config.init_logging();

    let client = match Client::builder().timeout(Duration::from_secs(10)).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    info!("Starting the broker front end...");
    info!("Using backend API at {}", config.api_url());
    let listen_addr = config.listen_addr;
    let state = Arc::new(AppState::new(config, client));

    let routes = api::routes(state);

    info!("Server running on http://{}", listen_addr);
    warp::serve(routes).run(listen_addr).await;
}
