// src/main.rs
use prime_dashboard::config::Config;
use prime_dashboard::dashboard::{serve, DashboardController};
use prime_dashboard::domain::errors::AppResult;
use prime_dashboard::exchange::{HttpTransport, HyperTransport, MarketDataClient, PortfolioClient};

use std::sync::Arc;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting prime_dashboard v{}", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Public API {}, brokerage API {}",
        config.exchange.public_url,
        config.exchange.prime_url
    );

    let missing = config.credentials.missing();
    if !missing.is_empty() {
        log::warn!(
            "Balances and orders are unavailable until {} are set",
            missing.join(", ")
        );
    }

    let config = Arc::new(config);
    let addr = config.dashboard.socket_addr()?;

    // One pooled HTTPS client shared by both APIs
    let transport: Arc<dyn HttpTransport> =
        Arc::new(HyperTransport::new(config.exchange.request_timeout()));

    let market = Arc::new(MarketDataClient::new(
        Arc::clone(&transport),
        &config.exchange.public_url,
    ));
    let portfolio = Arc::new(PortfolioClient::new(
        transport,
        &config.exchange.prime_url,
        config.credentials.clone(),
    ));

    let controller = Arc::new(DashboardController::new(Arc::clone(&config), market, portfolio));

    log::info!(
        "Offering {} trading pairs. Press Ctrl+C to stop.",
        config.dashboard.trading_pairs.len()
    );
    serve(addr, controller).await?;

    log::info!("Shutdown complete. Goodbye!");
    Ok(())
}
