use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    api::handler::AppState,
    chain::{fetch_evm_chain_id, TendermintClient},
    config::Config,
    error::{AppError, AppResult, ChainError},
    extractor::EventExtractor,
    ledger::LedgerRepository,
    middleware::RateLimitLayer,
    reconciliation::{ReconciliationScanner, ScanConfig, WatchScheduleConfig, WatchScheduler},
};

/// Everything `main` needs: HTTP state plus the not-yet-started watch loop.
pub struct Application {
    pub state: AppState,
    pub scheduler: WatchScheduler,
}

pub async fn initialize_app(config: &Config) -> AppResult<Application> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url, config.db_max_connections).await?;
    let ledger = Arc::new(LedgerRepository::new(pool));

    // Chain access
    let http = reqwest::Client::builder()
        .timeout(config.rpc_timeout())
        .build()
        .map_err(ChainError::from)?;
    let chain_id = resolve_chain_id(config, &http).await?;
    let chain = Arc::new(TendermintClient::new(
        http,
        config.rpc_url.clone(),
        config.rpc_base64_attributes,
    ));
    info!("✅ Chain RPC client ready: {} (chain id {})", config.rpc_url, chain_id);

    // Address handling is configuration, handed to whoever reads addresses
    let codec = config.address_codec()?;
    let business_address = config.business_address()?;
    info!("💼 Business address: {}", business_address);

    let scan_config = ScanConfig {
        chain_id,
        window_size: config.scan_window_size,
        page_size: config.scan_page_size,
        business_address,
    };
    let scanner = Arc::new(ReconciliationScanner::new(
        chain,
        ledger.clone(),
        ledger.clone(),
        ledger.clone(),
        EventExtractor::new(codec.clone()),
        scan_config,
    ));

    let scheduler = WatchScheduler::new(
        WatchScheduleConfig {
            scan_interval: config.scan_interval(),
        },
        scanner.clone(),
    );

    let state = AppState {
        ledger,
        scanner,
        codec,
        scan_limiter: RateLimitLayer::per_minute(config.scan_rate_limit_per_minute),
    };

    Ok(Application { state, scheduler })
}

/// The EVM endpoint is authoritative when configured.
async fn resolve_chain_id(config: &Config, http: &reqwest::Client) -> AppResult<i64> {
    match (&config.evm_url, config.chain_id) {
        (Some(evm_url), configured) => {
            let fetched = fetch_evm_chain_id(http, evm_url).await?;
            if let Some(configured) = configured {
                if configured != fetched {
                    warn!(
                        "⚠️  CHAIN_ID {} disagrees with eth_chainId {}; using {}",
                        configured, fetched, fetched
                    );
                }
            }
            Ok(fetched)
        }
        (None, Some(configured)) => Ok(configured),
        (None, None) => Err(AppError::Config("either EVM_URL or CHAIN_ID must be set".into())),
    }
}

async fn initialize_database(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("✓ Database pool configured: {} max connections", max_connections);

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
