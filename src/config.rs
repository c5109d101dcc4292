use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, Environment};
use serde::Deserialize;

use crate::chain::AddressCodec;
use crate::error::{AppError, AppResult};
use crate::reconciliation::{DEFAULT_PAGE_SIZE, DEFAULT_WINDOW_SIZE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// CometBFT/Tendermint RPC endpoint.
    pub rpc_url: String,
    /// EVM JSON-RPC endpoint; the chain id is read from it when set.
    #[serde(default)]
    pub evm_url: Option<String>,
    #[serde(default)]
    pub chain_id: Option<i64>,
    pub business_addr: String,
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_window_size")]
    pub scan_window_size: u64,
    #[serde(default = "default_page_size")]
    pub scan_page_size: u32,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Tendermint 0.34 nodes base64-encode event attributes.
    #[serde(default = "default_true")]
    pub rpc_base64_attributes: bool,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_scan_rate_limit")]
    pub scan_rate_limit_per_minute: u32,
    /// Comma-separated list; unset means any origin.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_account_prefix() -> String {
    "aioz".to_string()
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_window_size() -> u64 {
    DEFAULT_WINDOW_SIZE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_rpc_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_scan_rate_limit() -> u32 {
    6
}

impl Config {
    /// Reads the process environment (`DATABASE_URL`, `RPC_URL`, ...).
    pub fn from_env() -> AppResult<Self> {
        Self::load(config::Config::builder().add_source(Environment::default().try_parsing(true)))
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> AppResult<Self> {
        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.scan_window_size == 0 {
            return Err(AppError::Config("SCAN_WINDOW_SIZE must be greater than zero".into()));
        }
        if self.scan_page_size == 0 {
            return Err(AppError::Config("SCAN_PAGE_SIZE must be greater than zero".into()));
        }
        if self.scan_interval_secs == 0 {
            return Err(AppError::Config("SCAN_INTERVAL_SECS must be greater than zero".into()));
        }
        if self.scan_rate_limit_per_minute == 0 {
            return Err(AppError::Config(
                "SCAN_RATE_LIMIT_PER_MINUTE must be greater than zero".into(),
            ));
        }
        if self.evm_url.is_none() && self.chain_id.is_none() {
            return Err(AppError::Config("either EVM_URL or CHAIN_ID must be set".into()));
        }

        self.business_address()?;
        Ok(())
    }

    pub fn address_codec(&self) -> AppResult<AddressCodec> {
        AddressCodec::new(&self.account_prefix)
            .map_err(|e| AppError::Config(format!("ACCOUNT_PREFIX: {}", e)))
    }

    /// Business address in canonical form.
    pub fn business_address(&self) -> AppResult<String> {
        self.address_codec()?
            .normalize(&self.business_addr)
            .map_err(|e| AppError::Config(format!("BUSINESS_ADDR: {}", e)))
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}
