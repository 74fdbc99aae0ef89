// src/config.rs
use crate::domain::errors::{AppError, AppResult, ExchangeError, ExchangeResult};
use crate::domain::models::TradingPair;
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Dashboard configuration, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote API endpoints
    pub exchange: ExchangeConfig,

    /// Private API credentials
    pub credentials: Credentials,

    /// Dashboard server and controller settings
    pub dashboard: DashboardConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Base URL of the public market-data API
    pub public_url: String,

    /// Base URL of the private brokerage API, including the version prefix
    pub prime_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Private API credentials. Every field may be absent at load time; calls that
/// need them fail with `ExchangeError::MissingCredential`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub passphrase: Option<String>,
    pub portfolio_id: Option<String>,
}

impl Credentials {
    pub fn api_key(&self) -> ExchangeResult<&str> {
        Self::require(&self.api_key, "API_KEY")
    }

    pub fn secret_key(&self) -> ExchangeResult<&str> {
        Self::require(&self.secret_key, "SECRET_KEY")
    }

    pub fn passphrase(&self) -> ExchangeResult<&str> {
        Self::require(&self.passphrase, "PASSPHRASE")
    }

    pub fn portfolio_id(&self) -> ExchangeResult<&str> {
        Self::require(&self.portfolio_id, "PORTFOLIO_ID")
    }

    /// Names of the variables that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.api_key(), "API_KEY"),
            (self.secret_key(), "SECRET_KEY"),
            (self.passphrase(), "PASSPHRASE"),
            (self.portfolio_id(), "PORTFOLIO_ID"),
        ]
        .into_iter()
        .filter(|(value, _)| value.is_err())
        .map(|(_, name)| name)
        .collect()
    }

    fn require<'a>(value: &'a Option<String>, name: &'static str) -> ExchangeResult<&'a str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ExchangeError::MissingCredential(name))
    }
}

// Secrets stay out of debug output and logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<missing>" };
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("secret_key", &mask(&self.secret_key))
            .field("passphrase", &mask(&self.passphrase))
            .field("portfolio_id", &self.portfolio_id)
            .finish()
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Address the dashboard API listens on
    pub listen_addr: String,

    /// Trading pairs offered in the selector
    pub trading_pairs: Vec<TradingPair>,

    /// Extra balance fetches after the first one while waiting for settlement
    pub settlement_retries: u32,

    /// Delay between settlement fetches in milliseconds
    pub settlement_delay_ms: u64,
}

impl DashboardConfig {
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            AppError::Config(format!("Invalid DASHBOARD_ADDR {}: {}", self.listen_addr, e))
        })
    }

    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,

    /// Log to file
    pub to_file: bool,

    /// Log file path
    pub file_path: Option<String>,
}

impl Config {
    /// Load configuration from `DASHBOARD_CONFIG` if set, otherwise from the environment
    pub fn load() -> AppResult<Self> {
        dotenv().ok();

        match env::var("DASHBOARD_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let exchange_config = ExchangeConfig {
            public_url: env::var("PUBLIC_API_URL").unwrap_or(defaults.exchange.public_url),
            prime_url: env::var("PRIME_API_URL").unwrap_or(defaults.exchange.prime_url),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.exchange.request_timeout_secs),
        };

        let credentials = Credentials {
            api_key: env::var("API_KEY").ok(),
            secret_key: env::var("SECRET_KEY").ok(),
            passphrase: env::var("PASSPHRASE").ok(),
            portfolio_id: env::var("PORTFOLIO_ID").ok(),
        };

        let trading_pairs = match env::var("TRADING_PAIRS") {
            Ok(list) => parse_pairs(&list)?,
            Err(_) => defaults.dashboard.trading_pairs,
        };

        let dashboard_config = DashboardConfig {
            listen_addr: env::var("DASHBOARD_ADDR").unwrap_or(defaults.dashboard.listen_addr),
            trading_pairs,
            settlement_retries: parse_var("SETTLEMENT_RETRIES")?
                .unwrap_or(defaults.dashboard.settlement_retries),
            settlement_delay_ms: parse_var("SETTLEMENT_DELAY_MS")?
                .unwrap_or(defaults.dashboard.settlement_delay_ms),
        };

        let logging_config = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            to_file: env::var("LOG_TO_FILE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            file_path: env::var("LOG_FILE_PATH").ok(),
        };

        let config = Config {
            exchange: exchange_config,
            credentials,
            dashboard: dashboard_config,
            logging: logging_config,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let mut file = File::open(path)
            .map_err(|e| AppError::Config(format!("Failed to open config file: {}", e)))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if self.dashboard.trading_pairs.is_empty() {
            return Err(AppError::Config("TRADING_PAIRS must name at least one pair".to_string()));
        }
        self.dashboard.socket_addr()?;
        Ok(())
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> AppResult<()> {
        let mut builder = env_logger::Builder::new();

        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        builder.filter_level(log_level);

        if self.logging.to_file {
            if let Some(file_path) = &self.logging.file_path {
                let file = File::create(file_path).map_err(|e| {
                    AppError::Config(format!("Failed to create log file: {}", e))
                })?;

                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }

        builder
            .try_init()
            .map_err(|e| AppError::Config(format!("Failed to initialize logger: {}", e)))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig {
                public_url: "https://api.exchange.coinbase.com".to_string(),
                prime_url: "https://api.prime.coinbase.com/v1".to_string(),
                request_timeout_secs: 10,
            },
            credentials: Credentials::default(),
            dashboard: DashboardConfig {
                listen_addr: "127.0.0.1:8050".to_string(),
                trading_pairs: TradingPair::ALL.to_vec(),
                settlement_retries: 3,
                settlement_delay_ms: 200,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                to_file: false,
                file_path: None,
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> AppResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid {}={}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

fn parse_pairs(list: &str) -> AppResult<Vec<TradingPair>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TradingPair>().map_err(|e| AppError::Config(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let creds = Credentials {
            api_key: Some("key".into()),
            secret_key: None,
            passphrase: Some("  ".into()),
            portfolio_id: Some("portfolio".into()),
        };
        assert_eq!(creds.missing(), vec!["SECRET_KEY", "PASSPHRASE"]);
        assert!(matches!(
            creds.secret_key(),
            Err(ExchangeError::MissingCredential("SECRET_KEY"))
        ));
        assert_eq!(creds.portfolio_id().unwrap(), "portfolio");
    }

    #[test]
    fn debug_output_masks_secrets() {
        let creds = Credentials {
            api_key: Some("very-secret-key".into()),
            secret_key: Some("very-secret".into()),
            passphrase: None,
            portfolio_id: None,
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("very-secret"));
        assert!(printed.contains("<missing>"));
    }

    #[test]
    fn pair_lists_parse_and_reject_unknown_symbols() {
        assert_eq!(
            parse_pairs("BTC-USD, ETH-USD").unwrap(),
            vec![TradingPair::BtcUsd, TradingPair::EthUsd]
        );
        assert!(parse_pairs("BTC-USD,XRP-USD").is_err());
    }

    #[test]
    fn config_file_round_trips_through_disk() {
        let path = env::temp_dir().join(format!("prime-dashboard-{}.json", uuid::Uuid::new_v4()));
        let mut config = Config::default();
        config.dashboard.trading_pairs = vec![TradingPair::SolUsd];
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.dashboard.trading_pairs, vec![TradingPair::SolUsd]);
        assert_eq!(loaded.exchange.prime_url, config.exchange.prime_url);
        assert_eq!(loaded.dashboard.settlement_retries, 3);
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard.settlement_delay(), Duration::from_millis(200));
    }
}
