use {
    crate::{
        ledger::error::LedgerError,
        models::{BalanceLimits, DEFAULT_MAX_BALANCE, DEFAULT_MIN_BALANCE},
    },
    config::{Config, ConfigError, File, FileFormat},
};

#[derive(Clone, Debug, serde::Deserialize)]
pub struct TallyServerConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub debug: bool,
}

impl TallyServerConfig {
    pub fn from_file(config_path: &str) -> Result<Self, ConfigError> {
        load(File::new(config_path, FileFormat::Toml))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        load(File::from_str(contents, FileFormat::Toml))
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct TallyClientConfig {
    pub http: HttpConfig,
    pub tasks: usize,
    pub create_chance: u32,
    pub deposit_chance: u32,
    pub withdraw_chance: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub debug: bool,
}

impl TallyClientConfig {
    pub fn from_file(config_path: &str) -> Result<Self, ConfigError> {
        load(File::new(config_path, FileFormat::Toml))
    }
}

fn load<T, S>(source: S) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
    S: config::Source + Send + Sync + 'static,
{
    Config::builder().add_source(source).build()?.try_deserialize()
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct LimitsConfig {
    pub min_balance: f64,
    pub max_balance: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            min_balance: DEFAULT_MIN_BALANCE,
            max_balance: DEFAULT_MAX_BALANCE,
        }
    }
}

impl TryFrom<LimitsConfig> for BalanceLimits {
    type Error = LedgerError;

    fn try_from(config: LimitsConfig) -> Result<Self, Self::Error> {
        BalanceLimits::new(config.min_balance, config.max_balance)
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LoggingConfig {
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            directory: "logs".to_string(),
        }
    }
}
