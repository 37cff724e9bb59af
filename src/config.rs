use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which `RoomStore` backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Document,
}

impl FromStr for StoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mock" => Ok(StoreKind::Memory),
            "document" | "mongo" => Ok(StoreKind::Document),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => write!(f, "invalid value for {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub seed_file: Option<PathBuf>,
    /// Rooms per search; the results page shows 20.
    pub result_limit: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::Memory,
            data_dir: PathBuf::from("./data"),
            seed_file: None,
            result_limit: 20,
            compact_threshold: 1000,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Unset or blank keys keep their defaults;
    /// set but unparseable values are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("ROOMFINDER_STORE") {
            config.store = parse_value("ROOMFINDER_STORE", v)?;
        }
        if let Some(v) = get("ROOMFINDER_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        config.seed_file = get("ROOMFINDER_SEED_FILE").map(PathBuf::from);
        if let Some(v) = get("ROOMFINDER_RESULT_LIMIT") {
            config.result_limit = parse_value("ROOMFINDER_RESULT_LIMIT", v)?;
        }
        if let Some(v) = get("ROOMFINDER_COMPACT_THRESHOLD") {
            config.compact_threshold = parse_value("ROOMFINDER_COMPACT_THRESHOLD", v)?;
        }
        if let Some(v) = get("ROOMFINDER_METRICS_PORT") {
            config.metrics_port = Some(parse_value("ROOMFINDER_METRICS_PORT", v)?);
        }
        Ok(config)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("rooms.log")
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
