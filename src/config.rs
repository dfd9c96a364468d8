use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub persistence: PersistenceConfig,
    pub reference_data_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Days ahead the planner looks when deciding whether to store.
    pub decision_horizon_days: u32,
    pub storage_projection_days: u32,
    pub max_logistics_destinations: usize,
    pub market_latency_ms: u64,
    pub jitter_seed: Option<u64>,
}

impl PipelineConfig {
    pub fn market_latency(&self) -> Duration {
        Duration::from_millis(self.market_latency_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decision_horizon_days: 7,
            storage_projection_days: 30,
            max_logistics_destinations: 3,
            market_latency_ms: 500,
            jitter_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => anyhow::bail!("unknown STORE_BACKEND '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    pub backend: StoreBackend,
    pub sqlite_path: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or_warn(key, env::var(key).ok()).unwrap_or(default)
}

/// A set-but-malformed value is logged and treated as unset.
fn parse_or_warn<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("⚠️ Ignoring unparsable {}={:?}, using default", key, raw);
            None
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env::var("PLANNER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PLANNER_PORT", 8000),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            decision_horizon_days: env_or("DECISION_HORIZON_DAYS", defaults.decision_horizon_days),
            storage_projection_days: env_or(
                "STORAGE_PROJECTION_DAYS",
                defaults.storage_projection_days,
            ),
            max_logistics_destinations: env_or(
                "MAX_LOGISTICS_DESTINATIONS",
                defaults.max_logistics_destinations,
            ),
            market_latency_ms: env_or("MARKET_LATENCY_MS", defaults.market_latency_ms),
            jitter_seed: parse_or_warn("JITTER_SEED", env::var("JITTER_SEED").ok()),
        };

        // Unknown backends are rejected, never defaulted.
        let backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Memory,
        };
        let persistence = PersistenceConfig {
            backend,
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "farm_context.db".to_string()),
        };

        let config = Config {
            server,
            pipeline,
            persistence,
            reference_data_path: env::var("REFERENCE_DATA_PATH").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.pipeline;
        if p.storage_projection_days < p.decision_horizon_days {
            anyhow::bail!(
                "STORAGE_PROJECTION_DAYS ({}) must cover DECISION_HORIZON_DAYS ({})",
                p.storage_projection_days,
                p.decision_horizon_days
            );
        }
        if p.max_logistics_destinations == 0 {
            anyhow::bail!("MAX_LOGISTICS_DESTINATIONS must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
