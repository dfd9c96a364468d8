use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvest_planner::api::{self, AppState};
use harvest_planner::config::{Config, StoreBackend};
use harvest_planner::persistence::{HistoryStore, MemoryStore, SqliteStore};
use harvest_planner::pipeline::Orchestrator;
use harvest_planner::reference::ReferenceData;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harvest_planner=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let reference = Arc::new(ReferenceData::load(config.reference_data_path.as_deref())?);

    let store: Arc<dyn HistoryStore> = match config.persistence.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.persistence.sqlite_path)?),
    };

    print_banner(&config, &reference);

    let state = AppState {
        orchestrator: Arc::new(Orchestrator::new(reference, config.pipeline.clone())),
        store,
    };

    info!("🚜 Harvest planner starting");
    api::run_server(state, &config.bind_address()).await
}

fn print_banner(config: &Config, reference: &ReferenceData) {
    println!("\n╔═══════════════════════════════════════════════════════════╗");
    println!("║        Market Price and Harvest Logistics Planner         ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🌐 Listening: {}", config.bind_address());
    println!(
        "📅 Decision Horizon: {} days (storage projected {} days)",
        config.pipeline.decision_horizon_days, config.pipeline.storage_projection_days
    );
    println!(
        "🚚 Max Destinations: {}",
        config.pipeline.max_logistics_destinations
    );
    println!(
        "⏱️  Simulated Market Latency: {} ms",
        config.pipeline.market_latency_ms
    );
    match config.pipeline.jitter_seed {
        Some(seed) => println!("🎲 Jitter: seeded ({})", seed),
        None => println!("🎲 Jitter: OS entropy"),
    }
    match config.persistence.backend {
        StoreBackend::Memory => println!("💾 History Store: in-memory"),
        StoreBackend::Sqlite => println!(
            "💾 History Store: SQLite ({})",
            config.persistence.sqlite_path
        ),
    }
    println!(
        "📚 Catalog: {} market quotes, {} storage profiles",
        reference.market_quotes.len(),
        reference.storage_profiles.len()
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!("═══════════════════════════════════════════════════════════");
    println!();
}
