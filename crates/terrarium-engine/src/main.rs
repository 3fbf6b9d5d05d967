//! World engine binary for the Terrarium simulation.
//!
//! This is the main entry point that wires together the scheduler, the
//! `PostgreSQL` store, the LLM backend, and the observer API. It loads
//! configuration, initializes all subsystems, and runs the world loop
//! until a stop is requested.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `terrarium-config.yaml`
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Seed a default population when the database is empty
//! 5. Build the text-generation backend (live or scripted)
//! 6. Assemble the scheduler and load all agents
//! 7. Start the observer API server
//! 8. Run the world loop until Ctrl-C or an API stop

mod error;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use terrarium_agents::MemoryConfig;
use terrarium_core::{Scheduler, WorldConfig};
use terrarium_db::{PgStore, PostgresPool};
use terrarium_llm::{ScriptedGenerator, TextGenerator};
use terrarium_observer::state::{AppState, ChannelFanout};
use terrarium_observer::{ServerConfig, start_server};
use terrarium_types::{AgentId, AgentSeed};

use crate::error::EngineError;

/// Default population seeded into an empty database.
const DEFAULT_AGENTS: [(&str, &str); 3] = [
    (
        "Nova",
        "Curious and optimistic. Loves asking questions and finds wonder in small things.",
    ),
    (
        "Rex",
        "Gruff and guarded, but fiercely loyal once trust is earned. Hates small talk.",
    ),
    (
        "Lyra",
        "A dreamy storyteller who drifts into long reflections and speaks in images.",
    ),
];

/// Application entry point for the world engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails. Once the world
/// loop is running, failures are handled inside the loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("terrarium-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        world_name = config.world.name,
        tick_interval_ms = config.world.tick_interval_ms,
        memory_limit = config.memory.limit,
        memory_keep = config.memory.keep,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL and migrate.
    let pool = PostgresPool::connect_url(&config.infrastructure.postgres_url)
        .await
        .map_err(EngineError::from)?;
    pool.run_migrations().await.map_err(EngineError::from)?;
    let store = PgStore::new(&pool);
    let history = Arc::new(store.clone());

    // 4. Seed a default population when the database is empty.
    if store.count_agents().await.map_err(EngineError::from)? == 0 {
        let seeds: Vec<AgentSeed> = DEFAULT_AGENTS
            .iter()
            .map(|(name, personality)| AgentSeed {
                id: AgentId::new(),
                name: (*name).to_owned(),
                personality: (*personality).to_owned(),
                mood_value: 0,
            })
            .collect();
        store.seed_agents(&seeds).await.map_err(EngineError::from)?;
    }

    // 5. Build the text-generation backend.
    let generator = if config.llm.api_key.is_empty() {
        warn!("No LLM api key configured, agents run on scripted fallbacks");
        TextGenerator::scripted(ScriptedGenerator::failing())
    } else {
        TextGenerator::openai(&config.llm.api_url, &config.llm.api_key, &config.llm.model)
    };

    // 6. Assemble the scheduler and load agents.
    let fanout = ChannelFanout::new();
    let updates_tx = fanout.sender();
    let scheduler = Scheduler::new(
        store,
        fanout,
        generator,
        MemoryConfig {
            limit: config.memory.limit,
            keep: config.memory.keep,
        },
        config.world.tick_interval_ms,
    )
    .map_err(EngineError::from)?;
    let agent_count = scheduler.load().await.map_err(EngineError::from)?;
    info!(agent_count, "World populated");

    // 7. Start the observer API server.
    let handle = scheduler.handle();
    let app_state = Arc::new(AppState::new(handle.clone(), updates_tx, history));
    let server_config = ServerConfig {
        port: config.infrastructure.observer_port,
        ..ServerConfig::default()
    };
    tokio::spawn(async move {
        if let Err(error) = start_server(&server_config, app_state).await {
            warn!(%error, "Observer server exited");
        }
    });

    // Ctrl-C requests a clean stop; the in-progress turn completes.
    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping world");
            signal_handle.request_stop();
        }
    });

    // 8. Run the world loop until stopped.
    scheduler.run().await;

    pool.close().await;
    info!("terrarium-engine shutdown complete");
    Ok(())
}

/// Load the world configuration from `terrarium-config.yaml`.
///
/// Looks for the config file relative to the current working
/// directory; defaults are used when the file is absent.
fn load_config() -> Result<WorldConfig, EngineError> {
    let config_path = Path::new("terrarium-config.yaml");
    if config_path.exists() {
        let config = WorldConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        // Parsing an empty document still applies env overrides.
        Ok(WorldConfig::parse("")?)
    }
}
