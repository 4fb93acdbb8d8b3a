//! gm-engine - deterministic turn resolution for LLM-narrated sessions
//!
//! The binary wires the Ollama adapter and in-memory repositories into the
//! turn service and runs a short scripted session against them.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gm_engine::application::services::{ProtocolRouter, TurnConfig, TurnService};
use gm_engine::domain::entities::{GameSession, PlayerCharacter};
use gm_engine::infrastructure::config::AppConfig;
use gm_engine::infrastructure::ollama::OllamaClient;
use gm_engine::infrastructure::persistence::{
    InMemoryMemoryRepository, InMemoryNarrativeRepository, InMemoryProjectRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gm_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gm-engine");

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Ollama: {}", config.ollama_base_url);
    tracing::info!("  Model: {}", config.ollama_model);
    tracing::info!("  Dev mode: {}", config.dev_mode_enabled);

    let llm = Arc::new(OllamaClient::new(
        &config.ollama_base_url,
        &config.ollama_model,
        config.ollama_timeout_secs,
    )?);
    let service = TurnService::new(
        llm,
        Arc::new(InMemoryNarrativeRepository::new()),
        Arc::new(InMemoryProjectRepository::new()),
        Arc::new(InMemoryMemoryRepository::new()),
        ProtocolRouter::default(),
        TurnConfig {
            compaction_threshold: config.compaction_threshold,
        },
    );

    let mut session = GameSession::new(rand::random())
        .with_location("Rust Belt Station")
        .with_dev_mode(config.dev_mode_enabled);
    let mut character = PlayerCharacter::new("Vex")
        .with_skill(2)
        .with_attr(1)
        .with_dex(3);

    for player_text in [
        "I step off the tram and take in the station.",
        "I search the maintenance shaft for anything useful.",
        "I attack the nearest threat.",
    ] {
        character.resources.refresh();
        tracing::info!(player_text, "resolving turn");
        let result = service
            .execute_turn(&mut session, &mut character, player_text, None, None)
            .await?;
        println!("> {player_text}");
        println!("{}", result.narration);
        if let Some(question) = &result.clarification_question {
            println!("[clarify] {question}");
        }
        println!();
    }

    tracing::info!(
        turns = session.turn_log.len(),
        roll_index = session.roll_index,
        "session complete"
    );
    Ok(())
}
