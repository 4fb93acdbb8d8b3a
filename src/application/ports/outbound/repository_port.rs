//! Repository ports - interfaces for session-scoped persistence
//!
//! Application services depend on these traits, not concrete stores.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::{
    Clock, Discovery, MemoryCard, NarrativeThread, PlayerProfile, Project, Ruling, SystemDraft,
};
use crate::domain::value_objects::SessionId;

/// Threads, clocks, and discoveries tied to a session.
#[async_trait]
pub trait NarrativeRepositoryPort: Send + Sync {
    async fn create_thread(&self, session_id: SessionId, thread: &NarrativeThread) -> Result<()>;

    async fn list_threads(&self, session_id: SessionId) -> Result<Vec<NarrativeThread>>;

    async fn create_clock(&self, session_id: SessionId, clock: &Clock) -> Result<()>;

    async fn list_clocks(&self, session_id: SessionId) -> Result<Vec<Clock>>;

    /// Persist an updated clock after escalation.
    async fn update_clock(&self, session_id: SessionId, clock: &Clock) -> Result<()>;

    async fn create_discovery(&self, session_id: SessionId, discovery: &Discovery) -> Result<()>;

    async fn list_discoveries(&self, session_id: SessionId) -> Result<Vec<Discovery>>;
}

/// Projects, system drafts, and rulings.
#[async_trait]
pub trait ProjectRepositoryPort: Send + Sync {
    async fn create_project(&self, session_id: SessionId, project: &Project) -> Result<()>;

    async fn list_projects(&self, session_id: SessionId) -> Result<Vec<Project>>;

    async fn create_system_draft(&self, session_id: SessionId, draft: &SystemDraft) -> Result<()>;

    async fn create_ruling(&self, session_id: SessionId, ruling: &Ruling) -> Result<()>;

    async fn list_rulings(&self, session_id: SessionId) -> Result<Vec<Ruling>>;
}

/// Player profiles and durable memory cards.
#[async_trait]
pub trait MemoryRepositoryPort: Send + Sync {
    async fn get_profile(&self, session_id: SessionId) -> Result<Option<PlayerProfile>>;

    async fn save_profile(&self, session_id: SessionId, profile: &PlayerProfile) -> Result<()>;

    /// Insert or update a card keyed by (entity_type, name).
    async fn upsert_memory_card(&self, session_id: SessionId, card: &MemoryCard) -> Result<()>;

    async fn list_memory_cards(&self, session_id: SessionId) -> Result<Vec<MemoryCard>>;
}
