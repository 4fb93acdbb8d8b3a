//! In-memory persistence adapters
//!
//! Backing stores are per-session maps behind async RwLocks. Callers that
//! need durability can swap these for a database-backed adapter without
//! touching the application layer.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::outbound::{
    MemoryRepositoryPort, NarrativeRepositoryPort, ProjectRepositoryPort,
};
use crate::domain::entities::{
    Clock, Discovery, MemoryCard, NarrativeThread, PlayerProfile, Project, Ruling, SystemDraft,
};
use crate::domain::value_objects::SessionId;

#[derive(Default)]
struct NarrativeStore {
    threads: Vec<NarrativeThread>,
    clocks: Vec<Clock>,
    discoveries: Vec<Discovery>,
}

/// Narrative threads, clocks, and discoveries held in memory.
#[derive(Default)]
pub struct InMemoryNarrativeRepository {
    sessions: RwLock<HashMap<SessionId, NarrativeStore>>,
}

impl InMemoryNarrativeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NarrativeRepositoryPort for InMemoryNarrativeRepository {
    async fn create_thread(&self, session_id: SessionId, thread: &NarrativeThread) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .threads
            .push(thread.clone());
        Ok(())
    }

    async fn list_threads(&self, session_id: SessionId) -> Result<Vec<NarrativeThread>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.threads.clone())
            .unwrap_or_default())
    }

    async fn create_clock(&self, session_id: SessionId, clock: &Clock) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .clocks
            .push(clock.clone());
        Ok(())
    }

    async fn list_clocks(&self, session_id: SessionId) -> Result<Vec<Clock>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.clocks.clone())
            .unwrap_or_default())
    }

    async fn update_clock(&self, session_id: SessionId, clock: &Clock) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let store = sessions.entry(session_id).or_default();
        match store.clocks.iter_mut().find(|c| c.id == clock.id) {
            Some(existing) => *existing = clock.clone(),
            None => store.clocks.push(clock.clone()),
        }
        Ok(())
    }

    async fn create_discovery(&self, session_id: SessionId, discovery: &Discovery) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .discoveries
            .push(discovery.clone());
        Ok(())
    }

    async fn list_discoveries(&self, session_id: SessionId) -> Result<Vec<Discovery>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.discoveries.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct ProjectStore {
    projects: Vec<Project>,
    drafts: Vec<SystemDraft>,
    rulings: Vec<Ruling>,
}

/// Projects, system drafts, and rulings held in memory.
#[derive(Default)]
pub struct InMemoryProjectRepository {
    sessions: RwLock<HashMap<SessionId, ProjectStore>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepositoryPort for InMemoryProjectRepository {
    async fn create_project(&self, session_id: SessionId, project: &Project) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .projects
            .push(project.clone());
        Ok(())
    }

    async fn list_projects(&self, session_id: SessionId) -> Result<Vec<Project>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.projects.clone())
            .unwrap_or_default())
    }

    async fn create_system_draft(&self, session_id: SessionId, draft: &SystemDraft) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .drafts
            .push(draft.clone());
        Ok(())
    }

    async fn create_ruling(&self, session_id: SessionId, ruling: &Ruling) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .rulings
            .push(ruling.clone());
        Ok(())
    }

    async fn list_rulings(&self, session_id: SessionId) -> Result<Vec<Ruling>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.rulings.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct MemoryStore {
    profile: Option<PlayerProfile>,
    cards: Vec<MemoryCard>,
}

/// Player profiles and memory cards held in memory. Cards are keyed by
/// (entity_type, name) so a compaction pass updates in place.
#[derive(Default)]
pub struct InMemoryMemoryRepository {
    sessions: RwLock<HashMap<SessionId, MemoryStore>>,
}

impl InMemoryMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryRepositoryPort for InMemoryMemoryRepository {
    async fn get_profile(&self, session_id: SessionId) -> Result<Option<PlayerProfile>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .and_then(|store| store.profile.clone()))
    }

    async fn save_profile(&self, session_id: SessionId, profile: &PlayerProfile) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id).or_default().profile = Some(profile.clone());
        Ok(())
    }

    async fn upsert_memory_card(&self, session_id: SessionId, card: &MemoryCard) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let store = sessions.entry(session_id).or_default();
        match store
            .cards
            .iter_mut()
            .find(|c| c.entity_type == card.entity_type && c.name == card.name)
        {
            Some(existing) => *existing = card.clone(),
            None => store.cards.push(card.clone()),
        }
        Ok(())
    }

    async fn list_memory_cards(&self, session_id: SessionId) -> Result<Vec<MemoryCard>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .map(|store| store.cards.clone())
            .unwrap_or_default())
    }
}
