use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serenity::model::id::GuildId;
use tracing::info;

use crate::audio::AudioSession;

/// Per-guild audio sessions with explicit creation on join and teardown on
/// leave. A session exists exactly while the bot is in a voice channel.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<GuildId, Arc<AudioSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Default::default(),
        })
    }

    /// Creates a fresh session for the guild, closing any previous one
    pub fn create(&self, guild: GuildId) -> Arc<AudioSession> {
        let session = Arc::new(AudioSession::new());

        let previous = self
            .sessions
            .lock()
            .insert(guild, session.clone());

        if let Some(previous) = previous {
            previous.close();
        }

        info!(guild = guild.0, engine = session.engine_name(), "session created");
        session
    }

    pub fn session(&self, guild: GuildId) -> Option<Arc<AudioSession>> {
        self.sessions.lock().get(&guild).cloned()
    }

    /// Closes and removes the guild's session, if any
    pub fn teardown(&self, guild: GuildId) -> Option<Arc<AudioSession>> {
        let session = self.sessions.lock().remove(&guild)?;

        session.close();
        info!(guild = guild.0, "session torn down");
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_lookup() {
        let registry = SessionRegistry::new();
        let guild = GuildId(1);

        assert!(registry.session(guild).is_none());

        let session = registry.create(guild);
        assert!(Arc::ptr_eq(&registry.session(guild).unwrap(), &session));
    }

    #[test]
    fn recreate_closes_the_previous_session() {
        let registry = SessionRegistry::new();
        let guild = GuildId(1);

        let first = registry.create(guild);
        let second = registry.create(guild);

        assert!(first.is_closed());
        assert!(!second.is_closed());
    }

    #[test]
    fn stale_session_ignores_late_audio_after_recreate() {
        let registry = SessionRegistry::new();
        let guild = GuildId(1);

        let stale = registry.create(guild);
        registry.create(guild);

        // A receiver still holding the old session must neither buffer
        // nor trigger playback
        assert!(!stale.ingest(7, &vec![0i16; 1920]));
        assert_eq!(
            stale.playback().buffered_duration(),
            std::time::Duration::ZERO
        );
    }

    #[test]
    fn teardown_closes_and_removes() {
        let registry = SessionRegistry::new();
        let guild = GuildId(1);

        let session = registry.create(guild);
        let removed = registry.teardown(guild).unwrap();

        assert!(Arc::ptr_eq(&removed, &session));
        assert!(session.is_closed());
        assert!(registry.session(guild).is_none());
        assert!(registry.teardown(guild).is_none());
    }
}
