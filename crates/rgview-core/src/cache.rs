//! Bounded, recency-ordered cache of search sessions.

use crate::session::Session;
use crate::{Result, RgviewError};
use rgview_types::{SearchSettings, SessionKey, SessionSummary};
use std::path::PathBuf;
use tracing::{debug, info};

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct SessionCacheConfig {
    /// Search tool executable.
    pub program: PathBuf,
    /// Maximum retained sessions. `None` disables eviction.
    pub capacity: Option<usize>,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rg"),
            capacity: Some(8),
        }
    }
}

/// Sessions keyed by (term, directory), most-recently-used first.
pub struct SessionCache {
    config: SessionCacheConfig,
    sessions: Vec<Session>,
}

impl SessionCache {
    pub fn new(config: SessionCacheConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
        }
    }

    /// Fetch or create the session for a key.
    ///
    /// An existing session moves to the front and is reset in place (never
    /// duplicated). A new session evicts from the back first if it would
    /// exceed capacity, then is inserted at the front.
    pub async fn get_or_create(
        &mut self,
        key: SessionKey,
        settings: SearchSettings,
        deferred: bool,
    ) -> Result<&mut Session> {
        if let Some(pos) = self.sessions.iter().position(|s| *s.key() == key) {
            debug!(target: "rgview::cache", "reusing session for '{}'", key.term);
            let mut session = self.sessions.remove(pos);
            session.reset_in_place().await;
            session.settings = settings;
            self.sessions.insert(0, session);
            let session = &mut self.sessions[0];
            if deferred {
                // The old preview reflects the replaced settings.
                session.reconfigure()?;
            } else {
                session.start()?;
            }
            return Ok(session);
        }

        if let Some(capacity) = self.config.capacity {
            while self.sessions.len() >= capacity.max(1) {
                match self.sessions.pop() {
                    Some(mut evicted) => {
                        info!(
                            target: "rgview::cache",
                            "evicting session for '{}'",
                            evicted.key().term
                        );
                        evicted.shutdown().await;
                    }
                    None => break,
                }
            }
        }

        let session = Session::create(key, settings, self.config.program.clone(), deferred)?;
        self.sessions.insert(0, session);
        Ok(&mut self.sessions[0])
    }

    /// The session for a key, if cached. Does not affect recency.
    pub fn get(&mut self, key: &SessionKey) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.key() == key)
    }

    /// Summaries in recency order, most-recently-used first.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(Session::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove one session outright, terminating its process.
    pub async fn remove(&mut self, key: &SessionKey) -> Result<()> {
        let pos = self
            .sessions
            .iter()
            .position(|s| s.key() == key)
            .ok_or_else(|| {
                RgviewError::InvalidConfiguration(format!("no session for '{}'", key.term))
            })?;
        let mut session = self.sessions.remove(pos);
        session.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: Option<usize>) -> SessionCacheConfig {
        SessionCacheConfig {
            program: PathBuf::from("rg"),
            capacity,
        }
    }

    fn key(term: &str) -> SessionKey {
        SessionKey::new(term, "/tmp")
    }

    #[tokio::test]
    async fn eviction_drops_least_recently_used() {
        let mut cache = SessionCache::new(config(Some(2)));
        for term in ["a", "b", "c"] {
            cache
                .get_or_create(key(term), SearchSettings::default(), true)
                .await
                .unwrap();
        }
        let terms: Vec<String> = cache
            .summaries()
            .iter()
            .map(|s| s.key.term.clone())
            .collect();
        assert_eq!(terms, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn reuse_moves_to_front_without_duplicating() {
        let mut cache = SessionCache::new(config(Some(4)));
        cache
            .get_or_create(key("a"), SearchSettings::default(), true)
            .await
            .unwrap();
        cache
            .get_or_create(key("b"), SearchSettings::default(), true)
            .await
            .unwrap();
        cache
            .get_or_create(key("a"), SearchSettings::default(), true)
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.summaries()[0].key.term, "a");
    }

    #[tokio::test]
    async fn deferred_reuse_recomputes_preview_from_new_settings() {
        use rgview_types::{SearchKind, SessionState};

        let mut cache = SessionCache::new(config(Some(4)));
        cache
            .get_or_create(key("a"), SearchSettings::default(), true)
            .await
            .unwrap();
        let literal = SearchSettings {
            kind: SearchKind::Literal,
            ..Default::default()
        };
        let session = cache.get_or_create(key("a"), literal, true).await.unwrap();
        assert_eq!(session.state(), SessionState::Configuring);
        assert!(
            session
                .invocation()
                .unwrap()
                .args
                .contains(&"--fixed-strings".to_string())
        );
    }

    #[tokio::test]
    async fn unbounded_capacity_never_evicts() {
        let mut cache = SessionCache::new(config(None));
        for i in 0..32 {
            cache
                .get_or_create(key(&format!("t{i}")), SearchSettings::default(), true)
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 32);
    }

    #[tokio::test]
    async fn distinct_directories_are_distinct_sessions() {
        let mut cache = SessionCache::new(config(None));
        cache
            .get_or_create(
                SessionKey::new("a", "/tmp/x"),
                SearchSettings::default(),
                true,
            )
            .await
            .unwrap();
        cache
            .get_or_create(
                SessionKey::new("a", "/tmp/y"),
                SearchSettings::default(),
                true,
            )
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
