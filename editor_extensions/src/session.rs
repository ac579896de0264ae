//! Several compositions kept side by side, one per document.

use crate::compose::{compose_with, ComposeOptions, Composition};
use crate::config::Overrides;
use crate::error::Result;
use crate::extension::Extension;
use std::collections::BTreeMap;

/// Owns one composition per document id.
///
/// Removing a session, clearing the store or dropping it disposes the
/// affected compositions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: BTreeMap<String, Composition>,
    options: ComposeOptions,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose compositions all use `options`.
    pub fn with_options(options: ComposeOptions) -> Self {
        Self {
            sessions: BTreeMap::new(),
            options,
        }
    }

    /// Composes a new session for `id`. An existing session with the same id
    /// is disposed first. On error the store is left without a session for
    /// `id`.
    pub fn create(
        &mut self,
        id: impl Into<String>,
        extensions: &[Extension],
        overrides: Overrides,
    ) -> Result<&Composition> {
        let id = id.into();
        if let Some(mut previous) = self.sessions.remove(&id) {
            log::warn!("replacing existing session `{}`", id);
            let _ = previous.dispose();
        }
        let composition = compose_with(extensions, overrides, self.options.clone())?;
        log::debug!("created session `{}`", id);
        Ok(self.sessions.entry(id).or_insert(composition))
    }

    pub fn get(&self, id: &str) -> Option<&Composition> {
        self.sessions.get(id)
    }

    /// Disposes and forgets the session for `id`. Returns false if there was
    /// none.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some(mut composition) => {
                log::debug!("removing session `{}`", id);
                let _ = composition.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes every session.
    pub fn clear(&mut self) {
        for (id, mut composition) in std::mem::take(&mut self.sessions) {
            log::debug!("removing session `{}`", id);
            let _ = composition.dispose();
        }
    }

    /// Session ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
