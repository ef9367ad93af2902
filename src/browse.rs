//! Read-oriented facade over the catalog store, for presentation code.
//!
//! Everything here is a pure read. Reconciliation and mutation go through
//! `CatalogStore` and `Reconciler` directly.

use crate::catalog_store::{CatalogStore, Group, Phrase, PhraseWithGroup, SearchScope};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct CatalogBrowser {
    store: Arc<dyn CatalogStore>,
}

impl CatalogBrowser {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// All groups, sorted by display name for browsing. Ties fall back to id
    /// so the order is stable.
    pub fn groups_by_name(&self) -> Result<Vec<Group>> {
        let mut groups = self.store.list_groups()?;
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    pub fn group(&self, id: i64) -> Result<Option<Group>> {
        self.store.get_group(id)
    }

    pub fn phrase(&self, id: i64) -> Result<Option<Phrase>> {
        self.store.get_phrase(id)
    }

    /// Phrases of one group, sorted by language code.
    pub fn phrases_of_group(&self, group_id: i64) -> Result<Vec<Phrase>> {
        self.store.phrases_of_group(group_id)
    }

    /// Every phrase with its group name, optionally only those with an audio
    /// pointer.
    pub fn all_phrases(&self, audio_only: bool) -> Result<Vec<PhraseWithGroup>> {
        self.store.all_phrases(audio_only)
    }

    /// Substring search over phrase content and/or group names.
    pub fn search(&self, query: &str, scope: SearchScope) -> Result<Vec<PhraseWithGroup>> {
        self.store.search_phrases(query, scope)
    }

    /// Audio path of a phrase, but only when the file exists on disk. A
    /// pointer to a vanished file reads as "no audio".
    pub fn playable_audio(&self, phrase_id: i64) -> Result<Option<PathBuf>> {
        let phrase = match self.store.get_phrase(phrase_id)? {
            Some(phrase) => phrase,
            None => return Ok(None),
        };
        match phrase.playable_audio() {
            Some(path) => Ok(Some(path.to_path_buf())),
            None => {
                if let Some(path) = &phrase.audio_path {
                    debug!("Phrase {} points at missing audio {:?}", phrase_id, path);
                }
                Ok(None)
            }
        }
    }
}
