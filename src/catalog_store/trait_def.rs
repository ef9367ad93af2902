//! CatalogStore trait definition.
//!
//! This trait abstracts the phrase bank database so the reconciler, the
//! browser facade and the CLI do not depend on the SQLite implementation
//! directly.

use super::models::{Group, Language, Phrase, PhraseWithGroup, SearchScope};
use anyhow::Result;
use std::path::Path;

/// Trait for phrase bank storage backends.
///
/// Catalog rows carry pointers to audio files on disk. Operations that drop a
/// pointer (deleting a phrase or group, replacing a phrase's audio) also
/// remove the file the pointer referenced, after the database change has been
/// committed. A file that cannot be removed is logged, never an error.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Group Operations
    // =========================================================================

    /// Create a group with a database-assigned id.
    fn create_group(&self, name: &str, description: &str) -> Result<Group>;

    /// Create a group under a caller-chosen id, used when mirroring numeric
    /// folders from the audio tree. Fails if the id is already taken.
    fn create_group_with_id(&self, id: i64, name: &str, description: &str) -> Result<Group>;

    /// Update a group's name and/or description. Fields passed as `None` are
    /// left untouched. Returns false if the group does not exist.
    fn update_group(&self, id: i64, name: Option<&str>, description: Option<&str>)
        -> Result<bool>;

    fn get_group(&self, id: i64) -> Result<Option<Group>>;

    /// All groups, ordered by id.
    fn list_groups(&self) -> Result<Vec<Group>>;

    /// Delete a group, its phrases and their audio files. Returns false if
    /// the group does not exist.
    fn delete_group(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Phrase Write Operations
    // =========================================================================

    /// Insert or update the phrase of (group, language) and return its id.
    ///
    /// When the phrase already exists its content is overwritten, and its
    /// audio pointer is overwritten only if `audio_path` is `Some`. Repeating
    /// a call with identical arguments changes nothing.
    fn upsert_phrase(
        &self,
        group_id: i64,
        language: Language,
        content: &str,
        audio_path: Option<&Path>,
    ) -> Result<i64>;

    /// Replace a phrase's content. Returns false if the phrase does not exist.
    fn update_phrase_content(&self, phrase_id: i64, content: &str) -> Result<bool>;

    /// Point a phrase at a new audio file, or clear the pointer with `None`.
    /// The previously referenced file, if different, is removed from disk
    /// after the commit. Returns false if the phrase does not exist.
    fn update_phrase_audio(&self, phrase_id: i64, audio_path: Option<&Path>) -> Result<bool>;

    /// Delete a phrase and its audio file. Returns false if the phrase does
    /// not exist.
    fn delete_phrase(&self, phrase_id: i64) -> Result<bool>;

    // =========================================================================
    // Phrase Retrieval
    // =========================================================================

    fn get_phrase(&self, phrase_id: i64) -> Result<Option<Phrase>>;

    /// The phrase of (group, language), if one exists.
    fn find_phrase(&self, group_id: i64, language: Language) -> Result<Option<Phrase>>;

    /// All phrases of a group, ordered by language code.
    fn phrases_of_group(&self, group_id: i64) -> Result<Vec<Phrase>>;

    /// All phrases with their group names, ordered by group name (ties by
    /// group id) then language. With `audio_only` set, phrases without an
    /// audio pointer are skipped.
    fn all_phrases(&self, audio_only: bool) -> Result<Vec<PhraseWithGroup>>;

    /// Case-insensitive substring search over phrase content and/or group
    /// names, ordered like `all_phrases`.
    fn search_phrases(&self, query: &str, scope: SearchScope) -> Result<Vec<PhraseWithGroup>>;

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Delete every phrase and group row. Audio files are left on disk; this
    /// exists for rebuilding the database from the audio tree.
    fn clear_all(&self) -> Result<()>;
}
