//! SQLite-backed phrase bank store.
//!
//! This module provides the `SqliteCatalogStore`, the single writer for the
//! phrase database. Audio files referenced by deleted or replaced rows are
//! removed from disk only after the corresponding transaction has committed.

use super::models::{Group, Language, Phrase, PhraseWithGroup, SearchScope};
use super::schema::PHRASEBANK_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Phrase columns joined with the owning group's name.
const PHRASE_WITH_GROUP_SELECT: &str = "SELECT p.id, p.group_id, p.language, p.content, \
     p.audio_path, p.created_at, g.name AS group_name \
     FROM phrases p JOIN groups g ON g.id = p.group_id";

/// SQLite implementation of CatalogStore.
#[derive(Debug)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Open a phrase database, creating it (and its parent directory) when
    /// missing, validating and migrating it when it already exists.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open phrase database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            // Fresh database - create with latest schema
            info!("Creating new phrase database at {:?}", path);
            PHRASEBANK_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        } else {
            // Existing database - check version and migrate if needed
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                anyhow::bail!(
                    "Phrase database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let current_schema_version =
                PHRASEBANK_VERSIONED_SCHEMAS.last().unwrap().version as i64;

            // Validate schema matches expected structure
            let version_index = PHRASEBANK_VERSIONED_SCHEMAS
                .iter()
                .position(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown phrase database version {}", db_version))?;
            PHRASEBANK_VERSIONED_SCHEMAS[version_index]
                .validate(&conn)
                .with_context(|| {
                    format!(
                        "Phrase database schema validation failed for version {}",
                        db_version
                    )
                })?;

            if db_version < current_schema_version {
                info!(
                    "Migrating phrase database from version {} to {}",
                    db_version, current_schema_version
                );
                Self::migrate_if_needed(&mut conn, db_version as usize)?;
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        PHRASEBANK_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut latest_from = from_version;
        for schema in PHRASEBANK_VERSIONED_SCHEMAS.iter().skip(from_version) {
            if schema.version > from_version {
                info!(
                    "Running phrase database migration from version {} to {}",
                    latest_from, schema.version
                );
                if let Some(migration_fn) = schema.migration {
                    migration_fn(&tx).with_context(|| {
                        format!("Failed to run migration to version {}", schema.version)
                    })?;
                }
                latest_from = schema.version;
            }
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_group(row: &rusqlite::Row) -> rusqlite::Result<Group> {
        Ok(Group {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_phrase(row: &rusqlite::Row) -> rusqlite::Result<Phrase> {
        let language_str: String = row.get("language")?;
        let language = Language::parse(&language_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown language code: {}", language_str).into(),
            )
        })?;
        let audio_path: Option<String> = row.get("audio_path")?;

        Ok(Phrase {
            id: row.get("id")?,
            group_id: row.get("group_id")?,
            language,
            content: row.get("content")?,
            audio_path: audio_path.filter(|s| !s.is_empty()).map(PathBuf::from),
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_phrase_with_group(row: &rusqlite::Row) -> rusqlite::Result<PhraseWithGroup> {
        Ok(PhraseWithGroup {
            phrase: Self::row_to_phrase(row)?,
            group_name: row.get("group_name")?,
        })
    }
}

fn path_to_db(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

/// Remove an audio file whose catalog pointer is gone. The row change is
/// already committed at this point, so failures are logged, not propagated.
fn remove_audio_file(path: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed audio file {}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Audio file {} already gone", path)
        }
        Err(e) => warn!("Failed to remove audio file {}: {}", path, e),
    }
}

fn collect_group_audio_paths(tx: &Transaction, group_id: i64) -> Result<Vec<String>> {
    let mut stmt = tx.prepare(
        "SELECT audio_path FROM phrases \
         WHERE group_id = ?1 AND audio_path IS NOT NULL AND audio_path != ''",
    )?;
    let paths = stmt
        .query_map(params![group_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(paths)
}

impl CatalogStore for SqliteCatalogStore {
    // =========================================================================
    // Group Operations
    // =========================================================================

    fn create_group(&self, name: &str, description: &str) -> Result<Group> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO groups (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        let id = conn.last_insert_rowid();
        let group = conn.query_row(
            "SELECT id, name, description, created_at FROM groups WHERE id = ?1",
            params![id],
            Self::row_to_group,
        )?;
        Ok(group)
    }

    fn create_group_with_id(&self, id: i64, name: &str, description: &str) -> Result<Group> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO groups (id, name, description) VALUES (?1, ?2, ?3)",
            params![id, name, description],
        )
        .with_context(|| format!("Failed to create group with id {}", id))?;
        let group = conn.query_row(
            "SELECT id, name, description, created_at FROM groups WHERE id = ?1",
            params![id],
            Self::row_to_group,
        )?;
        Ok(group)
    }

    fn update_group(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE groups SET name = COALESCE(?2, name), \
             description = COALESCE(?3, description) WHERE id = ?1",
            params![id, name, description],
        )?;
        Ok(changed > 0)
    }

    fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT id, name, description, created_at FROM groups WHERE id = ?1",
                params![id],
                Self::row_to_group,
            )
            .optional()?;
        Ok(result)
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, description, created_at FROM groups ORDER BY id ASC")?;
        let groups = stmt
            .query_map([], Self::row_to_group)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    fn delete_group(&self, id: i64) -> Result<bool> {
        let audio_paths = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            let paths = collect_group_audio_paths(&tx, id)?;
            // Phrase rows go with the group via ON DELETE CASCADE
            let deleted = tx.execute("DELETE FROM groups WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Ok(false);
            }
            tx.commit()?;
            paths
        };

        for path in &audio_paths {
            remove_audio_file(path);
        }
        info!(
            "Deleted group {} and {} of its audio files",
            id,
            audio_paths.len()
        );
        Ok(true)
    }

    // =========================================================================
    // Phrase Write Operations
    // =========================================================================

    fn upsert_phrase(
        &self,
        group_id: i64,
        language: Language,
        content: &str,
        audio_path: Option<&Path>,
    ) -> Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM phrases WHERE group_id = ?1 AND language = ?2",
                params![group_id, language.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                // An existing audio pointer survives an upsert without one
                match path_to_db(audio_path) {
                    Some(path) => tx.execute(
                        "UPDATE phrases SET content = ?2, audio_path = ?3 WHERE id = ?1",
                        params![id, content, path],
                    )?,
                    None => tx.execute(
                        "UPDATE phrases SET content = ?2 WHERE id = ?1",
                        params![id, content],
                    )?,
                };
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO phrases (group_id, language, content, audio_path) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![group_id, language.as_str(), content, path_to_db(audio_path)],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    fn update_phrase_content(&self, phrase_id: i64, content: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE phrases SET content = ?2 WHERE id = ?1",
            params![phrase_id, content],
        )?;
        Ok(changed > 0)
    }

    fn update_phrase_audio(&self, phrase_id: i64, audio_path: Option<&Path>) -> Result<bool> {
        let new_path = path_to_db(audio_path);
        let old_path = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let old: Option<Option<String>> = tx
                .query_row(
                    "SELECT audio_path FROM phrases WHERE id = ?1",
                    params![phrase_id],
                    |row| row.get(0),
                )
                .optional()?;
            let old = match old {
                Some(value) => value,
                None => return Ok(false),
            };

            tx.execute(
                "UPDATE phrases SET audio_path = ?2 WHERE id = ?1",
                params![phrase_id, new_path],
            )?;
            tx.commit()?;
            old
        };

        if let Some(old) = old_path {
            if !old.is_empty() && Some(old.as_str()) != new_path.as_deref() {
                remove_audio_file(&old);
            }
        }
        Ok(true)
    }

    fn delete_phrase(&self, phrase_id: i64) -> Result<bool> {
        let old_path = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let old: Option<Option<String>> = tx
                .query_row(
                    "SELECT audio_path FROM phrases WHERE id = ?1",
                    params![phrase_id],
                    |row| row.get(0),
                )
                .optional()?;
            let old = match old {
                Some(value) => value,
                None => return Ok(false),
            };

            tx.execute("DELETE FROM phrases WHERE id = ?1", params![phrase_id])?;
            tx.commit()?;
            old
        };

        if let Some(path) = old_path {
            if !path.is_empty() {
                remove_audio_file(&path);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Phrase Retrieval
    // =========================================================================

    fn get_phrase(&self, phrase_id: i64) -> Result<Option<Phrase>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT id, group_id, language, content, audio_path, created_at \
                 FROM phrases WHERE id = ?1",
                params![phrase_id],
                Self::row_to_phrase,
            )
            .optional()?;
        Ok(result)
    }

    fn find_phrase(&self, group_id: i64, language: Language) -> Result<Option<Phrase>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT id, group_id, language, content, audio_path, created_at \
                 FROM phrases WHERE group_id = ?1 AND language = ?2",
                params![group_id, language.as_str()],
                Self::row_to_phrase,
            )
            .optional()?;
        Ok(result)
    }

    fn phrases_of_group(&self, group_id: i64) -> Result<Vec<Phrase>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, group_id, language, content, audio_path, created_at \
             FROM phrases WHERE group_id = ?1 ORDER BY language ASC",
        )?;
        let phrases = stmt
            .query_map(params![group_id], Self::row_to_phrase)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(phrases)
    }

    fn all_phrases(&self, audio_only: bool) -> Result<Vec<PhraseWithGroup>> {
        let conn = self.conn.lock().unwrap();
        let sql = if audio_only {
            format!(
                "{} WHERE p.audio_path IS NOT NULL AND p.audio_path != '' \
                 ORDER BY g.name ASC, p.group_id ASC, p.language ASC",
                PHRASE_WITH_GROUP_SELECT
            )
        } else {
            format!(
                "{} ORDER BY g.name ASC, p.group_id ASC, p.language ASC",
                PHRASE_WITH_GROUP_SELECT
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let phrases = stmt
            .query_map([], Self::row_to_phrase_with_group)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(phrases)
    }

    fn search_phrases(&self, query: &str, scope: SearchScope) -> Result<Vec<PhraseWithGroup>> {
        let conn = self.conn.lock().unwrap();
        let where_clause = match scope {
            SearchScope::Content => "p.content LIKE ?1",
            SearchScope::GroupName => "g.name LIKE ?1",
            SearchScope::All => "(p.content LIKE ?1 OR g.name LIKE ?1)",
        };
        let sql = format!(
            "{} WHERE {} ORDER BY g.name ASC, p.group_id ASC, p.language ASC",
            PHRASE_WITH_GROUP_SELECT, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let phrases = stmt
            .query_map(params![format!("%{}%", query)], Self::row_to_phrase_with_group)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(phrases)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let phrases = tx.execute("DELETE FROM phrases", [])?;
        let groups = tx.execute("DELETE FROM groups", [])?;
        tx.commit()?;
        info!(
            "Cleared phrase database: {} phrases, {} groups",
            phrases, groups
        );
        Ok(())
    }
}
