//! Test fixture creation for the phrase database and audio tree
//!
//! Every fixture is backed by its own temp directory, so tests are fully
//! isolated and all files disappear when the fixture is dropped.

use filetime::FileTime;
use phrasebank::browse::CatalogBrowser;
use phrasebank::catalog_store::{CatalogStore, Language, SqliteCatalogStore};
use phrasebank::reconciler::Reconciler;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway phrase bank: one SQLite file and one audio tree.
pub struct PhrasebankFixture {
    /// Store backed by a database file under the temp directory
    pub store: Arc<dyn CatalogStore>,

    /// Root of the audio tree, laid out as {group_id}/{language}/
    pub audio_root: PathBuf,

    /// Path of the SQLite database file, for reopen tests
    pub db_path: PathBuf,

    // Keep the temp directory alive until drop
    _dir: TempDir,
}

impl PhrasebankFixture {
    /// Creates a fresh phrase bank in a temp directory.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory or the database cannot be created.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let audio_root = dir.path().join("audio_files");
        fs::create_dir_all(&audio_root).expect("create audio root");
        let db_path = dir.path().join("phrasebank.db");
        let store: Arc<dyn CatalogStore> =
            Arc::new(SqliteCatalogStore::open(&db_path).expect("open phrase database"));
        PhrasebankFixture {
            store,
            audio_root,
            db_path,
            _dir: dir,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone(), self.audio_root.clone())
    }

    pub fn browser(&self) -> CatalogBrowser {
        CatalogBrowser::new(self.store.clone())
    }

    /// Writes an audio file at {group_id}/{language}/{file_name} with the
    /// given modification time and returns its path.
    pub fn write_audio(
        &self,
        group_id: i64,
        language: Language,
        file_name: &str,
        mtime_secs: i64,
    ) -> PathBuf {
        let dir = self.language_dir(group_id, language);
        fs::create_dir_all(&dir).expect("create language dir");
        let path = dir.join(file_name);
        fs::write(&path, b"RIFF").expect("write audio file");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0))
            .expect("set audio mtime");
        path
    }

    /// Creates an empty language folder.
    pub fn make_language_dir(&self, group_id: i64, language: Language) -> PathBuf {
        let dir = self.language_dir(group_id, language);
        fs::create_dir_all(&dir).expect("create language dir");
        dir
    }

    /// Creates a bare numeric group folder.
    pub fn make_group_dir(&self, group_id: i64) -> PathBuf {
        let dir = self.audio_root.join(group_id.to_string());
        fs::create_dir_all(&dir).expect("create group dir");
        dir
    }

    fn language_dir(&self, group_id: i64, language: Language) -> PathBuf {
        self.audio_root
            .join(group_id.to_string())
            .join(language.as_str())
    }
}
