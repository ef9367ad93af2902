//! Reconciliation between the audio tree and the phrase database.
//!
//! The reconciler runs the scanner for a pure snapshot of the tree, then
//! applies catalog mutations in a second phase. The database is the source of
//! truth for phrase content; the filesystem is the source of truth for which
//! audio exists. Scans therefore may repoint audio and fill gaps, but never
//! touch content of existing phrases and never remove files.

use crate::asset_scan::scan_audio_tree;
use crate::catalog_store::{CatalogStore, Group, Language};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters reported by `scan_and_update`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ScanStats {
    /// Slots for which an audio file was selected on disk.
    pub scanned: usize,
    /// Phrases inserted, with or without audio.
    pub added: usize,
    /// Phrases whose audio pointer moved to a different file.
    pub updated: usize,
}

/// Counters reported by `reinitialize_from_filesystem`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReinitStats {
    /// Groups recreated from numeric folders.
    pub groups: usize,
    /// Stats of the scan that attached discovered audio.
    pub scan: ScanStats,
}

/// Keeps the phrase database consistent with the audio tree under one root.
pub struct Reconciler {
    store: Arc<dyn CatalogStore>,
    audio_root: PathBuf,
}

impl Reconciler {
    pub fn new(store: Arc<dyn CatalogStore>, audio_root: PathBuf) -> Self {
        Self { store, audio_root }
    }

    pub fn audio_root(&self) -> &Path {
        &self.audio_root
    }

    fn language_dir(&self, group_id: i64, language: Language) -> PathBuf {
        self.audio_root
            .join(group_id.to_string())
            .join(language.as_str())
    }

    /// Fetch a group's name, creating the group from the folder-name template
    /// when the row does not exist yet.
    fn ensure_group_row(&self, group_id: i64) -> Result<String> {
        if let Some(group) = self.store.get_group(group_id)? {
            return Ok(group.name);
        }
        let name = Group::auto_name(group_id);
        self.store.create_group_with_id(
            group_id,
            &name,
            &Group::auto_description(group_id),
        )?;
        info!("Created group '{}' for folder {}", name, group_id);
        Ok(name)
    }

    /// Create a group for every numeric folder the database does not know
    /// yet. Existing groups are left untouched. Returns the number of groups
    /// created.
    pub fn sync_groups_from_folders(&self) -> Result<usize> {
        let tree = scan_audio_tree(&self.audio_root)?;

        let mut created = 0;
        for group_dir in &tree.groups {
            if self.store.get_group(group_dir.group_id)?.is_none() {
                self.ensure_group_row(group_dir.group_id)?;
                created += 1;
            }
        }
        if created > 0 {
            info!("Folder sync created {} groups", created);
        }
        Ok(created)
    }

    /// Reconcile phrases with the audio found on disk.
    ///
    /// Per slot of the scanned tree: discovered audio is attached to the
    /// existing phrase (content untouched) or a new phrase with template
    /// content is inserted; a slot with neither audio nor phrase gets a
    /// placeholder phrase, so every known (group, language) pair is
    /// queryable. Safe to run on every start and repeatedly thereafter.
    pub fn scan_and_update(&self) -> Result<ScanStats> {
        let tree = scan_audio_tree(&self.audio_root)?;
        let mut stats = ScanStats {
            scanned: tree.selected_files(),
            ..Default::default()
        };

        for group_dir in &tree.groups {
            let group_name = self.ensure_group_row(group_dir.group_id)?;
            for slot in &group_dir.slots {
                let existing = self.store.find_phrase(group_dir.group_id, slot.language)?;
                match (&slot.audio, existing) {
                    (Some(selected), Some(phrase)) => {
                        if phrase.audio_path.as_deref() != Some(selected.path.as_path()) {
                            self.store.upsert_phrase(
                                group_dir.group_id,
                                slot.language,
                                &phrase.content,
                                Some(&selected.path),
                            )?;
                            debug!(
                                "Repointed phrase of group {} {} to {:?}",
                                group_dir.group_id, slot.language, selected.path
                            );
                            stats.updated += 1;
                        }
                    }
                    (Some(selected), None) => {
                        self.store.upsert_phrase(
                            group_dir.group_id,
                            slot.language,
                            &slot.language.default_content(&group_name),
                            Some(&selected.path),
                        )?;
                        debug!(
                            "Added phrase for group {} {} with audio {:?}",
                            group_dir.group_id, slot.language, selected.path
                        );
                        stats.added += 1;
                    }
                    (None, None) => {
                        self.store.upsert_phrase(
                            group_dir.group_id,
                            slot.language,
                            &slot.language.default_content(&group_name),
                            None,
                        )?;
                        debug!(
                            "Added placeholder phrase for group {} {}",
                            group_dir.group_id, slot.language
                        );
                        stats.added += 1;
                    }
                    // Phrase exists but its folder holds no audio; the
                    // pointer is left as is, readers check file existence
                    (None, Some(_)) => {}
                }
            }
        }

        info!(
            "Scan complete: {} audio files, {} phrases added, {} updated",
            stats.scanned, stats.added, stats.updated
        );
        Ok(stats)
    }

    /// Fill every missing language slot of a group with a template phrase and
    /// make sure the matching language folders exist. Returns the number of
    /// phrases created.
    pub fn ensure_default_phrases_for_group(&self, group_id: i64) -> Result<usize> {
        let group_name = self.ensure_group_row(group_id)?;

        let mut created = 0;
        for language in Language::ALL {
            if self.store.find_phrase(group_id, language)?.is_some() {
                continue;
            }
            let dir = self.language_dir(group_id, language);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create language folder {:?}", dir))?;
            self.store.upsert_phrase(
                group_id,
                language,
                &language.default_content(&group_name),
                None,
            )?;
            created += 1;
        }
        if created > 0 {
            info!(
                "Created {} default phrases for group '{}'",
                created, group_name
            );
        }
        Ok(created)
    }

    /// Ensure a phrase row exists for (group, language) and return its id. An
    /// existing phrase is returned unchanged. A missing one is created with
    /// the caller's content, or the language template when none is given, and
    /// its language folder is created alongside.
    pub fn ensure_phrase(
        &self,
        group_id: i64,
        language: Language,
        content: Option<&str>,
    ) -> Result<i64> {
        if let Some(phrase) = self.store.find_phrase(group_id, language)? {
            return Ok(phrase.id);
        }

        let group_name = self.ensure_group_row(group_id)?;
        let dir = self.language_dir(group_id, language);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create language folder {:?}", dir))?;

        let content = match content {
            Some(content) => content.to_string(),
            None => language.default_content(&group_name),
        };
        let id = self
            .store
            .upsert_phrase(group_id, language, &content, None)?;
        debug!(
            "Created phrase {} for group {} {}",
            id, group_id, language
        );
        Ok(id)
    }

    /// Throw away all catalog rows and rebuild them from the audio tree:
    /// groups from numeric folders, one template phrase per recognized
    /// language folder, then a scan to attach the discovered audio.
    ///
    /// Catalog-only data, like content edits for groups without folders, is
    /// lost. Callers are responsible for confirming this beforehand.
    pub fn reinitialize_from_filesystem(&self) -> Result<ReinitStats> {
        warn!(
            "Rebuilding phrase database from audio tree at {:?}, existing rows are dropped",
            self.audio_root
        );
        self.store.clear_all()?;

        let tree = scan_audio_tree(&self.audio_root)?;
        let mut groups = 0;
        for group_dir in &tree.groups {
            let name = Group::auto_name(group_dir.group_id);
            self.store.create_group_with_id(
                group_dir.group_id,
                &name,
                &Group::auto_description(group_dir.group_id),
            )?;
            groups += 1;
            for slot in &group_dir.slots {
                self.store.upsert_phrase(
                    group_dir.group_id,
                    slot.language,
                    &slot.language.default_content(&name),
                    None,
                )?;
            }
        }

        let scan = self.scan_and_update()?;
        info!(
            "Rebuilt phrase database: {} groups, {} audio files attached",
            groups, scan.updated
        );
        Ok(ReinitStats { groups, scan })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::SqliteCatalogStore;
    use filetime::FileTime;
    use tempfile::TempDir;

    struct Setup {
        _dir: TempDir,
        root: PathBuf,
        store: Arc<dyn CatalogStore>,
        reconciler: Reconciler,
    }

    fn setup() -> Setup {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("audio_files");
        std::fs::create_dir(&root).unwrap();
        let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let reconciler = Reconciler::new(store.clone(), root.clone());
        Setup {
            _dir: dir,
            root,
            store,
            reconciler,
        }
    }

    fn write_audio(root: &Path, group_id: i64, language: &str, name: &str, mtime: i64) -> PathBuf {
        let dir = root.join(group_id.to_string()).join(language);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
        path
    }

    #[test]
    fn test_sync_groups_creates_only_missing_groups() {
        let s = setup();
        std::fs::create_dir(s.root.join("1")).unwrap();
        std::fs::create_dir(s.root.join("2")).unwrap();
        s.store.create_group_with_id(1, "수동 그룹", "kept").unwrap();

        assert_eq!(s.reconciler.sync_groups_from_folders().unwrap(), 1);

        // Existing group untouched, new one from the template
        assert_eq!(s.store.get_group(1).unwrap().unwrap().name, "수동 그룹");
        let group2 = s.store.get_group(2).unwrap().unwrap();
        assert_eq!(group2.name, "Group-2");
        assert_eq!(group2.description, "Auto-created from folder 2");

        // Idempotent
        assert_eq!(s.reconciler.sync_groups_from_folders().unwrap(), 0);
    }

    #[test]
    fn test_sync_groups_with_missing_root() {
        let s = setup();
        std::fs::remove_dir(&s.root).unwrap();
        assert_eq!(s.reconciler.sync_groups_from_folders().unwrap(), 0);
    }

    #[test]
    fn test_scan_creates_phrases_and_placeholders() {
        let s = setup();
        let audio = write_audio(&s.root, 1, "ko", "a.wav", 100);
        std::fs::create_dir_all(s.root.join("1").join("ja")).unwrap();

        let stats = s.reconciler.scan_and_update().unwrap();
        assert_eq!(
            stats,
            ScanStats {
                scanned: 1,
                added: 2,
                updated: 0
            }
        );

        // The group was created on the fly
        let group = s.store.get_group(1).unwrap().unwrap();
        assert_eq!(group.name, "Group-1");

        let ko = s.store.find_phrase(1, Language::Ko).unwrap().unwrap();
        assert_eq!(ko.audio_path, Some(audio));
        assert_eq!(ko.content, Language::Ko.default_content("Group-1"));

        let ja = s.store.find_phrase(1, Language::Ja).unwrap().unwrap();
        assert_eq!(ja.audio_path, None);
        assert_eq!(ja.content, Language::Ja.default_content("Group-1"));
    }

    #[test]
    fn test_scan_twice_reports_no_changes() {
        let s = setup();
        write_audio(&s.root, 1, "ko", "a.wav", 100);
        write_audio(&s.root, 2, "en", "b.mp3", 200);

        let first = s.reconciler.scan_and_update().unwrap();
        assert_eq!(first.added, 2);

        let second = s.reconciler.scan_and_update().unwrap();
        assert_eq!(
            second,
            ScanStats {
                scanned: 2,
                added: 0,
                updated: 0
            }
        );
        assert_eq!(s.store.all_phrases(false).unwrap().len(), 2);
    }

    #[test]
    fn test_scan_repoints_to_newer_file_and_keeps_content() {
        let s = setup();
        write_audio(&s.root, 1, "ko", "old.wav", 100);
        s.reconciler.scan_and_update().unwrap();

        let phrase = s.store.find_phrase(1, Language::Ko).unwrap().unwrap();
        s.store
            .update_phrase_content(phrase.id, "직접 고친 내용")
            .unwrap();

        let newer = write_audio(&s.root, 1, "ko", "new.wav", 200);
        let stats = s.reconciler.scan_and_update().unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.added, 0);

        let phrase = s.store.find_phrase(1, Language::Ko).unwrap().unwrap();
        assert_eq!(phrase.audio_path, Some(newer));
        assert_eq!(phrase.content, "직접 고친 내용");

        // The superseded file stays on disk; scans never delete audio
        assert!(s.root.join("1").join("ko").join("old.wav").exists());
    }

    #[test]
    fn test_scan_leaves_phrase_alone_when_folder_has_no_audio() {
        let s = setup();
        s.store.create_group_with_id(1, "인사", "").unwrap();
        let id = s.store
            .upsert_phrase(1, Language::Ko, "안녕하세요", None)
            .unwrap();
        std::fs::create_dir_all(s.root.join("1").join("ko")).unwrap();

        let stats = s.reconciler.scan_and_update().unwrap();
        assert_eq!(stats, ScanStats::default());

        let phrase = s.store.get_phrase(id).unwrap().unwrap();
        assert_eq!(phrase.content, "안녕하세요");
        assert_eq!(phrase.audio_path, None);
    }

    #[test]
    fn test_ensure_default_phrases_fills_missing_languages() {
        let s = setup();
        let group = s.store.create_group("인사", "").unwrap();
        s.store
            .upsert_phrase(group.id, Language::Ko, "안녕하세요", None)
            .unwrap();

        let created = s.reconciler
            .ensure_default_phrases_for_group(group.id)
            .unwrap();
        assert_eq!(created, 3);

        let phrases = s.store.phrases_of_group(group.id).unwrap();
        assert_eq!(phrases.len(), 4);
        assert!(phrases.iter().all(|p| !p.content.is_empty()));

        // Folders for the created languages exist now
        for language in [Language::En, Language::Ja, Language::Zh] {
            assert!(s.root
                .join(group.id.to_string())
                .join(language.as_str())
                .is_dir());
        }

        // Nothing left to create
        assert_eq!(
            s.reconciler
                .ensure_default_phrases_for_group(group.id)
                .unwrap(),
            0
        );
        // The manual phrase was not overwritten
        let ko = s.store.find_phrase(group.id, Language::Ko).unwrap().unwrap();
        assert_eq!(ko.content, "안녕하세요");
    }

    #[test]
    fn test_ensure_default_phrases_creates_missing_group() {
        let s = setup();
        let created = s.reconciler.ensure_default_phrases_for_group(7).unwrap();
        assert_eq!(created, 4);

        let group = s.store.get_group(7).unwrap().unwrap();
        assert_eq!(group.name, "Group-7");
        let ko = s.store.find_phrase(7, Language::Ko).unwrap().unwrap();
        assert_eq!(ko.content, Language::Ko.default_content("Group-7"));
    }

    #[test]
    fn test_ensure_phrase_returns_existing_id_unchanged() {
        let s = setup();
        let group = s.store.create_group("인사", "").unwrap();
        let id = s.store
            .upsert_phrase(group.id, Language::Ko, "안녕하세요", None)
            .unwrap();

        let ensured = s.reconciler
            .ensure_phrase(group.id, Language::Ko, Some("다른 내용"))
            .unwrap();
        assert_eq!(ensured, id);

        // Existing content is never replaced by ensure
        let phrase = s.store.get_phrase(id).unwrap().unwrap();
        assert_eq!(phrase.content, "안녕하세요");
    }

    #[test]
    fn test_ensure_phrase_creates_with_content_or_template() {
        let s = setup();
        let group = s.store.create_group("인사", "").unwrap();

        let id = s.reconciler
            .ensure_phrase(group.id, Language::En, Some("Hello"))
            .unwrap();
        assert_eq!(s.store.get_phrase(id).unwrap().unwrap().content, "Hello");

        let id = s.reconciler
            .ensure_phrase(group.id, Language::Ja, None)
            .unwrap();
        assert_eq!(
            s.store.get_phrase(id).unwrap().unwrap().content,
            Language::Ja.default_content("인사")
        );
        assert!(s.root.join(group.id.to_string()).join("ja").is_dir());
    }

    #[test]
    fn test_reinitialize_rebuilds_catalog_from_tree() {
        let s = setup();
        // Catalog-only state that must not survive
        let stale = s.store
            .create_group_with_id(99, "폴더 없는 그룹", "")
            .unwrap();
        s.store
            .upsert_phrase(stale.id, Language::Ko, "사라질 내용", None)
            .unwrap();

        let audio = write_audio(&s.root, 1, "ko", "a.wav", 100);
        std::fs::create_dir_all(s.root.join("1").join("en")).unwrap();
        std::fs::create_dir_all(s.root.join("2").join("ja")).unwrap();

        let stats = s.reconciler.reinitialize_from_filesystem().unwrap();
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.scan.scanned, 1);
        // Placeholders were created before the scan, so the audio attach
        // counts as an update
        assert_eq!(stats.scan.added, 0);
        assert_eq!(stats.scan.updated, 1);

        let groups = s.store.list_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(s.store.get_group(stale.id).unwrap().is_none());

        let ko = s.store.find_phrase(1, Language::Ko).unwrap().unwrap();
        assert_eq!(ko.audio_path, Some(audio));
        assert_eq!(ko.content, Language::Ko.default_content("Group-1"));

        let en = s.store.find_phrase(1, Language::En).unwrap().unwrap();
        assert_eq!(en.audio_path, None);

        let ja = s.store.find_phrase(2, Language::Ja).unwrap().unwrap();
        assert_eq!(ja.content, Language::Ja.default_content("Group-2"));
    }
}
