//! Read-only scanner for the on-disk audio tree.
//!
//! The tree is laid out as `audio_root/<group_id>/<language>/<file>.wav|mp3`,
//! where `<group_id>` is a plain integer folder name and `<language>` one of
//! the recognized language codes. Scanning never touches the database; it
//! produces a `TreeScan` for the reconciler to act on.

use crate::catalog_store::Language;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

/// File extensions recognized as phrase audio, matched case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

/// Errors that can occur while scanning the audio tree.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read audio root {path:?}: {source}")]
    UnreadableRoot { path: PathBuf, source: io::Error },
}

/// The audio file chosen to represent one (group, language) slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedAudio {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// One recognized language folder inside a group folder. A folder with no
/// audio files still yields a slot, with `audio` unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSlot {
    pub language: Language,
    pub audio: Option<SelectedAudio>,
}

/// One numeric group folder with its language slots, sorted by language code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDir {
    pub group_id: i64,
    pub slots: Vec<AudioSlot>,
}

/// Snapshot of the audio tree, with groups sorted by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeScan {
    pub groups: Vec<GroupDir>,
}

impl TreeScan {
    /// Number of slots for which an audio file was selected.
    pub fn selected_files(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.slots)
            .filter(|slot| slot.audio.is_some())
            .count()
    }
}

/// Scan the audio tree into a description of what is on disk.
///
/// A missing root is an empty tree, not an error. Folders whose names are not
/// plain integers or recognized language codes are skipped, as are files
/// without a recognized audio extension. Entries that cannot be read are
/// logged and skipped.
pub fn scan_audio_tree(audio_root: &Path) -> Result<TreeScan, ScanError> {
    let entries = match std::fs::read_dir(audio_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Audio root {:?} does not exist, nothing to scan", audio_root);
            return Ok(TreeScan::default());
        }
        Err(e) => {
            return Err(ScanError::UnreadableRoot {
                path: audio_root.to_path_buf(),
                source: e,
            })
        }
    };

    let mut groups = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in audio root {:?}: {}", audio_root, e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let group_id = match parse_group_dir_name(&entry.file_name()) {
            Some(id) => id,
            None => {
                debug!("Skipping non-numeric folder {:?}", path);
                continue;
            }
        };
        groups.push(scan_group_dir(&path, group_id));
    }
    groups.sort_by_key(|group| group.group_id);

    Ok(TreeScan { groups })
}

/// Group folder names are plain non-negative integers; leading zeros are
/// accepted ("007" is group 7).
fn parse_group_dir_name(name: &OsStr) -> Option<i64> {
    let name = name.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

fn scan_group_dir(dir: &Path, group_id: i64) -> GroupDir {
    let mut slots = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read group folder {:?}: {}", dir, e);
            return GroupDir { group_id, slots };
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in group folder {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let language = match entry.file_name().to_str().and_then(Language::parse) {
            Some(language) => language,
            None => {
                debug!("Skipping unrecognized language folder {:?}", path);
                continue;
            }
        };
        slots.push(AudioSlot {
            language,
            audio: select_newest_audio(&path),
        });
    }
    slots.sort_by_key(|slot| slot.language.as_str());

    GroupDir { group_id, slots }
}

/// Pick the audio file with the newest modification time; ties go to the
/// greatest file name.
fn select_newest_audio(dir: &Path) -> Option<SelectedAudio> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read language folder {:?}: {}", dir, e);
            return None;
        }
    };

    let mut best: Option<(SystemTime, OsString, PathBuf)> = None;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in language folder {:?}: {}", dir, e);
                continue;
            }
        };
        let path = entry.path();
        if !has_audio_extension(&path) {
            continue;
        }
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to stat audio file {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Failed to read mtime of {:?}: {}", path, e);
                continue;
            }
        };

        let name = entry.file_name();
        let replaces = match &best {
            None => true,
            Some((best_modified, best_name, _)) => {
                modified > *best_modified || (modified == *best_modified && name > *best_name)
            }
        };
        if replaces {
            best = Some((modified, name, path));
        }
    }

    best.map(|(modified, _, path)| SelectedAudio { path, modified })
}

fn has_audio_extension(path: &Path) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) => AUDIO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}
