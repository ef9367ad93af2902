//! Core phrase bank models for SQLite-backed storage.
//!
//! These models are shared by the store, the audio tree scanner, the
//! reconciler and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// =============================================================================
// Enumerations
// =============================================================================

/// Languages the phrase bank manages, one per language folder on disk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ko,
    En,
    Ja,
    Zh,
}

impl Language {
    /// All recognized languages, in canonical order.
    pub const ALL: [Language; 4] = [Language::Ko, Language::En, Language::Ja, Language::Zh];

    /// Parse a language code as it appears in folder names and the database.
    /// Codes match exactly; "KO" or "kor" are not recognized.
    pub fn parse(s: &str) -> Option<Language> {
        match s {
            "ko" => Some(Language::Ko),
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }

    /// The lowercase code used for folder names and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
        }
    }

    /// Template content used when a phrase is created without caller-provided
    /// text, e.g. for audio files discovered on disk.
    pub fn default_content(&self, group_name: &str) -> String {
        match self {
            Language::Ko => format!("{} 관련 기본 멘트입니다 (한국어)", group_name),
            Language::En => format!("Default phrase for {} (English)", group_name),
            Language::Ja => format!("{}に関する基本メッセージです (日本語)", group_name),
            Language::Zh => format!("关于{}的默认信息 (中文)", group_name),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a phrase's recorded audio can actually be played.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioAvailability {
    /// No audio file has been linked to the phrase.
    Absent,
    /// An audio file is linked and exists on disk.
    Available,
    /// An audio file is linked but is gone from disk.
    Missing,
}

/// Which fields a phrase search matches against.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Match phrase content only.
    Content,
    /// Match the owning group's name only.
    GroupName,
    /// Match either phrase content or group name.
    All,
}

// =============================================================================
// Records
// =============================================================================

/// A group of phrases, mirrored by one numeric folder under the audio root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Unix seconds, assigned by the database on insert.
    pub created_at: i64,
}

impl Group {
    /// Name given to groups created from a bare folder on disk.
    pub fn auto_name(id: i64) -> String {
        format!("Group-{}", id)
    }

    /// Description given to groups created from a bare folder on disk.
    pub fn auto_description(id: i64) -> String {
        format!("Auto-created from folder {}", id)
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now)
    }
}

/// One phrase of a group in one language, at most one per (group, language).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: i64,
    pub group_id: i64,
    pub language: Language,
    pub content: String,
    /// Absolute or root-relative path of the recorded audio, if any.
    pub audio_path: Option<PathBuf>,
    /// Unix seconds, assigned by the database on insert.
    pub created_at: i64,
}

impl Phrase {
    pub fn audio_availability(&self) -> AudioAvailability {
        match &self.audio_path {
            None => AudioAvailability::Absent,
            Some(path) if path.exists() => AudioAvailability::Available,
            Some(_) => AudioAvailability::Missing,
        }
    }

    /// The audio path, but only when the file is actually present on disk.
    pub fn playable_audio(&self) -> Option<&Path> {
        match &self.audio_path {
            Some(path) if path.exists() => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now)
    }
}

/// A phrase joined with the name of its owning group, for listings and search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhraseWithGroup {
    #[serde(flatten)]
    pub phrase: Phrase,
    pub group_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse_roundtrip() {
        for language in Language::ALL {
            assert_eq!(Language::parse(language.as_str()), Some(language));
        }
    }

    #[test]
    fn test_language_parse_rejects_unknown_codes() {
        assert_eq!(Language::parse("KO"), None);
        assert_eq!(Language::parse("kor"), None);
        assert_eq!(Language::parse("fr"), None);
        assert_eq!(Language::parse(""), None);
    }

    #[test]
    fn test_default_content_embeds_group_name() {
        for language in Language::ALL {
            let content = language.default_content("인사");
            assert!(content.contains("인사"), "missing name in {:?}", content);
        }
    }

    #[test]
    fn test_audio_availability() {
        let dir = tempfile::TempDir::new().unwrap();
        let existing = dir.path().join("hello.wav");
        std::fs::write(&existing, b"RIFF").unwrap();

        let mut phrase = Phrase {
            id: 1,
            group_id: 1,
            language: Language::Ko,
            content: "안녕하세요".to_string(),
            audio_path: None,
            created_at: 0,
        };
        assert_eq!(phrase.audio_availability(), AudioAvailability::Absent);
        assert_eq!(phrase.playable_audio(), None);

        phrase.audio_path = Some(existing.clone());
        assert_eq!(phrase.audio_availability(), AudioAvailability::Available);
        assert_eq!(phrase.playable_audio(), Some(existing.as_path()));

        phrase.audio_path = Some(dir.path().join("gone.wav"));
        assert_eq!(phrase.audio_availability(), AudioAvailability::Missing);
        assert_eq!(phrase.playable_audio(), None);
    }

    #[test]
    fn test_group_auto_fields() {
        assert_eq!(Group::auto_name(7), "Group-7");
        assert_eq!(Group::auto_description(7), "Auto-created from folder 7");
    }

    #[test]
    fn test_language_serializes_as_lowercase_code() {
        let json = serde_json::to_string(&Language::Ja).unwrap();
        assert_eq!(json, "\"ja\"");
        let back: Language = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(back, Language::Zh);
    }
}
