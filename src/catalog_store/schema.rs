//! SQLite schema definitions for the phrase bank database.
//!
//! Two tables mirror the on-disk audio tree: one group per numeric folder and
//! at most one phrase per (group, language). The uniqueness is enforced here,
//! in the schema, rather than in application code.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

// =============================================================================
// Tables
// =============================================================================

/// Groups table - one row per phrase group
const GROUPS_TABLE: Table = Table {
    name: "groups",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "description",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_groups_name", "name")],
    unique_constraints: &[],
};

const GROUP_FK: ForeignKey = ForeignKey {
    foreign_table: "groups",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Phrases table - group content per language, with an optional audio pointer
const PHRASES_TABLE: Table = Table {
    name: "phrases",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "group_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&GROUP_FK)
        ),
        sqlite_column!("language", &SqlType::Text, non_null = true), // 'ko', 'en', 'ja', 'zh'
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("audio_path", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_phrases_group", "group_id")],
    unique_constraints: &[&["group_id", "language"]],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const PHRASEBANK_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[GROUPS_TABLE, PHRASES_TABLE],
    migration: None,
}];
