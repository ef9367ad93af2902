//! Shared constants for end-to-end tests
//!
//! This module contains the group names, phrase contents and timestamps
//! used across the test suite. When test data changes, update only this
//! file.

// ============================================================================
// Test Group Names
// ============================================================================

/// Group name for greetings played at the entrance
pub const GREETINGS_NAME: &str = "인사말";

/// Group name for periodic announcements
pub const ANNOUNCEMENTS_NAME: &str = "안내 방송";

/// Group name for closing time farewells
pub const FAREWELLS_NAME: &str = "작별 인사";

// ============================================================================
// Test Phrase Content
// ============================================================================

/// Korean greeting content
pub const KO_GREETING: &str = "안녕하세요, 환영합니다";

/// English greeting content
pub const EN_GREETING: &str = "Hello and welcome";

// ============================================================================
// Test Timestamps
// ============================================================================

/// Base mtime for audio files written by tests (seconds since the epoch)
pub const BASE_MTIME: i64 = 1_700_000_000;
