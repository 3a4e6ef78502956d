//! crates/flashcards_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP framework.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Subscription plan of a user. Governs the daily generation quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Admin,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Admin => "admin",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "admin" => Ok(Plan::Admin),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

/// Represents an authenticated user - used throughout the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// The claim set embedded in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub plan: Plan,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A named set of flashcards owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub max_cards: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub max_cards: i32,
}

/// Partial update of a collection; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub front: String,
    pub back: String,
    pub video_url: Option<String>,
    pub created_by_generator: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub front: String,
    pub back: String,
    pub video_url: Option<String>,
}

/// One term/definition pair as produced by a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPair {
    pub front: String,
    pub back: String,
}

impl CardPair {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// How the provider should interpret the generation content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Extract 3-10 pairs from free text.
    Text,
    /// Produce exactly 10 pairs about a named topic.
    Topic,
}

impl GenerationMode {
    /// Minimum content length, in characters, accepted for this mode.
    pub fn min_content_len(&self) -> usize {
        match self {
            GenerationMode::Text => 1,
            GenerationMode::Topic => 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub content: String,
    pub collection_id: Uuid,
}

/// The per-user-per-day generation counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub owner_id: Uuid,
    pub day: NaiveDate,
    pub count: u32,
}

/// Snapshot of a user's quota for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub generated_today: u32,
    pub daily_limit: u32,
    pub remaining: u32,
}

/// Result of an atomic check-and-increment against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { used_today: u32 },
    Exceeded { used_today: u32 },
}

/// Result of persisting a generated batch together with its quota charge.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Committed {
        flashcards: Vec<Flashcard>,
        used_today: u32,
    },
    QuotaExceeded {
        used_today: u32,
    },
}

/// What the pipeline hands back once a batch is persisted.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub flashcards: Vec<Flashcard>,
    pub generated_today: u32,
}
