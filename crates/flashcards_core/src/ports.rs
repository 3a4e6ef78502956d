//! crates/flashcards_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::domain::{
    BatchOutcome, CardPair, Claims, Collection, CollectionUpdate, Flashcard, GenerationMode,
    IssuedToken, NewCollection, NewFlashcard, Plan, QuotaDecision, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failure of the external generation call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network, authentication or rate-limit failure talking to the provider.
    #[error("provider transport failure: {0}")]
    Transport(String),
    /// The provider answered but the payload was not a sequence of pairs.
    #[error("provider returned a malformed payload: {0}")]
    Malformed(String),
    #[error("provider call timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// A token that failed verification. Carries no detail on purpose: expired,
/// tampered and malformed tokens are indistinguishable to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid credential")]
pub struct InvalidCredential;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user(&self, email: &str, hashed_password: &str, plan: Plan)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Collection Management ---
    async fn create_collection(&self, owner_id: Uuid, new: NewCollection)
        -> PortResult<Collection>;

    async fn get_collection(&self, collection_id: Uuid) -> PortResult<Collection>;

    async fn list_collections(&self, owner_id: Uuid) -> PortResult<Vec<Collection>>;

    async fn update_collection(
        &self,
        collection_id: Uuid,
        update: CollectionUpdate,
    ) -> PortResult<Collection>;

    /// Deletes the collection and, by cascade, all of its flashcards.
    async fn delete_collection(&self, collection_id: Uuid) -> PortResult<()>;

    // --- Flashcard Management ---
    async fn create_flashcard(
        &self,
        collection_id: Uuid,
        new: NewFlashcard,
    ) -> PortResult<Flashcard>;

    async fn get_flashcard(&self, flashcard_id: Uuid) -> PortResult<Flashcard>;

    async fn list_flashcards(&self, collection_id: Uuid) -> PortResult<Vec<Flashcard>>;

    async fn delete_flashcard(&self, flashcard_id: Uuid) -> PortResult<()>;

    // --- Generation Ledger ---

    /// Count for `(owner, day)`, or 0 when no entry exists.
    async fn get_generation_count(&self, owner_id: Uuid, day: NaiveDate) -> PortResult<u32>;

    /// Adds `n` to the `(owner, day)` entry only if the result stays within `limit`.
    /// Must be atomic with respect to concurrent callers for the same key.
    async fn try_consume_generations(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
        n: u32,
        limit: u32,
    ) -> PortResult<QuotaDecision>;

    /// Creates one generated flashcard per pair and charges `pairs.len()` against
    /// the `(owner, day)` entry in a single transaction. Either both effects are
    /// committed or neither is.
    async fn persist_generated_batch(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
        limit: u32,
        collection_id: Uuid,
        pairs: &[CardPair],
    ) -> PortResult<BatchOutcome>;
}

/// Issues and validates signed, expiring access tokens.
pub trait CredentialService: Send + Sync {
    fn issue(
        &self,
        subject_id: Uuid,
        email: &str,
        plan: Plan,
        ttl: Duration,
    ) -> PortResult<IssuedToken>;

    fn validate(&self, token: &str) -> Result<Claims, InvalidCredential>;

    /// The TTL configured for tokens minted at login and registration.
    fn default_ttl(&self) -> Duration;
}

/// Opaque password hashing capability.
pub trait PasswordService: Send + Sync {
    fn hash(&self, password: &str) -> PortResult<String>;

    fn verify(&self, password: &str, hashed_password: &str) -> bool;
}

#[async_trait]
pub trait FlashcardGenerationService: Send + Sync {
    /// Turns free text or a topic into an ordered sequence of term/definition pairs.
    async fn generate(
        &self,
        mode: GenerationMode,
        content: &str,
    ) -> Result<Vec<CardPair>, ProviderError>;
}
