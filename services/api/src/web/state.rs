//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use flashcards_core::ports::{
    CredentialService, DatabaseService, FlashcardGenerationService, PasswordService,
};
use flashcards_core::quota::{Clock, LocalClock};
use flashcards_core::{AccessGate, AccountService, GenerationPipeline, LibraryService, QuotaLedger};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: AccessGate,
    pub accounts: AccountService,
    pub library: LibraryService,
    pub ledger: QuotaLedger,
    pub pipeline: GenerationPipeline,
}

impl AppState {
    /// Wires the core services over the given adapters, keyed on the server's local date.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        credentials: Arc<dyn CredentialService>,
        passwords: Arc<dyn PasswordService>,
        generator: Arc<dyn FlashcardGenerationService>,
    ) -> Self {
        Self::with_clock(db, credentials, passwords, generator, Arc::new(LocalClock))
    }

    pub fn with_clock(
        db: Arc<dyn DatabaseService>,
        credentials: Arc<dyn CredentialService>,
        passwords: Arc<dyn PasswordService>,
        generator: Arc<dyn FlashcardGenerationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = QuotaLedger::with_clock(db.clone(), clock);
        Self {
            gate: AccessGate::new(credentials.clone(), db.clone()),
            accounts: AccountService::new(db.clone(), credentials, passwords),
            library: LibraryService::new(db.clone()),
            pipeline: GenerationPipeline::new(db, ledger.clone(), generator),
            ledger,
        }
    }
}
