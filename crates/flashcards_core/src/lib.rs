pub mod accounts;
pub mod domain;
pub mod error;
pub mod gate;
pub mod library;
pub mod pipeline;
pub mod ports;
pub mod quota;

pub use accounts::{AccountService, AuthSession};
pub use domain::{
    BatchOutcome, CardPair, Claims, Collection, CollectionUpdate, Flashcard, GenerationMode,
    GenerationOutcome, GenerationRequest, IssuedToken, LedgerEntry, NewCollection, NewFlashcard,
    Plan, QuotaDecision, QuotaStatus, User, UserCredentials,
};
pub use error::{ServiceError, ServiceResult};
pub use gate::AccessGate;
pub use library::LibraryService;
pub use pipeline::{GenerationPipeline, GenerationStage};
pub use ports::{
    CredentialService, DatabaseService, FlashcardGenerationService, InvalidCredential,
    PasswordService, PortError, PortResult, ProviderError,
};
pub use quota::{Clock, LocalClock, ManualClock, QuotaLedger};
