pub mod db;
pub mod generator_llm;
pub mod jwt;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod password;

pub use db::DbAdapter;
pub use generator_llm::OpenAiFlashcardAdapter;
pub use jwt::JwtCredentialService;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryDb;
pub use password::Argon2PasswordService;
