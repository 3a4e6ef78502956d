//! Shared fixtures for the api integration tests.
#![allow(dead_code)]

use api_lib::adapters::{Argon2PasswordService, InMemoryDb, JwtCredentialService};
use api_lib::web::state::AppState;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use flashcards_core::ports::{FlashcardGenerationService, ProviderError};
use flashcards_core::{
    CardPair, Collection, GenerationMode, ManualClock, NewCollection, Plan, User,
};
use jsonwebtoken::Algorithm;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const SECRET: &[u8] = b"integration-test-secret";

pub fn credentials() -> JwtCredentialService {
    JwtCredentialService::from_secret(SECRET, Algorithm::HS256, Duration::hours(24))
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` distinct, well-formed pairs.
pub fn pairs(n: usize) -> Vec<CardPair> {
    (0..n)
        .map(|i| CardPair::new(format!("Term {i}"), format!("Definition {i}")))
        .collect()
}

//=========================================================================================
// Scripted generation provider
//=========================================================================================

/// Replays queued answers in order. An exhausted script is a transport error.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<CardPair>, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn push(&self, answer: Result<Vec<CardPair>, ProviderError>) {
        self.script.lock().unwrap().push_back(answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlashcardGenerationService for ScriptedProvider {
    async fn generate(
        &self,
        _mode: GenerationMode,
        _content: &str,
    ) -> Result<Vec<CardPair>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".into())))
    }
}

//=========================================================================================
// Harness
//=========================================================================================

/// Application state over the in-memory store, a scripted provider and a
/// manual clock pinned to a fixed day.
pub struct Harness {
    pub db: Arc<InMemoryDb>,
    pub provider: Arc<ScriptedProvider>,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(InMemoryDb::new());
        let provider = Arc::new(ScriptedProvider::default());
        let clock = Arc::new(ManualClock::new(day(2025, 6, 1)));
        let state = Arc::new(AppState::with_clock(
            db.clone(),
            Arc::new(credentials()),
            Arc::new(Argon2PasswordService::new()),
            provider.clone(),
            clock.clone(),
        ));
        Self {
            db,
            provider,
            clock,
            state,
        }
    }

    /// Registers a fresh account, moves it to `plan`, and returns it with its token.
    pub async fn user(&self, plan: Plan) -> (User, String) {
        let email = format!("{}@example.com", Uuid::new_v4().simple());
        let session = self
            .state
            .accounts
            .register(&email, "correct horse battery")
            .await
            .unwrap();
        self.db.set_plan(session.user.id, plan).await.unwrap();

        let mut user = session.user;
        user.plan = plan;
        (user, session.token.token)
    }

    pub async fn collection(&self, owner: &User) -> Collection {
        self.state
            .library
            .create_collection(
                owner,
                NewCollection {
                    name: "Biology".into(),
                    description: None,
                    is_public: false,
                    max_cards: 10,
                },
            )
            .await
            .unwrap()
    }
}
