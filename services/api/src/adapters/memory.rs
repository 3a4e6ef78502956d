//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Every operation
//! runs under one mutex, which makes the ledger's check-and-increment atomic.
//! Used by the test suites; supports failure injection inside a generated batch.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use flashcards_core::domain::{
    BatchOutcome, CardPair, Collection, CollectionUpdate, Flashcard, LedgerEntry, NewCollection,
    NewFlashcard, Plan, QuotaDecision, User, UserCredentials,
};
use flashcards_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, UserCredentials>,
    collections: HashMap<Uuid, Collection>,
    /// Kept in insertion order.
    flashcards: Vec<Flashcard>,
    ledger: HashMap<(Uuid, NaiveDate), LedgerEntry>,
    /// When set, a generated batch fails after inserting this many cards.
    fail_generated_inserts_after: Option<usize>,
}

impl Store {
    fn charge(&mut self, owner_id: Uuid, day: NaiveDate, n: u32, limit: u32) -> QuotaDecision {
        let used = self
            .ledger
            .get(&(owner_id, day))
            .map(|entry| entry.count)
            .unwrap_or(0);

        match used.checked_add(n) {
            Some(next) if next <= limit => {
                self.ledger.insert(
                    (owner_id, day),
                    LedgerEntry {
                        owner_id,
                        day,
                        count: next,
                    },
                );
                QuotaDecision::Allowed { used_today: next }
            }
            _ => QuotaDecision::Exceeded { used_today: used },
        }
    }

    fn restore_ledger(&mut self, owner_id: Uuid, day: NaiveDate, previous: Option<LedgerEntry>) {
        match previous {
            Some(entry) => {
                self.ledger.insert((owner_id, day), entry);
            }
            None => {
                self.ledger.remove(&(owner_id, day));
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes a user's plan, as an out-of-band plan change would.
    pub async fn set_plan(&self, user_id: Uuid, plan: Plan) -> PortResult<()> {
        let mut store = self.store.lock().await;
        let creds = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))?;
        creds.user.plan = plan;
        Ok(())
    }

    /// Removes a user and everything they own.
    pub async fn delete_user(&self, user_id: Uuid) {
        let mut store = self.store.lock().await;
        store.users.remove(&user_id);
        let owned: Vec<Uuid> = store
            .collections
            .values()
            .filter(|c| c.owner_id == user_id)
            .map(|c| c.id)
            .collect();
        store.collections.retain(|_, c| c.owner_id != user_id);
        store
            .flashcards
            .retain(|card| !owned.contains(&card.collection_id));
        store.ledger.retain(|(owner, _), _| *owner != user_id);
    }

    /// Makes the next generated batches fail after `inserted` cards were written.
    pub async fn fail_generated_inserts_after(&self, inserted: Option<usize>) {
        self.store.lock().await.fail_generated_inserts_after = inserted;
    }

    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.store.lock().await.ledger.values().cloned().collect()
    }

    pub async fn flashcard_count(&self) -> usize {
        self.store.lock().await.flashcards.len()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        plan: Plan,
    ) -> PortResult<User> {
        let mut store = self.store.lock().await;
        if store.users.values().any(|c| c.user.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            plan,
            created_at: Utc::now(),
        };
        store.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.store
            .lock()
            .await
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {}", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.store
            .lock()
            .await
            .users
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))
    }

    async fn create_collection(
        &self,
        owner_id: Uuid,
        new: NewCollection,
    ) -> PortResult<Collection> {
        let mut store = self.store.lock().await;
        if !store.users.contains_key(&owner_id) {
            return Err(PortError::NotFound(format!("User {}", owner_id)));
        }
        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4(),
            owner_id,
            name: new.name,
            description: new.description,
            is_public: new.is_public,
            max_cards: new.max_cards,
            created_at: now,
            updated_at: now,
        };
        store.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn get_collection(&self, collection_id: Uuid) -> PortResult<Collection> {
        self.store
            .lock()
            .await
            .collections
            .get(&collection_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Collection {}", collection_id)))
    }

    async fn list_collections(&self, owner_id: Uuid) -> PortResult<Vec<Collection>> {
        let store = self.store.lock().await;
        let mut collections: Vec<Collection> = store
            .collections
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        collections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(collections)
    }

    async fn update_collection(
        &self,
        collection_id: Uuid,
        update: CollectionUpdate,
    ) -> PortResult<Collection> {
        let mut store = self.store.lock().await;
        let collection = store
            .collections
            .get_mut(&collection_id)
            .ok_or_else(|| PortError::NotFound(format!("Collection {}", collection_id)))?;
        if let Some(name) = update.name {
            collection.name = name;
        }
        if let Some(description) = update.description {
            collection.description = Some(description);
        }
        if let Some(is_public) = update.is_public {
            collection.is_public = is_public;
        }
        collection.updated_at = Utc::now();
        Ok(collection.clone())
    }

    async fn delete_collection(&self, collection_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().await;
        if store.collections.remove(&collection_id).is_none() {
            return Err(PortError::NotFound(format!("Collection {}", collection_id)));
        }
        store
            .flashcards
            .retain(|card| card.collection_id != collection_id);
        Ok(())
    }

    async fn create_flashcard(
        &self,
        collection_id: Uuid,
        new: NewFlashcard,
    ) -> PortResult<Flashcard> {
        let mut store = self.store.lock().await;
        if !store.collections.contains_key(&collection_id) {
            return Err(PortError::NotFound(format!("Collection {}", collection_id)));
        }
        let card = Flashcard {
            id: Uuid::new_v4(),
            collection_id,
            front: new.front,
            back: new.back,
            video_url: new.video_url,
            created_by_generator: false,
            created_at: Utc::now(),
        };
        store.flashcards.push(card.clone());
        Ok(card)
    }

    async fn get_flashcard(&self, flashcard_id: Uuid) -> PortResult<Flashcard> {
        self.store
            .lock()
            .await
            .flashcards
            .iter()
            .find(|card| card.id == flashcard_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {}", flashcard_id)))
    }

    async fn list_flashcards(&self, collection_id: Uuid) -> PortResult<Vec<Flashcard>> {
        Ok(self
            .store
            .lock()
            .await
            .flashcards
            .iter()
            .filter(|card| card.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn delete_flashcard(&self, flashcard_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().await;
        let before = store.flashcards.len();
        store.flashcards.retain(|card| card.id != flashcard_id);
        if store.flashcards.len() == before {
            return Err(PortError::NotFound(format!("Flashcard {}", flashcard_id)));
        }
        Ok(())
    }

    async fn get_generation_count(&self, owner_id: Uuid, day: NaiveDate) -> PortResult<u32> {
        Ok(self
            .store
            .lock()
            .await
            .ledger
            .get(&(owner_id, day))
            .map(|entry| entry.count)
            .unwrap_or(0))
    }

    async fn try_consume_generations(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
        n: u32,
        limit: u32,
    ) -> PortResult<QuotaDecision> {
        Ok(self.store.lock().await.charge(owner_id, day, n, limit))
    }

    async fn persist_generated_batch(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
        limit: u32,
        collection_id: Uuid,
        pairs: &[CardPair],
    ) -> PortResult<BatchOutcome> {
        let n = u32::try_from(pairs.len())
            .map_err(|_| PortError::Unexpected("batch too large".to_string()))?;

        let mut store = self.store.lock().await;
        if !store.collections.contains_key(&collection_id) {
            return Err(PortError::NotFound(format!("Collection {}", collection_id)));
        }

        let previous = store.ledger.get(&(owner_id, day)).cloned();
        let used_today = match store.charge(owner_id, day, n, limit) {
            QuotaDecision::Allowed { used_today } => used_today,
            QuotaDecision::Exceeded { used_today } => {
                return Ok(BatchOutcome::QuotaExceeded { used_today })
            }
        };

        let checkpoint = store.flashcards.len();
        let created_at = Utc::now();
        for (inserted, pair) in pairs.iter().enumerate() {
            if store.fail_generated_inserts_after == Some(inserted) {
                store.flashcards.truncate(checkpoint);
                store.restore_ledger(owner_id, day, previous);
                return Err(PortError::Unexpected(
                    "injected failure while inserting generated flashcards".to_string(),
                ));
            }
            store.flashcards.push(Flashcard {
                id: Uuid::new_v4(),
                collection_id,
                front: pair.front.clone(),
                back: pair.back.clone(),
                video_url: None,
                created_by_generator: true,
                created_at,
            });
        }

        Ok(BatchOutcome::Committed {
            flashcards: store.flashcards[checkpoint..].to_vec(),
            used_today,
        })
    }
}
