//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use flashcards_core::domain::{
    BatchOutcome, CardPair, Collection, CollectionUpdate, Flashcard, NewCollection, NewFlashcard,
    Plan, QuotaDecision, User, UserCredentials,
};
use flashcards_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::warn;
use uuid::Uuid;

/// Unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Adds `$3` to the `(user_id, day)` counter unless the result would exceed `$4`.
/// Returns the new count, or no row when the charge was refused. The row lock
/// taken by `ON CONFLICT DO UPDATE` serialises concurrent charges for one key.
const CONSUME_SQL: &str = r#"
    INSERT INTO generation_logs (user_id, day, count)
    SELECT $1, $2, $3 WHERE $3 <= $4
    ON CONFLICT (user_id, day) DO UPDATE
        SET count = generation_logs.count + EXCLUDED.count,
            updated_at = NOW()
        WHERE generation_logs.count + EXCLUDED.count <= $4
    RETURNING count
"#;

const USER_COLUMNS: &str = "id, email, plan, created_at";
const COLLECTION_COLUMNS: &str =
    "id, user_id, name, description, is_public, max_cards, created_at, updated_at";
const FLASHCARD_COLUMNS: &str =
    "id, collection_id, front, back, video_url, created_by_generator, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn current_count<'e, E: PgExecutor<'e>>(
        executor: E,
        owner_id: Uuid,
        day: NaiveDate,
    ) -> PortResult<u32> {
        let count: Option<i32> =
            sqlx::query_scalar("SELECT count FROM generation_logs WHERE user_id = $1 AND day = $2")
                .bind(owner_id)
                .bind(day)
                .fetch_optional(executor)
                .await
                .map_err(unexpected)?;
        Ok(count.map(to_count).unwrap_or(0))
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    plan: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let plan = self.plan.parse::<Plan>().map_err(PortError::Unexpected)?;
        Ok(User {
            id: self.id,
            email: self.email,
            plan,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    password_hash: String,
}

#[derive(FromRow)]
struct CollectionRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    is_public: bool,
    max_cards: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CollectionRecord {
    fn to_domain(self) -> Collection {
        Collection {
            id: self.id,
            owner_id: self.user_id,
            name: self.name,
            description: self.description,
            is_public: self.is_public,
            max_cards: self.max_cards,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FlashcardRecord {
    id: Uuid,
    collection_id: Uuid,
    front: String,
    back: String,
    video_url: Option<String>,
    created_by_generator: bool,
    created_at: DateTime<Utc>,
}
impl FlashcardRecord {
    fn to_domain(self) -> Flashcard {
        Flashcard {
            id: self.id,
            collection_id: self.collection_id,
            front: self.front,
            back: self.back,
            video_url: self.video_url,
            created_by_generator: self.created_by_generator,
            created_at: self.created_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

fn to_count(count: i32) -> u32 {
    u32::try_from(count).unwrap_or(0)
}

fn to_db_count(n: u32) -> PortResult<i32> {
    i32::try_from(n).map_err(|_| PortError::Unexpected(format!("count {} out of range", n)))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        plan: Plan,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, password_hash, plan) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(plan.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                PortError::Conflict(format!("Email {} already registered", email))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(&format!(
            "SELECT {}, password_hash FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("User {}", email)))?;

        Ok(UserCredentials {
            user: record.user.to_domain()?,
            hashed_password: record.password_hash,
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("User {}", user_id)))?
        .to_domain()
    }

    async fn create_collection(
        &self,
        owner_id: Uuid,
        new: NewCollection,
    ) -> PortResult<Collection> {
        let record = sqlx::query_as::<_, CollectionRecord>(&format!(
            "INSERT INTO collections (id, user_id, name, description, is_public, max_cards) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLLECTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.is_public)
        .bind(new.max_cards)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_collection(&self, collection_id: Uuid) -> PortResult<Collection> {
        let record = sqlx::query_as::<_, CollectionRecord>(&format!(
            "SELECT {} FROM collections WHERE id = $1",
            COLLECTION_COLUMNS
        ))
        .bind(collection_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("Collection {}", collection_id)))?;
        Ok(record.to_domain())
    }

    async fn list_collections(&self, owner_id: Uuid) -> PortResult<Vec<Collection>> {
        let records = sqlx::query_as::<_, CollectionRecord>(&format!(
            "SELECT {} FROM collections WHERE user_id = $1 ORDER BY created_at DESC",
            COLLECTION_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_collection(
        &self,
        collection_id: Uuid,
        update: CollectionUpdate,
    ) -> PortResult<Collection> {
        let record = sqlx::query_as::<_, CollectionRecord>(&format!(
            "UPDATE collections SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                is_public = COALESCE($4, is_public), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            COLLECTION_COLUMNS
        ))
        .bind(collection_id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("Collection {}", collection_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_collection(&self, collection_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(collection_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Collection {}", collection_id)));
        }
        Ok(())
    }

    async fn create_flashcard(
        &self,
        collection_id: Uuid,
        new: NewFlashcard,
    ) -> PortResult<Flashcard> {
        let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "INSERT INTO flashcards (id, collection_id, front, back, video_url, created_by_generator) \
             VALUES ($1, $2, $3, $4, $5, FALSE) RETURNING {}",
            FLASHCARD_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(collection_id)
        .bind(&new.front)
        .bind(&new.back)
        .bind(&new.video_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_flashcard(&self, flashcard_id: Uuid) -> PortResult<Flashcard> {
        let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards WHERE id = $1",
            FLASHCARD_COLUMNS
        ))
        .bind(flashcard_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("Flashcard {}", flashcard_id)))?;
        Ok(record.to_domain())
    }

    async fn list_flashcards(&self, collection_id: Uuid) -> PortResult<Vec<Flashcard>> {
        let records = sqlx::query_as::<_, FlashcardRecord>(&format!(
            "SELECT {} FROM flashcards WHERE collection_id = $1 ORDER BY created_at ASC, seq ASC",
            FLASHCARD_COLUMNS
        ))
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_flashcard(&self, flashcard_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = $1")
            .bind(flashcard_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Flashcard {}", flashcard_id)));
        }
        Ok(())
    }

    async fn get_generation_count(&self, owner_id: Uuid, day: NaiveDate) -> PortResult<u32> {
        Self::current_count(&self.pool, owner_id, day).await
    }

    async fn try_consume_generations(
        &self,
        owner_id: Uuid,
        day: NaiveDate,
        n: u32,
        limit: u32,
    ) -> PortResult<QuotaDecision> {
        let charged: Option<i32> = sqlx::query_scalar(CONSUME_SQL)
            .bind(owner_id)
            .bind(day)
            .bind(to_db_count(n)?)
            .bind(to_db_count(limit)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        match charged {
            Some(count) => Ok(QuotaDecision::Allowed {
                used_today: to_count(count),
            }),
            None => Ok(QuotaDecision::Exceeded {
                used_today: Self::current_count(&self.pool, owner_id, day).await?,
            }),
        }
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

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let charged: Option<i32> = sqlx::query_scalar(CONSUME_SQL)
            .bind(owner_id)
            .bind(day)
            .bind(to_db_count(n)?)
            .bind(to_db_count(limit)?)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;

        let Some(used_today) = charged.map(to_count) else {
            tx.rollback().await.map_err(unexpected)?;
            let used_today = Self::current_count(&self.pool, owner_id, day).await?;
            warn!(%owner_id, n, used_today, limit, "Generated batch refused by quota");
            return Ok(BatchOutcome::QuotaExceeded { used_today });
        };

        let mut flashcards = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let record = sqlx::query_as::<_, FlashcardRecord>(&format!(
                "INSERT INTO flashcards (id, collection_id, front, back, created_by_generator) \
                 VALUES ($1, $2, $3, $4, TRUE) RETURNING {}",
                FLASHCARD_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(collection_id)
            .bind(&pair.front)
            .bind(&pair.back)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
            flashcards.push(record.to_domain());
        }

        // Dropping `tx` on any error above rolls back both the charge and the inserts.
        tx.commit().await.map_err(unexpected)?;

        Ok(BatchOutcome::Committed {
            flashcards,
            used_today,
        })
    }
}
