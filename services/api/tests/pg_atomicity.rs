//! Quota charges against a live PostgreSQL database.
//!
//! These tests need `DATABASE_URL` pointing at a disposable database and are
//! skipped when it is unset. Each test works on its own freshly created users.

mod common;

use api_lib::adapters::DbAdapter;
use common::{day, pairs};
use flashcards_core::ports::DatabaseService;
use flashcards_core::{BatchOutcome, Collection, NewCollection, Plan, QuotaDecision, User};
use futures::future::join_all;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const FREE_LIMIT: u32 = 6;

async fn connect() -> Option<DbAdapter> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    let db = DbAdapter::new(pool);
    db.run_migrations().await.expect("apply migrations");
    Some(db)
}

async fn user(db: &DbAdapter) -> User {
    let email = format!("{}@example.com", Uuid::new_v4().simple());
    db.create_user(&email, "not-a-real-hash", Plan::Free)
        .await
        .unwrap()
}

async fn collection(db: &DbAdapter, owner: &User) -> Collection {
    db.create_collection(
        owner.id,
        NewCollection {
            name: "Chemistry".into(),
            description: None,
            is_public: false,
            max_cards: 100,
        },
    )
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_single_charges_grant_exactly_the_limit() {
    let Some(db) = connect().await else { return };
    let owner = user(&db).await;
    let today = day(2025, 6, 1);

    let attempts = (0..20).map(|_| {
        let (db, owner_id) = (db.clone(), owner.id);
        tokio::spawn(async move {
            db.try_consume_generations(owner_id, today, 1, FREE_LIMIT)
                .await
                .unwrap()
        })
    });
    let decisions: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let granted = decisions
        .iter()
        .filter(|d| matches!(d, QuotaDecision::Allowed { .. }))
        .count();
    assert_eq!(granted, FREE_LIMIT as usize);
    assert!(decisions.iter().all(|d| match d {
        QuotaDecision::Allowed { used_today } => *used_today <= FREE_LIMIT,
        QuotaDecision::Exceeded { used_today } => *used_today == FREE_LIMIT,
    }));
    assert_eq!(db.get_generation_count(owner.id, today).await.unwrap(), FREE_LIMIT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batches_commit_only_while_they_fit() {
    let Some(db) = connect().await else { return };
    let owner = user(&db).await;
    let target = collection(&db, &owner).await;
    let today = day(2025, 6, 1);

    let attempts = (0..10).map(|_| {
        let db = db.clone();
        let (owner_id, collection_id) = (owner.id, target.id);
        tokio::spawn(async move {
            db.persist_generated_batch(owner_id, today, FREE_LIMIT, collection_id, &pairs(2))
                .await
                .unwrap()
        })
    });
    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let committed: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            BatchOutcome::Committed { flashcards, .. } => Some(flashcards.len()),
            BatchOutcome::QuotaExceeded { .. } => None,
        })
        .collect();
    assert_eq!(committed, vec![2, 2, 2]);
    assert_eq!(db.get_generation_count(owner.id, today).await.unwrap(), FREE_LIMIT);

    let stored = db.list_flashcards(target.id).await.unwrap();
    assert_eq!(stored.len(), FREE_LIMIT as usize);
    assert!(stored.iter().all(|c| c.created_by_generator));
}

#[tokio::test]
async fn failed_insert_rolls_back_the_charge() {
    let Some(db) = connect().await else { return };
    let owner = user(&db).await;
    let today = day(2025, 6, 1);
    db.try_consume_generations(owner.id, today, 2, FREE_LIMIT)
        .await
        .unwrap();

    let missing_collection = Uuid::new_v4();
    let result = db
        .persist_generated_batch(owner.id, today, FREE_LIMIT, missing_collection, &pairs(3))
        .await;

    assert!(result.is_err());
    assert_eq!(db.get_generation_count(owner.id, today).await.unwrap(), 2);
}

#[tokio::test]
async fn an_oversized_batch_is_refused_without_touching_the_counter() {
    let Some(db) = connect().await else { return };
    let owner = user(&db).await;
    let target = collection(&db, &owner).await;
    let today = day(2025, 6, 1);

    let outcome = db
        .persist_generated_batch(owner.id, today, FREE_LIMIT, target.id, &pairs(7))
        .await
        .unwrap();

    assert!(matches!(outcome, BatchOutcome::QuotaExceeded { used_today: 0 }));
    assert_eq!(db.get_generation_count(owner.id, today).await.unwrap(), 0);
    assert!(db.list_flashcards(target.id).await.unwrap().is_empty());
}
