//! crates/flashcards_core/src/library.rs
//!
//! Collection CRUD and manual flashcard management. Nothing in here touches
//! the generation ledger.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Collection, CollectionUpdate, Flashcard, NewCollection, NewFlashcard, User};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};

pub const MAX_COLLECTION_NAME_LEN: usize = 255;
pub const DEFAULT_MAX_CARDS: i32 = 10;
pub const MAX_CARDS_RANGE: std::ops::RangeInclusive<i32> = 1..=1000;
pub const MAX_FRONT_LEN: usize = 1000;
pub const MAX_BACK_LEN: usize = 5000;

#[derive(Clone)]
pub struct LibraryService {
    db: Arc<dyn DatabaseService>,
}

impl LibraryService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    // --- Collections ---

    pub async fn create_collection(
        &self,
        owner: &User,
        mut new: NewCollection,
    ) -> ServiceResult<Collection> {
        new.name = validate_name(&new.name)?;
        if !MAX_CARDS_RANGE.contains(&new.max_cards) {
            return Err(ServiceError::Validation(format!(
                "max_cards must be between {} and {}",
                MAX_CARDS_RANGE.start(),
                MAX_CARDS_RANGE.end()
            )));
        }
        let collection = self.db.create_collection(owner.id, new).await?;
        info!(user_id = %owner.id, collection_id = %collection.id, "Collection created");
        Ok(collection)
    }

    pub async fn list_collections(&self, owner: &User) -> ServiceResult<Vec<Collection>> {
        Ok(self.db.list_collections(owner.id).await?)
    }

    /// Owners see their own collections; everyone sees public ones.
    pub async fn get_collection(&self, viewer: &User, collection_id: Uuid) -> ServiceResult<Collection> {
        let collection = self.find_collection(collection_id).await?;
        if collection.owner_id != viewer.id && !collection.is_public {
            return Err(collection_not_found(collection_id));
        }
        Ok(collection)
    }

    pub async fn update_collection(
        &self,
        owner: &User,
        collection_id: Uuid,
        mut update: CollectionUpdate,
    ) -> ServiceResult<Collection> {
        self.owned_collection(owner, collection_id).await?;
        if let Some(name) = update.name.take() {
            update.name = Some(validate_name(&name)?);
        }
        Ok(self.db.update_collection(collection_id, update).await?)
    }

    /// Deletes the collection together with all of its flashcards.
    pub async fn delete_collection(&self, owner: &User, collection_id: Uuid) -> ServiceResult<()> {
        self.owned_collection(owner, collection_id).await?;
        self.db.delete_collection(collection_id).await?;
        info!(user_id = %owner.id, %collection_id, "Collection deleted");
        Ok(())
    }

    // --- Flashcards ---

    /// Manual creation. Cards made here are never charged against the quota.
    pub async fn create_flashcard(
        &self,
        owner: &User,
        collection_id: Uuid,
        new: NewFlashcard,
    ) -> ServiceResult<Flashcard> {
        self.owned_collection(owner, collection_id).await?;
        let new = validate_card(new)?;
        Ok(self.db.create_flashcard(collection_id, new).await?)
    }

    pub async fn list_flashcards(
        &self,
        viewer: &User,
        collection_id: Uuid,
    ) -> ServiceResult<Vec<Flashcard>> {
        self.get_collection(viewer, collection_id).await?;
        Ok(self.db.list_flashcards(collection_id).await?)
    }

    pub async fn delete_flashcard(&self, owner: &User, flashcard_id: Uuid) -> ServiceResult<()> {
        let not_found = || ServiceError::NotFound(format!("Flashcard {}", flashcard_id));
        let card = match self.db.get_flashcard(flashcard_id).await {
            Ok(card) => card,
            Err(PortError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        match self.owned_collection(owner, card.collection_id).await {
            Ok(_) => {}
            Err(ServiceError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e),
        }
        self.db.delete_flashcard(flashcard_id).await?;
        Ok(())
    }

    // --- Helpers ---

    async fn find_collection(&self, collection_id: Uuid) -> ServiceResult<Collection> {
        match self.db.get_collection(collection_id).await {
            Ok(collection) => Ok(collection),
            Err(PortError::NotFound(_)) => Err(collection_not_found(collection_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn owned_collection(&self, owner: &User, collection_id: Uuid) -> ServiceResult<Collection> {
        let collection = self.find_collection(collection_id).await?;
        if collection.owner_id != owner.id {
            return Err(collection_not_found(collection_id));
        }
        Ok(collection)
    }
}

fn collection_not_found(collection_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Collection {}", collection_id))
}

fn validate_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_COLLECTION_NAME_LEN {
        return Err(ServiceError::Validation(format!(
            "name must be between 1 and {} characters",
            MAX_COLLECTION_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_card(new: NewFlashcard) -> ServiceResult<NewFlashcard> {
    let front = new.front.trim();
    let back = new.back.trim();
    if front.is_empty() || back.is_empty() {
        return Err(ServiceError::Validation(
            "front and back must not be empty".into(),
        ));
    }
    if front.chars().count() > MAX_FRONT_LEN || back.chars().count() > MAX_BACK_LEN {
        return Err(ServiceError::Validation(format!(
            "front is limited to {} characters and back to {}",
            MAX_FRONT_LEN, MAX_BACK_LEN
        )));
    }
    Ok(NewFlashcard {
        front: front.to_string(),
        back: back.to_string(),
        video_url: new
            .video_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Biology ").unwrap(), "Biology");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn blank_video_url_becomes_none() {
        let card = validate_card(NewFlashcard {
            front: "Mitosis".into(),
            back: "Cell division".into(),
            video_url: Some("  ".into()),
        })
        .unwrap();
        assert_eq!(card.video_url, None);
    }

    #[test]
    fn empty_back_is_rejected() {
        let result = validate_card(NewFlashcard {
            front: "Mitosis".into(),
            back: "".into(),
            video_url: None,
        });
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
