//! crates/flashcards_core/src/pipeline.rs
//!
//! The quota-gated generation pipeline:
//! Authorizing -> QuotaChecking -> Generating -> Validating -> Persisting -> Done.
//! Every stage has a terminal failure exit and only the last one has side effects.

use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    BatchOutcome, CardPair, Collection, GenerationMode, GenerationOutcome, GenerationRequest, User,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, FlashcardGenerationService, PortError, ProviderError};
use crate::quota::{daily_limit, quota_status, QuotaLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Authorizing,
    QuotaChecking,
    Generating,
    Validating,
    Persisting,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::Authorizing => "authorizing",
            GenerationStage::QuotaChecking => "quota_checking",
            GenerationStage::Generating => "generating",
            GenerationStage::Validating => "validating",
            GenerationStage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct GenerationPipeline {
    db: Arc<dyn DatabaseService>,
    ledger: QuotaLedger,
    provider: Arc<dyn FlashcardGenerationService>,
}

impl GenerationPipeline {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        ledger: QuotaLedger,
        provider: Arc<dyn FlashcardGenerationService>,
    ) -> Self {
        Self {
            db,
            ledger,
            provider,
        }
    }

    /// Runs one generation request for an already-resolved principal.
    pub async fn generate(
        &self,
        principal: &User,
        request: GenerationRequest,
    ) -> ServiceResult<GenerationOutcome> {
        validate_request(&request)?;

        let collection = self
            .owned_collection(principal, &request)
            .await
            .map_err(|e| failed(GenerationStage::Authorizing, principal, e))?;

        let status = self
            .ledger
            .remaining(principal)
            .await
            .map_err(|e| failed(GenerationStage::QuotaChecking, principal, e.into()))?;
        if status.generated_today >= status.daily_limit {
            return Err(failed(
                GenerationStage::QuotaChecking,
                principal,
                ServiceError::QuotaExceeded {
                    generated_today: status.generated_today,
                    daily_limit: status.daily_limit,
                    remaining: status.remaining,
                },
            ));
        }

        let produced = self
            .call_provider(request.mode, request.content)
            .await
            .map_err(|e| failed(GenerationStage::Generating, principal, e))?;

        let produced_len = produced.len();
        let pairs = normalize_pairs(produced);
        if pairs.is_empty() {
            return Err(failed(
                GenerationStage::Validating,
                principal,
                ServiceError::InvalidOutput,
            ));
        }
        if pairs.len() < produced_len {
            warn!(
                user_id = %principal.id,
                dropped = produced_len - pairs.len(),
                "Dropped incomplete flashcard pairs from provider output"
            );
        }

        let outcome = self
            .ledger
            .consume_with_batch(principal, collection.id, &pairs)
            .await
            .map_err(|e| failed(GenerationStage::Persisting, principal, e.into()))?;

        match outcome {
            BatchOutcome::Committed {
                flashcards,
                used_today,
            } => {
                info!(
                    user_id = %principal.id,
                    collection_id = %collection.id,
                    count = flashcards.len(),
                    used_today,
                    "Generated flashcards persisted"
                );
                Ok(GenerationOutcome {
                    flashcards,
                    generated_today: used_today,
                })
            }
            BatchOutcome::QuotaExceeded { used_today } => {
                let status = quota_status(used_today, daily_limit(principal.plan));
                Err(failed(
                    GenerationStage::Persisting,
                    principal,
                    ServiceError::QuotaExceeded {
                        generated_today: status.generated_today,
                        daily_limit: status.daily_limit,
                        remaining: status.remaining,
                    },
                ))
            }
        }
    }

    async fn owned_collection(
        &self,
        principal: &User,
        request: &GenerationRequest,
    ) -> ServiceResult<Collection> {
        let not_found = || ServiceError::NotFound(format!("Collection {}", request.collection_id));
        let collection = match self.db.get_collection(request.collection_id).await {
            Ok(collection) => collection,
            Err(PortError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        if collection.owner_id != principal.id {
            return Err(not_found());
        }
        Ok(collection)
    }

    /// The provider call runs on its own task. If the request future is dropped
    /// mid-call the task still completes, and its result is discarded unpersisted.
    async fn call_provider(
        &self,
        mode: GenerationMode,
        content: String,
    ) -> ServiceResult<Vec<CardPair>> {
        let provider = Arc::clone(&self.provider);
        let handle = tokio::spawn(async move { provider.generate(mode, &content).await });

        match handle.await {
            Ok(Ok(pairs)) => Ok(pairs),
            Ok(Err(e)) => Err(ServiceError::Provider(e)),
            Err(join_error) => Err(ServiceError::Provider(ProviderError::Transport(
                join_error.to_string(),
            ))),
        }
    }
}

fn failed(stage: GenerationStage, principal: &User, error: ServiceError) -> ServiceError {
    match &error {
        ServiceError::Internal(_) | ServiceError::Provider(_) => {
            warn!(%stage, user_id = %principal.id, error = %error, "Generation failed")
        }
        _ => info!(%stage, user_id = %principal.id, error = %error, "Generation rejected"),
    }
    error
}

/// Checks the content length required by the generation mode.
pub fn validate_request(request: &GenerationRequest) -> ServiceResult<()> {
    let min = request.mode.min_content_len();
    if request.content.trim().chars().count() < min {
        return Err(ServiceError::Validation(format!(
            "content must be at least {} characters",
            min
        )));
    }
    Ok(())
}

/// Trims both sides of every pair and drops pairs with an empty side.
pub fn normalize_pairs(pairs: Vec<CardPair>) -> Vec<CardPair> {
    pairs
        .into_iter()
        .filter_map(|pair| {
            let front = pair.front.trim();
            let back = pair.back.trim();
            if front.is_empty() || back.is_empty() {
                None
            } else {
                Some(CardPair::new(front, back))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(mode: GenerationMode, content: &str) -> GenerationRequest {
        GenerationRequest {
            mode,
            content: content.to_string(),
            collection_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn topic_needs_ten_characters() {
        assert!(validate_request(&request(GenerationMode::Topic, "Cells")).is_err());
        assert!(validate_request(&request(GenerationMode::Topic, "Photosynthesis")).is_ok());
    }

    #[test]
    fn text_needs_one_non_blank_character() {
        assert!(validate_request(&request(GenerationMode::Text, "   ")).is_err());
        assert!(validate_request(&request(GenerationMode::Text, "a")).is_ok());
    }

    #[test]
    fn incomplete_pairs_are_dropped_and_the_rest_trimmed() {
        let pairs = vec![
            CardPair::new("  ATP ", " energy currency "),
            CardPair::new("", "orphan definition"),
            CardPair::new("Chlorophyll", "   "),
            CardPair::new("Stomata", "leaf pores"),
        ];

        let normalized = normalize_pairs(pairs);

        assert_eq!(
            normalized,
            vec![
                CardPair::new("ATP", "energy currency"),
                CardPair::new("Stomata", "leaf pores"),
            ]
        );
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(GenerationStage::QuotaChecking.to_string(), "quota_checking");
    }
}
