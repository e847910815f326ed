mod definition;
mod explain;

use crate::config::ApiKey;
use crate::credentials::Service;
use crate::lang::LangCode;
use crate::translate::TranslateError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use definition::PonsDefinition;
pub use explain::GroqExplanation;

const LOG_TARGET: &str = "enrich";

/// Where an enrichment lands in the result matrix.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSlot {
    Definition,
    Explanation,
}

/// Lookup keyed only by the source text and language.
pub trait Enricher: Send + Sync {
    /// Display name, also the key used by the per-request enable map.
    fn name(&self) -> &'static str;

    fn slot(&self) -> EnrichmentSlot;

    fn service(&self) -> Service;

    fn deadline(&self) -> Duration;

    fn lookup(
        &self,
        text: String,
        source: LangCode,
        credential: ApiKey,
    ) -> BoxFuture<'_, Result<String, TranslateError>>;
}

/// Runs one enrichment. Every failure, including a missing credential,
/// yields an empty string.
pub async fn enrich(
    enricher: &dyn Enricher,
    text: &str,
    source: LangCode,
    credential: Option<ApiKey>,
) -> String {
    let Some(key) = credential else {
        return String::new();
    };

    let deadline = enricher.deadline();
    let lookup = enricher.lookup(text.to_owned(), source, key);
    let result = match tokio::time::timeout(deadline, lookup).await {
        Ok(result) => result,
        Err(_) => Err(TranslateError::Timeout(deadline)),
    };

    match result {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(
                target: LOG_TARGET,
                enricher = enricher.name(),
                error = %e,
                "enrichment failed"
            );
            String::new()
        }
    }
}
