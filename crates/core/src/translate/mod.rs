mod deepl;
mod fixed;
mod google;
mod lingva;
mod mymemory;
pub(crate) mod pons;

use crate::config::ApiKey;
use crate::credentials::Service;
use crate::lang::LangCode;
use futures::future::BoxFuture;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

pub use deepl::DeepLTranslator;
pub use fixed::{FixedProvider, Reply};
pub use google::GoogleTranslator;
pub use lingva::LingvaTranslator;
pub use mymemory::MyMemoryTranslator;
pub use pons::PonsTranslator;

const LOG_TARGET: &str = "translate";

/// Normalized result of one adapter call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Success(String),
    NoCredential,
    RateLimited,
    ProviderError,
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TranslationOutcome::Success(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for TranslationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationOutcome::Success(text) => f.write_str(text),
            TranslationOutcome::NoCredential => f.write_str("[No API Key]"),
            TranslationOutcome::RateLimited => f.write_str("[Limit]"),
            TranslationOutcome::ProviderError => f.write_str("[Error]"),
        }
    }
}

/// Adapter-internal failure. Converted to a [`TranslationOutcome`] at the
/// adapter boundary and never seen by the coordinator.
#[derive(thiserror::Error, Debug)]
pub enum TranslateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),
    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),
    #[error("credential missing or rejected")]
    MissingCredential,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TranslateError> for TranslationOutcome {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::RateLimited(_) => TranslationOutcome::RateLimited,
            TranslateError::MissingCredential => TranslationOutcome::NoCredential,
            _ => TranslationOutcome::ProviderError,
        }
    }
}

/// One external translation service.
pub trait Provider: Send + Sync {
    /// Display name, also the key used by the per-request enable map.
    fn name(&self) -> &'static str;

    /// Service whose credential backs this provider, if any.
    fn service(&self) -> Option<Service> {
        None
    }

    fn requires_credential(&self) -> bool {
        self.service().is_some()
    }

    fn deadline(&self) -> Duration;

    fn request(
        &self,
        text: String,
        source: LangCode,
        target: LangCode,
        credential: Option<ApiKey>,
    ) -> BoxFuture<'_, Result<String, TranslateError>>;
}

/// Runs one adapter call under the shared contract: identity short-circuit,
/// credential gate, deadline, and error-to-outcome mapping.
pub async fn translate(
    provider: &dyn Provider,
    text: &str,
    source: LangCode,
    target: LangCode,
    credential: Option<ApiKey>,
) -> TranslationOutcome {
    if source == target {
        return TranslationOutcome::Success(text.to_owned());
    }
    if provider.requires_credential() && credential.is_none() {
        tracing::debug!(
            target: LOG_TARGET,
            provider = provider.name(),
            target_lang = target,
            "no credential, skipping"
        );
        return TranslationOutcome::NoCredential;
    }

    let started = Instant::now();
    let deadline = provider.deadline();
    let result = match tokio::time::timeout(
        deadline,
        provider.request(text.to_owned(), source, target, credential),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(TranslateError::Timeout(deadline)),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(translated) => {
            tracing::debug!(
                target: LOG_TARGET,
                provider = provider.name(),
                target_lang = target,
                elapsed_ms,
                "translated"
            );
            TranslationOutcome::Success(translated)
        }
        Err(e) => {
            tracing::warn!(
                target: LOG_TARGET,
                provider = provider.name(),
                target_lang = target,
                elapsed_ms,
                error = %e,
                "provider failed"
            );
            e.into()
        }
    }
}

/// Maps rate-limit statuses and other non-success statuses to errors,
/// passing successful responses through.
pub(crate) async fn check_status(
    response: Response,
    rate_limit_codes: &[u16],
) -> Result<Response, TranslateError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS || rate_limit_codes.contains(&status.as_u16()) {
        return Err(TranslateError::RateLimited(status.as_u16()));
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(TranslateError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, TranslateError> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| TranslateError::InvalidResponse(format!("Failed to parse JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Option<ApiKey> {
        ApiKey::new("k").ok()
    }

    #[tokio::test]
    async fn identical_languages_short_circuit_without_calling_provider() {
        let provider = FixedProvider::new("Stub", Reply::Text("nope".into()));
        let outcome = translate(&provider, "Haus", "de", "de", key()).await;
        assert_eq!(outcome, TranslationOutcome::Success("Haus".into()));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_required_credential_is_reported_without_a_call() {
        let provider =
            FixedProvider::new("Stub", Reply::Text("house".into())).with_service(Service::DeepL);
        let outcome = translate(&provider, "Haus", "de", "en", None).await;
        assert_eq!(outcome, TranslationOutcome::NoCredential);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn errors_map_to_outcomes() {
        let limited = FixedProvider::new("Stub", Reply::RateLimited);
        assert_eq!(
            translate(&limited, "Haus", "de", "en", None).await,
            TranslationOutcome::RateLimited
        );

        let broken = FixedProvider::new("Stub", Reply::Malformed);
        assert_eq!(
            translate(&broken, "Haus", "de", "en", None).await,
            TranslationOutcome::ProviderError
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_overrun_is_a_provider_error() {
        let slow = FixedProvider::new("Slow", Reply::Hang);
        let outcome = translate(&slow, "Haus", "de", "en", None).await;
        assert_eq!(outcome, TranslationOutcome::ProviderError);
        assert_eq!(slow.calls(), 1);
    }

    #[test]
    fn outcome_markers() {
        assert_eq!(TranslationOutcome::NoCredential.to_string(), "[No API Key]");
        assert_eq!(TranslationOutcome::RateLimited.to_string(), "[Limit]");
        assert_eq!(TranslationOutcome::ProviderError.to_string(), "[Error]");
        assert_eq!(TranslationOutcome::Success("house".into()).to_string(), "house");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(TranslationOutcome::Success("house".into()))
            .expect("serializable");
        assert_eq!(json, serde_json::json!({"status": "success", "text": "house"}));
        let json = serde_json::to_value(TranslationOutcome::RateLimited).expect("serializable");
        assert_eq!(json, serde_json::json!({"status": "rate_limited"}));
    }
}
