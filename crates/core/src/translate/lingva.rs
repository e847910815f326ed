use crate::config::ApiKey;
use crate::lang::LangCode;
use crate::translate::{check_status, read_json, Provider, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const LOG_TARGET: &str = "translate::lingva";
const INSTANCE_TIMEOUT: Duration = Duration::from_secs(5);
const DEADLINE: Duration = Duration::from_secs(10);

pub const DEFAULT_INSTANCES: [&str; 3] = [
    "https://lingva.ml/api/v1",
    "https://translate.plausibility.cloud/api/v1",
    "https://lingva.garuber.dev/api/v1",
];

/// Public Lingva frontends tried in order; the first usable answer wins.
#[derive(Clone)]
pub struct LingvaTranslator {
    client: Client,
    instances: Vec<String>,
}

impl LingvaTranslator {
    pub fn new() -> Self {
        Self::with_instances(DEFAULT_INSTANCES.iter().map(|s| (*s).to_string()).collect())
    }

    pub fn with_instances(instances: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            instances,
        }
    }

    async fn try_instance(
        &self,
        base_url: &str,
        text: &str,
        source: LangCode,
        target: LangCode,
    ) -> Result<String, TranslateError> {
        let url = format!(
            "{}/{source}/{target}/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(text)
        );
        let response = self.client.get(url).timeout(INSTANCE_TIMEOUT).send().await?;
        let response = check_status(response, &[]).await?;
        let body: LingvaResponse = read_json(response).await?;
        body.translation
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TranslateError::InvalidResponse("empty translation".to_string()))
    }
}

impl Default for LingvaTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct LingvaResponse {
    translation: Option<String>,
}

impl Provider for LingvaTranslator {
    fn name(&self) -> &'static str {
        "Lingva"
    }

    fn deadline(&self) -> Duration {
        DEADLINE
    }

    fn request(
        &self,
        text: String,
        source: LangCode,
        target: LangCode,
        _credential: Option<ApiKey>,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let mut last_error =
                TranslateError::InvalidResponse("no Lingva instance configured".to_string());
            for base_url in &self.instances {
                match self.try_instance(base_url, &text, source, target).await {
                    Ok(translation) => return Ok(translation),
                    // A throttled instance ends the search
                    Err(e @ TranslateError::RateLimited(_)) => return Err(e),
                    Err(e) => {
                        tracing::debug!(
                            target: LOG_TARGET,
                            instance = %base_url,
                            error = %e,
                            "instance failed, trying next"
                        );
                        last_error = e;
                    }
                }
            }
            Err(last_error)
        }
        .boxed()
    }
}
