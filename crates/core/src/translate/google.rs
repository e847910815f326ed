use crate::config::ApiKey;
use crate::credentials::Service;
use crate::lang::LangCode;
use crate::translate::{check_status, read_json, Provider, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const OFFICIAL_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";
const FREE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
const OFFICIAL_DEADLINE: Duration = Duration::from_secs(8);
const FREE_DEADLINE: Duration = Duration::from_secs(5);

/// Google Cloud Translation v2 when a key is available, the keyless
/// `translate_a` endpoint otherwise.
#[derive(Clone)]
pub struct GoogleTranslator {
    client: Client,
    official_url: String,
    free_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            official_url: OFFICIAL_API_URL.to_string(),
            free_url: FREE_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        let base = base_url.trim_end_matches('/');
        self.official_url = format!("{base}/language/translate/v2");
        self.free_url = format!("{base}/translate_a/single");
        self
    }

    async fn official(
        &self,
        text: &str,
        source: LangCode,
        target: LangCode,
        key: &ApiKey,
    ) -> Result<String, TranslateError> {
        let url = Url::parse_with_params(
            &self.official_url,
            &[
                ("key", key.expose()),
                ("q", text),
                ("source", source),
                ("target", target),
                ("format", "text"),
            ],
        )?;
        let response = self
            .client
            .post(url)
            .timeout(OFFICIAL_DEADLINE)
            .send()
            .await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(TranslateError::MissingCredential);
        }
        let response = check_status(response, &[]).await?;

        let body: OfficialResponse = read_json(response).await?;
        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| {
                TranslateError::InvalidResponse("No translations in response".to_string())
            })
    }

    async fn free(
        &self,
        text: &str,
        source: LangCode,
        target: LangCode,
    ) -> Result<String, TranslateError> {
        let url = Url::parse_with_params(
            &self.free_url,
            &[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )?;
        let response = self.client.get(url).timeout(FREE_DEADLINE).send().await?;
        let response = check_status(response, &[]).await?;
        let body: serde_json::Value = read_json(response).await?;
        join_segments(&body)
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct OfficialResponse {
    data: OfficialData,
}

#[derive(Deserialize)]
struct OfficialData {
    #[serde(default)]
    translations: Vec<OfficialTranslation>,
}

#[derive(Deserialize)]
struct OfficialTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// The keyless endpoint answers with nested arrays; the first element holds
/// `[translated, original, ...]` segments.
fn join_segments(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::InvalidResponse("missing segment list".to_string()))?;
    let joined: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
        .collect();
    if joined.is_empty() {
        return Err(TranslateError::InvalidResponse("empty translation".to_string()));
    }
    Ok(joined)
}

impl Provider for GoogleTranslator {
    fn name(&self) -> &'static str {
        "Google"
    }

    fn service(&self) -> Option<Service> {
        Some(Service::Google)
    }

    fn requires_credential(&self) -> bool {
        false
    }

    fn deadline(&self) -> Duration {
        OFFICIAL_DEADLINE
    }

    fn request(
        &self,
        text: String,
        source: LangCode,
        target: LangCode,
        credential: Option<ApiKey>,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            match credential {
                Some(key) => self.official(&text, source, target, &key).await,
                None => self.free(&text, source, target).await,
            }
        }
        .boxed()
    }
}
