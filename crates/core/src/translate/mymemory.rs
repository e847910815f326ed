use crate::config::ApiKey;
use crate::lang::LangCode;
use crate::translate::{check_status, read_json, Provider, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const API_URL: &str = "https://api.mymemory.translated.net/get";
const DEADLINE: Duration = Duration::from_secs(5);

/// MyMemory translation memory. Free and keyless.
#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: Client,
    url: String,
}

impl MyMemoryTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.url = format!("{}/get", base_url.trim_end_matches('/'));
        self
    }
}

impl Default for MyMemoryTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseStatus")]
    status: serde_json::Value,
    #[serde(rename = "responseData")]
    data: Option<MyMemoryData>,
}

#[derive(Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// The status arrives as a number or as a numeric string.
fn status_code(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// All-caps answers to mixed-case input are re-capitalised.
fn normalize_case(original: &str, translated: String) -> String {
    let is_upper = |s: &str| s.chars().any(char::is_alphabetic) && s == s.to_uppercase();
    if !is_upper(&translated) || is_upper(original) {
        return translated;
    }
    let lower = translated.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lower,
    }
}

impl Provider for MyMemoryTranslator {
    fn name(&self) -> &'static str {
        "MyMemory"
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
            let langpair = format!("{source}|{target}");
            let url = Url::parse_with_params(
                &self.url,
                &[("q", text.as_str()), ("langpair", langpair.as_str())],
            )?;
            let response = self.client.get(url).timeout(DEADLINE).send().await?;
            let response = check_status(response, &[]).await?;
            let body: MyMemoryResponse = read_json(response).await?;

            match (status_code(&body.status), body.data) {
                (Some(200), Some(data)) => Ok(normalize_case(&text, data.translated_text)),
                (Some(429), _) => Err(TranslateError::RateLimited(429)),
                (status, _) => Err(TranslateError::InvalidResponse(format!(
                    "responseStatus {status:?}"
                ))),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_accepts_numbers_and_strings() {
        assert_eq!(status_code(&json!(200)), Some(200));
        assert_eq!(status_code(&json!("403")), Some(403));
        assert_eq!(status_code(&json!(null)), None);
    }

    #[test]
    fn shouting_is_toned_down() {
        assert_eq!(normalize_case("Haus", "HOUSE".to_string()), "House");
        assert_eq!(normalize_case("UNO", "ONE".to_string()), "ONE");
        assert_eq!(normalize_case("Haus", "house".to_string()), "house");
        assert_eq!(normalize_case("Haus", "123".to_string()), "123");
    }
}
