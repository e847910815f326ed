use crate::config::ApiKey;
use crate::credentials::Service;
use crate::lang::LangCode;
use crate::translate::{check_status, read_json, Provider, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";
const PRO_API_URL: &str = "https://api.deepl.com/v2/translate";
const DEADLINE: Duration = Duration::from_secs(10);
/// DeepL answers 456 once the character quota is used up.
const QUOTA_EXCEEDED: u16 = 456;

#[derive(Clone)]
pub struct DeepLTranslator {
    client: Client,
    base_url: Option<String>,
}

impl DeepLTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn endpoint(&self, key: &ApiKey) -> String {
        match &self.base_url {
            Some(base) => format!("{}/v2/translate", base.trim_end_matches('/')),
            // Free-tier keys carry a ":fx" suffix and only work on the free host
            None if key.expose().ends_with(":fx") => FREE_API_URL.to_string(),
            None => PRO_API_URL.to_string(),
        }
    }
}

impl Default for DeepLTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct DeepLRequest<'a> {
    text: Vec<String>,
    source_lang: &'a str,
    target_lang: String,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

fn source_code(code: LangCode) -> String {
    code.to_uppercase()
}

/// English and Portuguese targets need a regional variant.
fn target_code(code: LangCode) -> String {
    match code {
        "en" => "EN-US".to_string(),
        "pt" => "PT-PT".to_string(),
        other => other.to_uppercase(),
    }
}

impl Provider for DeepLTranslator {
    fn name(&self) -> &'static str {
        "DeepL"
    }

    fn service(&self) -> Option<Service> {
        Some(Service::DeepL)
    }

    fn deadline(&self) -> Duration {
        DEADLINE
    }

    fn request(
        &self,
        text: String,
        source: LangCode,
        target: LangCode,
        credential: Option<ApiKey>,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let key = credential.ok_or(TranslateError::MissingCredential)?;
            let source_lang = source_code(source);
            let request = DeepLRequest {
                text: vec![text],
                source_lang: &source_lang,
                target_lang: target_code(target),
            };

            let response = self
                .client
                .post(self.endpoint(&key))
                .timeout(DEADLINE)
                .header("Authorization", format!("DeepL-Auth-Key {}", key.expose()))
                .json(&request)
                .send()
                .await?;
            let response = check_status(response, &[QUOTA_EXCEEDED]).await?;

            let body: DeepLResponse = read_json(response).await?;
            body.translations
                .into_iter()
                .next()
                .map(|t| t.text)
                .ok_or_else(|| {
                    TranslateError::InvalidResponse("No translations in response".to_string())
                })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_codes_use_regional_variants() {
        assert_eq!(target_code("en"), "EN-US");
        assert_eq!(target_code("pt"), "PT-PT");
        assert_eq!(target_code("pl"), "PL");
        assert_eq!(source_code("en"), "EN");
    }

    #[test]
    fn free_keys_use_the_free_host() {
        let deepl = DeepLTranslator::new();
        let free = ApiKey::new("abc:fx").expect("key");
        let pro = ApiKey::new("abc").expect("key");
        assert_eq!(deepl.endpoint(&free), FREE_API_URL);
        assert_eq!(deepl.endpoint(&pro), PRO_API_URL);
    }
}
