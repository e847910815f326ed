use crate::config::ApiKey;
use crate::credentials::Service;
use crate::enrich::{EnrichmentSlot, Enricher};
use crate::lang::{LangCode, Language};
use crate::translate::{check_status, read_json, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const MODEL: &str = "llama-3.1-8b-instant";
const TEMPERATURE: f32 = 0.3;
/// Enough for two short sentences.
const MAX_TOKENS: u32 = 100;
const DEADLINE: Duration = Duration::from_secs(10);

/// Two-sentence explanation from a Groq-hosted chat model.
#[derive(Clone)]
pub struct GroqExplanation {
    client: Client,
    url: String,
}

impl GroqExplanation {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        self
    }
}

impl Default for GroqExplanation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn prompt(text: &str, source: LangCode) -> String {
    let language = Language::from_code(source)
        .unwrap_or(Language::German)
        .native_name();
    format!("Explain \"{text}\" briefly in {language}. Maximum 2 sentences. No bullet points.")
}

impl Enricher for GroqExplanation {
    fn name(&self) -> &'static str {
        "Groq AI"
    }

    fn slot(&self) -> EnrichmentSlot {
        EnrichmentSlot::Explanation
    }

    fn service(&self) -> Service {
        Service::Groq
    }

    fn deadline(&self) -> Duration {
        DEADLINE
    }

    fn lookup(
        &self,
        text: String,
        source: LangCode,
        credential: ApiKey,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            let request = ChatRequest {
                model: MODEL,
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content: prompt(&text, source),
                }],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            };

            let response = self
                .client
                .post(&self.url)
                .timeout(DEADLINE)
                .bearer_auth(credential.expose())
                .json(&request)
                .send()
                .await?;
            let response = check_status(response, &[]).await?;

            let body: ChatResponse = read_json(response).await?;
            body.choices
                .into_iter()
                .next()
                .map(|c| c.message.content.trim().to_string())
                .ok_or_else(|| {
                    TranslateError::InvalidResponse("no choices in response".to_string())
                })
        }
        .boxed()
    }
}
