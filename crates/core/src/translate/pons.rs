use crate::clean;
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

pub(crate) const PONS_API_URL: &str = "https://api.pons.com/v1";
const DEADLINE: Duration = Duration::from_secs(10);

/// Dictionaries PONS serves, named by their two language codes.
const SUPPORTED_PAIRS: [&str; 20] = [
    "deen", "dees", "depl", "enes", "enpl", "espl", "defr", "enfr", "deit", "enit", "esit",
    "frit", "deru", "enru", "denl", "ennl", "dept", "enpt", "espt", "frpt",
];

#[derive(Deserialize, Debug)]
pub(crate) struct PonsLanguageResult {
    #[serde(default)]
    pub hits: Vec<PonsHit>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PonsHit {
    #[serde(default)]
    pub roms: Vec<PonsRom>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PonsRom {
    #[serde(default)]
    pub headword_full: String,
    #[serde(default)]
    pub wordclass: String,
    #[serde(default)]
    pub arabs: Vec<PonsArab>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PonsArab {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub translations: Vec<PonsTranslation>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PonsTranslation {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

/// `src+tgt`, or the reverse when only that dictionary exists.
pub(crate) fn dictionary_pair(source: LangCode, target: LangCode) -> String {
    let pair = format!("{source}{target}");
    let reverse = format!("{target}{source}");
    if !SUPPORTED_PAIRS.contains(&pair.as_str()) && SUPPORTED_PAIRS.contains(&reverse.as_str()) {
        reverse
    } else {
        pair
    }
}

/// Issues one dictionary lookup. `None` means PONS had no entry (HTTP 204).
pub(crate) async fn lookup(
    client: &Client,
    base_url: &str,
    pair: &str,
    text: &str,
    key: &ApiKey,
) -> Result<Option<Vec<PonsLanguageResult>>, TranslateError> {
    let url = Url::parse_with_params(
        &format!("{}/dictionary", base_url.trim_end_matches('/')),
        &[("l", pair), ("q", text)],
    )?;
    let response = client
        .get(url)
        .timeout(DEADLINE)
        .header("X-Secret", key.expose())
        .send()
        .await?;
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    let response = check_status(response, &[]).await?;
    Ok(Some(read_json(response).await?))
}

/// First translation of every sense, as `(source, target)` fragments.
fn sense_pairs(results: &[PonsLanguageResult]) -> impl Iterator<Item = (&str, &str)> {
    results
        .iter()
        .take(1)
        .flat_map(|lang| &lang.hits)
        .flat_map(|hit| &hit.roms)
        .flat_map(|rom| &rom.arabs)
        .filter_map(|arab| arab.translations.first())
        .map(|t| (t.source.as_str(), t.target.as_str()))
}

#[derive(Clone)]
pub struct PonsTranslator {
    client: Client,
    base_url: String,
}

impl PonsTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: PONS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for PonsTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for PonsTranslator {
    fn name(&self) -> &'static str {
        "PONS"
    }

    fn service(&self) -> Option<Service> {
        Some(Service::Pons)
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
            let pair = dictionary_pair(source, target);
            let results = lookup(&self.client, &self.base_url, &pair, &text, &key)
                .await?
                .ok_or_else(|| TranslateError::InvalidResponse(format!("no entry for {text:?}")))?;

            let cleaned = clean::clean_translations(sense_pairs(&results));
            if cleaned.is_empty() {
                return Err(TranslateError::InvalidResponse(
                    "no usable translations in entry".to_string(),
                ));
            }
            Ok(cleaned.join(", "))
        }
        .boxed()
    }
}
