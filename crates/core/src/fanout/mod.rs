//! Concurrent fan-out of one request to every enabled provider and
//! enrichment, joined into a [`ResultMatrix`].
//!
//! One task is spawned per (target language, provider) pair plus one per
//! enabled enrichment. All tasks share a bounded pool of permits, so the
//! number of in-flight adapter calls never exceeds the pool width no matter
//! how many targets a request names. Each task owns its cell; results are
//! placed by key after the join, never by arrival order.

mod matrix;
mod request;

use crate::config::{AppConfig, LanguageDefaults, PoolSize};
use crate::credentials::{CredentialResolver, RequestCredentials};
use crate::enrich::{self, Enricher, GroqExplanation, PonsDefinition};
use crate::translate::{
    self, DeepLTranslator, GoogleTranslator, LingvaTranslator, PonsTranslator, Provider,
    TranslationOutcome,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

pub use matrix::{ProviderOutcomes, ResultMatrix};
pub use request::{RequestError, Toggles, TranslationRequest};

const LOG_TARGET: &str = "fanout";

pub struct Coordinator {
    providers: Vec<Arc<dyn Provider>>,
    enrichers: Vec<Arc<dyn Enricher>>,
    resolver: Arc<dyn CredentialResolver>,
    languages: LanguageDefaults,
    pool: Arc<Semaphore>,
}

impl Coordinator {
    /// A coordinator with no adapters registered.
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        languages: LanguageDefaults,
        pool_size: PoolSize,
    ) -> Self {
        Self {
            providers: Vec::new(),
            enrichers: Vec::new(),
            resolver,
            languages,
            pool: Arc::new(Semaphore::new(pool_size.get())),
        }
    }

    /// DeepL, PONS, Google and Lingva plus the PONS definition and Groq
    /// explanation enrichments.
    pub fn standard(resolver: Arc<dyn CredentialResolver>, config: &AppConfig) -> Self {
        Self::new(resolver, config.languages.clone(), config.pool_size)
            .with_provider(DeepLTranslator::new())
            .with_provider(PonsTranslator::new())
            .with_provider(GoogleTranslator::new())
            .with_provider(LingvaTranslator::new())
            .with_enricher(PonsDefinition::new())
            .with_enricher(GroqExplanation::new())
    }

    pub fn with_provider<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_enricher<E: Enricher + 'static>(mut self, enricher: E) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn enricher_names(&self) -> Vec<&'static str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    /// Translates one request. Fails only when the request itself is
    /// invalid; provider failures end up as outcomes inside the matrix.
    pub async fn run(&self, request: TranslationRequest) -> Result<ResultMatrix, RequestError> {
        let started = Instant::now();
        let plan = request::plan(&request, &self.languages)?;

        let providers: Vec<Arc<dyn Provider>> = self
            .providers
            .iter()
            .filter(|p| request.provider_enabled(p.name()))
            .cloned()
            .collect();
        let enrichers: Vec<Arc<dyn Enricher>> = self
            .enrichers
            .iter()
            .filter(|e| request.enrichment_enabled(e.name()))
            .cloned()
            .collect();

        let services = providers
            .iter()
            .filter_map(|p| p.service())
            .chain(enrichers.iter().map(|e| e.service()));
        let credentials =
            RequestCredentials::resolve(self.resolver.as_ref(), request.user, services).await;

        let text: Arc<str> = Arc::from(plan.text.as_str());

        let mut cell_keys = Vec::with_capacity(plan.targets.len() * providers.len());
        let mut cell_tasks = Vec::with_capacity(plan.targets.len() * providers.len());
        for (target_name, target_code) in &plan.targets {
            for provider in &providers {
                cell_keys.push((target_name.clone(), provider.name()));

                let provider = Arc::clone(provider);
                let pool = Arc::clone(&self.pool);
                let text = Arc::clone(&text);
                let credential = credentials.get(provider.service());
                let (source, target) = (plan.source_code, *target_code);
                cell_tasks.push(tokio::spawn(async move {
                    let Ok(_permit) = pool.acquire_owned().await else {
                        return TranslationOutcome::ProviderError;
                    };
                    translate::translate(provider.as_ref(), &text, source, target, credential).await
                }));
            }
        }

        let mut enrichment_slots = Vec::with_capacity(enrichers.len());
        let mut enrichment_tasks = Vec::with_capacity(enrichers.len());
        for enricher in &enrichers {
            enrichment_slots.push((enricher.slot(), enricher.name()));

            let enricher = Arc::clone(enricher);
            let pool = Arc::clone(&self.pool);
            let text = Arc::clone(&text);
            let credential = credentials.get(Some(enricher.service()));
            let source = plan.source_code;
            enrichment_tasks.push(tokio::spawn(async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return String::new();
                };
                enrich::enrich(enricher.as_ref(), &text, source, credential).await
            }));
        }

        let (cell_results, enrichment_results) =
            futures::future::join(join_all(cell_tasks), join_all(enrichment_tasks)).await;

        let mut matrix = ResultMatrix::new(
            &plan.source_name,
            &plan.text,
            plan.targets.iter().map(|(name, _)| name.as_str()),
        );
        for ((language, provider), joined) in cell_keys.into_iter().zip(cell_results) {
            let outcome = joined.unwrap_or_else(|e| {
                tracing::error!(
                    target: LOG_TARGET,
                    provider,
                    target_lang = %language,
                    error = %e,
                    "translation task failed"
                );
                TranslationOutcome::ProviderError
            });
            matrix.insert(&language, provider, outcome);
        }
        for ((slot, name), joined) in enrichment_slots.into_iter().zip(enrichment_results) {
            let value = joined.unwrap_or_else(|e| {
                tracing::error!(
                    target: LOG_TARGET,
                    enricher = name,
                    error = %e,
                    "enrichment task failed"
                );
                String::new()
            });
            matrix.set_enrichment(slot, value);
        }

        tracing::info!(
            target: LOG_TARGET,
            source = %matrix.source_language,
            targets = plan.targets.len(),
            providers = providers.len(),
            enrichments = enrichers.len(),
            cells = matrix.cell_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out complete"
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, SharedKeys, TrialPolicy};
    use crate::credentials::{Account, InMemoryKeyStore, PolicyResolver, Service, UserId};
    use crate::enrich::EnrichmentSlot;
    use crate::lang::LangCode;
    use crate::translate::{FixedProvider, Reply, TranslateError};
    use chrono::Utc;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct KeyFor(Option<&'static str>, AtomicUsize);

    impl KeyFor {
        fn new(key: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self(key, AtomicUsize::new(0)))
        }
    }

    impl CredentialResolver for KeyFor {
        fn resolve(
            &self,
            _user: Option<UserId>,
            _service: Service,
        ) -> BoxFuture<'_, Option<ApiKey>> {
            self.1.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(self.0.and_then(|k| ApiKey::new(k).ok())).boxed()
        }
    }

    fn coordinator(resolver: Arc<dyn CredentialResolver>) -> Coordinator {
        Coordinator::new(resolver, LanguageDefaults::default(), PoolSize::default())
    }

    #[tokio::test]
    async fn disabled_providers_are_left_out() {
        let c = coordinator(KeyFor::new(None))
            .with_provider(FixedProvider::new("StubA", Reply::Echo))
            .with_provider(FixedProvider::new("StubB", Reply::Echo));
        let request = TranslationRequest::new("Haus")
            .from_language("german")
            .to_languages(["english", "spanish"])
            .with_providers(Toggles::default().with("StubA", true).with("StubB", false));

        let m = c.run(request).await.expect("valid request");
        assert_eq!(m.languages().collect::<Vec<_>>(), vec!["english", "spanish"]);
        for lang in ["english", "spanish"] {
            let cells = &m.translations[lang];
            assert_eq!(cells.keys().collect::<Vec<_>>(), vec!["StubA"]);
        }
        assert_eq!(
            m.outcome("spanish", "StubA"),
            Some(&TranslationOutcome::Success("Haus [de->es]".into()))
        );
        assert_eq!(m.source_language, "german");
        assert_eq!(m.source_text, "Haus");
    }

    #[tokio::test]
    async fn every_cell_is_populated_and_source_never_a_target() {
        let c = coordinator(KeyFor::new(None))
            .with_provider(FixedProvider::new("A", Reply::Echo))
            .with_provider(FixedProvider::new("B", Reply::RateLimited))
            .with_provider(FixedProvider::new("C", Reply::Echo).with_service(Service::DeepL));

        let m = c.run(TranslationRequest::new("Haus")).await.expect("valid request");
        assert_eq!(
            m.languages().collect::<Vec<_>>(),
            vec!["english", "polish", "spanish"]
        );
        assert_eq!(m.cell_count(), 3 * 3);
        for lang in m.languages() {
            assert_eq!(m.outcome(lang, "B"), Some(&TranslationOutcome::RateLimited));
            assert_eq!(m.outcome(lang, "C"), Some(&TranslationOutcome::NoCredential));
        }
    }

    #[tokio::test]
    async fn identical_codes_short_circuit() {
        let echo = FixedProvider::new("A", Reply::Text("network".into()));
        let c = coordinator(KeyFor::new(None)).with_provider(echo.clone());
        let request = TranslationRequest::new("house")
            .from_language("english")
            .to_languages(["elvish"]);

        let m = c.run(request).await.expect("valid request");
        assert_eq!(
            m.outcome("elvish", "A"),
            Some(&TranslationOutcome::Success("house".into()))
        );
        assert_eq!(echo.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failure_still_returns_a_full_matrix() {
        let c = coordinator(KeyFor::new(None))
            .with_provider(
                FixedProvider::new("Slow", Reply::Hang).with_deadline(Duration::from_secs(5)),
            )
            .with_provider(FixedProvider::new("Broken", Reply::Malformed))
            .with_provider(FixedProvider::new("Good", Reply::Text("house".into())));
        let request = TranslationRequest::new("Haus").to_languages(["english"]);

        let m = c.run(request).await.expect("valid request");
        assert_eq!(m.outcome("english", "Slow"), Some(&TranslationOutcome::ProviderError));
        assert_eq!(m.outcome("english", "Broken"), Some(&TranslationOutcome::ProviderError));
        assert_eq!(
            m.outcome("english", "Good"),
            Some(&TranslationOutcome::Success("house".into()))
        );
    }

    #[tokio::test]
    async fn same_request_twice_gives_same_matrix() {
        let c = coordinator(KeyFor::new(Some("k")))
            .with_provider(FixedProvider::new("A", Reply::Echo))
            .with_provider(FixedProvider::new("B", Reply::EchoKey).with_service(Service::Pons));
        let request = TranslationRequest::new("Haus").to_languages(["english", "french"]);

        let first = c.run(request.clone()).await.expect("valid request");
        let second = c.run(request).await.expect("valid request");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn credentials_resolved_once_per_service() {
        let resolver = KeyFor::new(Some("k"));
        let c = coordinator(resolver.clone())
            .with_provider(FixedProvider::new("A", Reply::EchoKey).with_service(Service::DeepL))
            .with_provider(FixedProvider::new("B", Reply::EchoKey).with_service(Service::DeepL))
            .with_provider(FixedProvider::new("C", Reply::Echo));
        let request = TranslationRequest::new("Haus")
            .to_languages(["english", "spanish", "french", "italian"]);

        let m = c.run(request).await.expect("valid request");
        assert_eq!(resolver.1.load(Ordering::SeqCst), 1);
        assert_eq!(
            m.outcome("italian", "B"),
            Some(&TranslationOutcome::Success("Haus@k".into()))
        );
    }

    #[tokio::test]
    async fn personal_key_beats_trial_key() {
        let store = InMemoryKeyStore::default()
            .with_account(Account {
                id: UserId(5),
                username: "ana".into(),
                created_at: Some(Utc::now()),
            })
            .with_key(UserId(5), Service::DeepL, ApiKey::new("personal").expect("key"));
        let shared = SharedKeys {
            deepl: ApiKey::new("shared").ok(),
            ..SharedKeys::default()
        };
        let resolver = Arc::new(PolicyResolver::new(store, shared, TrialPolicy::default()));
        let c = coordinator(resolver)
            .with_provider(
                FixedProvider::new("DeepL", Reply::EchoKey).with_service(Service::DeepL),
            );
        let request = TranslationRequest::new("Haus")
            .to_languages(["english"])
            .for_user(UserId(5));

        let m = c.run(request).await.expect("valid request");
        assert_eq!(
            m.outcome("english", "DeepL"),
            Some(&TranslationOutcome::Success("Haus@personal".into()))
        );
    }

    #[tokio::test]
    async fn empty_text_fails_before_dispatch() {
        let resolver = KeyFor::new(Some("k"));
        let provider = FixedProvider::new("A", Reply::Echo);
        let c = coordinator(resolver.clone()).with_provider(provider.clone());
        assert_eq!(
            c.run(TranslationRequest::new("  ")).await,
            Err(RequestError::EmptyText)
        );
        assert_eq!(provider.calls(), 0);
        assert_eq!(resolver.1.load(Ordering::SeqCst), 0);
    }

    struct Panicking;

    impl Provider for Panicking {
        fn name(&self) -> &'static str {
            "Panicking"
        }

        fn deadline(&self) -> Duration {
            Duration::from_secs(1)
        }

        fn request(
            &self,
            _text: String,
            _source: LangCode,
            _target: LangCode,
            _credential: Option<ApiKey>,
        ) -> BoxFuture<'_, Result<String, TranslateError>> {
            panic!("adapter bug")
        }
    }

    #[tokio::test]
    async fn panicking_adapter_becomes_an_error_cell() {
        let c = coordinator(KeyFor::new(None))
            .with_provider(Panicking)
            .with_provider(FixedProvider::new("Good", Reply::Text("house".into())));
        let request = TranslationRequest::new("Haus").to_languages(["english", "spanish"]);

        let m = c.run(request).await.expect("valid request");
        assert_eq!(m.cell_count(), 4);
        for lang in ["english", "spanish"] {
            assert_eq!(m.outcome(lang, "Panicking"), Some(&TranslationOutcome::ProviderError));
            assert_eq!(
                m.outcome(lang, "Good"),
                Some(&TranslationOutcome::Success("house".into()))
            );
        }
    }

    struct StubEnricher(EnrichmentSlot, &'static str, Service);

    impl Enricher for StubEnricher {
        fn name(&self) -> &'static str {
            self.1
        }

        fn slot(&self) -> EnrichmentSlot {
            self.0
        }

        fn service(&self) -> Service {
            self.2
        }

        fn deadline(&self) -> Duration {
            Duration::from_secs(1)
        }

        fn lookup(
            &self,
            text: String,
            source: LangCode,
            _credential: ApiKey,
        ) -> BoxFuture<'_, Result<String, TranslateError>> {
            futures::future::ready(Ok(format!("{}: {text} ({source})", self.1))).boxed()
        }
    }

    #[tokio::test]
    async fn enrichment_slots_follow_toggles_and_keys() {
        let c = coordinator(KeyFor::new(Some("k")))
            .with_enricher(StubEnricher(EnrichmentSlot::Definition, "Def", Service::Pons))
            .with_enricher(StubEnricher(EnrichmentSlot::Explanation, "Ai", Service::Groq));

        let m = c.run(TranslationRequest::new("Haus")).await.expect("valid request");
        assert_eq!(m.definition.as_deref(), Some("Def: Haus (de)"));
        assert_eq!(m.explanation.as_deref(), Some("Ai: Haus (de)"));

        let request = TranslationRequest::new("Haus")
            .with_enrichments(Toggles::default().with("Ai", false));
        let m = c.run(request).await.expect("valid request");
        assert!(m.definition.is_some());
        assert_eq!(m.explanation, None);

        let keyless = coordinator(KeyFor::new(None))
            .with_enricher(StubEnricher(EnrichmentSlot::Definition, "Def", Service::Pons));
        let m = keyless.run(TranslationRequest::new("Haus")).await.expect("valid request");
        assert_eq!(m.definition.as_deref(), Some(""));
    }

    /// Tracks the highest number of overlapping calls.
    #[derive(Clone)]
    struct Gauge {
        name: &'static str,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Provider for Gauge {
        fn name(&self) -> &'static str {
            self.name
        }

        fn deadline(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn request(
            &self,
            text: String,
            _source: LangCode,
            _target: LangCode,
            _credential: Option<ApiKey>,
        ) -> BoxFuture<'_, Result<String, TranslateError>> {
            async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(text)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pool_bounds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let gauge = |name| Gauge {
            name,
            in_flight: Arc::clone(&in_flight),
            peak: Arc::clone(&peak),
        };
        let c = Coordinator::new(
            KeyFor::new(None),
            LanguageDefaults::default(),
            PoolSize::new(2).expect("non-zero"),
        )
        .with_provider(gauge("A"))
        .with_provider(gauge("B"));
        let request = TranslationRequest::new("Haus").to_languages([
            "english", "spanish", "polish", "french", "italian", "dutch",
        ]);

        let m = c.run(request).await.expect("valid request");
        assert_eq!(m.cell_count(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
