use crate::config::ApiKey;
use crate::credentials::Service;
use crate::lang::LangCode;
use crate::translate::{Provider, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FIXED_DEADLINE: Duration = Duration::from_secs(5);

/// What a [`FixedProvider`] answers with.
#[derive(Clone, Debug)]
pub enum Reply {
    Text(String),
    /// `<text> [<source>-><target>]`, handy for offline runs.
    Echo,
    /// `<text>@<credential>`, makes the chosen key visible.
    EchoKey,
    RateLimited,
    Malformed,
    /// Never answers; only the deadline ends the call.
    Hang,
}

/// Provider with a canned answer and no network I/O.
#[derive(Clone)]
pub struct FixedProvider {
    name: &'static str,
    service: Option<Service>,
    reply: Reply,
    deadline: Duration,
    calls: Arc<AtomicUsize>,
}

impl FixedProvider {
    pub fn new(name: &'static str, reply: Reply) -> Self {
        Self {
            name,
            service: None,
            reply,
            deadline: FIXED_DEADLINE,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of requests that got past the identity and credential checks.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for FixedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn service(&self) -> Option<Service> {
        self.service
    }

    fn deadline(&self) -> Duration {
        self.deadline
    }

    fn request(
        &self,
        text: String,
        source: LangCode,
        target: LangCode,
        credential: Option<ApiKey>,
    ) -> BoxFuture<'_, Result<String, TranslateError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            match &self.reply {
                Reply::Text(answer) => Ok(answer.clone()),
                Reply::Echo => Ok(format!("{text} [{source}->{target}]")),
                Reply::EchoKey => {
                    let key = credential.ok_or(TranslateError::MissingCredential)?;
                    Ok(format!("{text}@{}", key.expose()))
                }
                Reply::RateLimited => Err(TranslateError::RateLimited(429)),
                Reply::Malformed => Err(TranslateError::InvalidResponse(
                    "unexpected body".to_string(),
                )),
                Reply::Hang => futures::future::pending().await,
            }
        }
        .boxed()
    }
}
