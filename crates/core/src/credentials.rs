use crate::config::{ApiKey, SharedKeys, TrialPolicy};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const LOG_TARGET: &str = "credentials";
/// Reported for accounts that never expire.
pub const UNLIMITED_TRIAL_DAYS: i64 = 999;

/// External service a credential is stored for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    DeepL,
    Pons,
    Google,
    Groq,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::DeepL => "deepl",
            Service::Pons => "pons",
            Service::Google => "google",
            Service::Groq => "groq",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    /// Absent for accounts created before creation times were recorded.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("stored key could not be decrypted")]
    Decrypt,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the user/key storage owned by the surrounding application.
pub trait KeyStore: Send + Sync {
    fn stored_key(
        &self,
        user: UserId,
        service: Service,
    ) -> BoxFuture<'_, Result<Option<ApiKey>, StoreError>>;

    fn account(&self, user: UserId) -> BoxFuture<'_, Result<Option<Account>, StoreError>>;
}

/// Decides which key, if any, backs a user/service pair.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, user: Option<UserId>, service: Service) -> BoxFuture<'_, Option<ApiKey>>;
}

/// Own key, then shared key during the trial window (or for the admin
/// account), then nothing.
pub struct PolicyResolver<S> {
    store: S,
    shared: SharedKeys,
    trial: TrialPolicy,
}

impl<S: KeyStore> PolicyResolver<S> {
    pub fn new(store: S, shared: SharedKeys, trial: TrialPolicy) -> Self {
        Self {
            store,
            shared,
            trial,
        }
    }

    pub async fn resolve_at(
        &self,
        user: Option<UserId>,
        service: Service,
        now: DateTime<Utc>,
    ) -> Option<ApiKey> {
        let Some(user) = user else {
            return self.shared.get(service).cloned();
        };

        match self.store.stored_key(user, service).await {
            Ok(Some(key)) => {
                tracing::debug!(target: LOG_TARGET, user = user.0, %service, "using stored key");
                return Some(key);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    user = user.0,
                    %service,
                    error = %e,
                    "stored key unusable"
                );
                return None;
            }
        }

        let account = match self.store.account(user).await {
            Ok(Some(account)) => account,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    user = user.0,
                    error = %e,
                    "account lookup failed"
                );
                return None;
            }
        };

        if self.shares_keys_with(&account, now) {
            tracing::debug!(target: LOG_TARGET, user = user.0, %service, "using shared key");
            return self.shared.get(service).cloned();
        }
        None
    }

    fn shares_keys_with(&self, account: &Account, now: DateTime<Utc>) -> bool {
        if is_admin(&self.trial, account) {
            return true;
        }
        match account.created_at {
            None => true,
            Some(created) => now - created < self.trial.trial_length(),
        }
    }
}

impl<S: KeyStore> CredentialResolver for PolicyResolver<S> {
    fn resolve(&self, user: Option<UserId>, service: Service) -> BoxFuture<'_, Option<ApiKey>> {
        self.resolve_at(user, service, Utc::now()).boxed()
    }
}

fn is_admin(trial: &TrialPolicy, account: &Account) -> bool {
    account.id.0 == trial.admin_user_id || account.username == trial.admin_username
}

/// Whole trial days left, 0 once expired. Admins never expire.
pub fn trial_days_remaining(trial: &TrialPolicy, account: &Account, now: DateTime<Utc>) -> i64 {
    if is_admin(trial, account) {
        return UNLIMITED_TRIAL_DAYS;
    }
    match account.created_at {
        None => 0,
        Some(created) => (trial.trial_days - (now - created).num_days()).max(0),
    }
}

/// Keys resolved for one request, one lookup per distinct service.
/// Dropped with the request; never logged.
#[derive(Debug, Default)]
pub struct RequestCredentials {
    keys: HashMap<Service, Option<ApiKey>>,
}

impl RequestCredentials {
    pub async fn resolve<R, I>(resolver: &R, user: Option<UserId>, services: I) -> Self
    where
        R: CredentialResolver + ?Sized,
        I: IntoIterator<Item = Service>,
    {
        let mut keys = HashMap::new();
        for service in services {
            if keys.contains_key(&service) {
                continue;
            }
            let key = resolver.resolve(user, service).await;
            tracing::debug!(
                target: LOG_TARGET,
                %service,
                has_key = key.is_some(),
                "credential resolved"
            );
            keys.insert(service, key);
        }
        Self { keys }
    }

    pub fn get(&self, service: Option<Service>) -> Option<ApiKey> {
        service.and_then(|s| self.keys.get(&s).cloned().flatten())
    }

    pub fn lookups(&self) -> usize {
        self.keys.len()
    }
}

/// In-memory [`KeyStore`] for tests and the command-line front end.
#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyStore {
    accounts: BTreeMap<UserId, Account>,
    keys: BTreeMap<(UserId, Service), ApiKey>,
    undecryptable: Vec<(UserId, Service)>,
}

impl InMemoryKeyStore {
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.id, account);
        self
    }

    /// At most one key per user and service; a second insert replaces the
    /// first.
    pub fn with_key(mut self, user: UserId, service: Service, key: ApiKey) -> Self {
        self.keys.insert((user, service), key);
        self
    }

    pub fn with_undecryptable_key(mut self, user: UserId, service: Service) -> Self {
        self.undecryptable.push((user, service));
        self
    }
}

impl KeyStore for InMemoryKeyStore {
    fn stored_key(
        &self,
        user: UserId,
        service: Service,
    ) -> BoxFuture<'_, Result<Option<ApiKey>, StoreError>> {
        let result = if self.undecryptable.contains(&(user, service)) {
            Err(StoreError::Decrypt)
        } else {
            Ok(self.keys.get(&(user, service)).cloned())
        };
        futures::future::ready(result).boxed()
    }

    fn account(&self, user: UserId) -> BoxFuture<'_, Result<Option<Account>, StoreError>> {
        futures::future::ready(Ok(self.accounts.get(&user).cloned())).boxed()
    }
}
