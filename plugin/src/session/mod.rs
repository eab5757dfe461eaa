//! Session-scoped client cache
//!
//! One `Connection` exists per `connection.configure`. It owns the resolved
//! credentials and every token source and API client built from them, keyed
//! by service and scope set. Entries are built lazily and never evicted.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use googleworkspace_protocol::ConnectionConfig;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use crate::auth::{resolve_credentials, ResolvedCredentials, TokenSource};
use crate::common::{create_http_client, AppResult};
use crate::google::{
    scopes, CalendarApi, DocsApi, DriveApi, GmailApi, GoogleClient, PeopleApi, ReportsApi, Service, SheetsApi,
};

const TOKEN_SOURCE_PREFIX: &str = "token_source";

/// Cache key: a prefix plus the normalized scope set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prefix: &str, scopes: &[&str]) -> Self {
        let scopes = normalize_scopes(scopes);
        if scopes.is_empty() {
            Self(prefix.to_string())
        } else {
            Self(format!("{}:{}", prefix, scopes.join(",")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted and de-duplicated.
pub fn normalize_scopes(scopes: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
    out.sort();
    out.dedup();
    out
}

/// Map of lazily built values, at most one construction per key.
pub struct KeyedCache<V> {
    entries: RwLock<HashMap<CacheKey, Arc<OnceCell<V>>>>,
}

impl<V: Clone> KeyedCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn cell(&self, key: &CacheKey) -> Arc<OnceCell<V>> {
        if let Some(cell) = self.entries.read().await.get(key) {
            return cell.clone();
        }
        self.entries
            .write()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Return the cached value for `key`, building it with `factory` on first use.
    ///
    /// Concurrent callers for the same key wait on a single factory run. A
    /// failed build leaves the key empty so the next call tries again.
    pub async fn get_or_create<F, Fut>(&self, key: &CacheKey, factory: F) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        let cell = self.cell(key).await;
        cell.get_or_try_init(factory).await.cloned()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.entries.read().await.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of keys with a built value.
    pub async fn len(&self) -> usize {
        self.entries.read().await.values().filter(|c| c.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone> Default for KeyedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct SessionCache {
    pub token_sources: KeyedCache<Arc<dyn TokenSource>>,
    pub clients: KeyedCache<Arc<GoogleClient>>,
}

/// Per-connection context handed to every table scan.
pub struct Connection {
    config: ConnectionConfig,
    http: reqwest::Client,
    api_root: Option<String>,
    credentials: OnceCell<ResolvedCredentials>,
    cache: SessionCache,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> AppResult<Self> {
        Ok(Self {
            config,
            http: create_http_client()?,
            api_root: None,
            credentials: OnceCell::new(),
            cache: SessionCache::default(),
        })
    }

    /// Send every API call to `root` instead of the Google hosts.
    pub fn with_api_root(mut self, root: impl Into<String>) -> Self {
        self.api_root = Some(root.into());
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Resolve credentials once per connection.
    pub async fn credentials(&self) -> AppResult<&ResolvedCredentials> {
        self.credentials
            .get_or_try_init(|| resolve_credentials(&self.config))
            .await
    }

    pub async fn token_source(&self, scopes: &[&str]) -> AppResult<Arc<dyn TokenSource>> {
        let key = CacheKey::new(TOKEN_SOURCE_PREFIX, scopes);
        self.cache
            .token_sources
            .get_or_create(&key, || async {
                let credentials = self.credentials().await?;
                debug!("Creating token source {}", key);
                Ok(credentials.token_source(&normalize_scopes(scopes), self.http.clone()))
            })
            .await
    }

    /// Authenticated client for `service` under the given scopes.
    pub async fn client(&self, service: Service, scopes: &[&str]) -> AppResult<Arc<GoogleClient>> {
        let prefix = format!("googleworkspace.{}", service.name());
        let key = CacheKey::new(&prefix, scopes);
        self.cache
            .clients
            .get_or_create(&key, || async {
                let token_source = self.token_source(scopes).await?;
                let base_url = service.base_url(self.api_root.as_deref());
                debug!("Creating {} client at {}", service.name(), base_url);
                Ok(Arc::new(GoogleClient::new(self.http.clone(), token_source, base_url)))
            })
            .await
    }

    pub async fn calendar(&self) -> AppResult<CalendarApi> {
        Ok(CalendarApi::new(self.client(Service::Calendar, scopes::DEFAULT).await?))
    }

    pub async fn drive(&self) -> AppResult<DriveApi> {
        Ok(DriveApi::new(self.client(Service::Drive, scopes::DEFAULT).await?))
    }

    pub async fn gmail(&self) -> AppResult<GmailApi> {
        Ok(GmailApi::new(self.client(Service::Gmail, scopes::DEFAULT).await?))
    }

    pub async fn people(&self) -> AppResult<PeopleApi> {
        Ok(PeopleApi::new(self.client(Service::People, scopes::DEFAULT).await?))
    }

    pub async fn docs(&self) -> AppResult<DocsApi> {
        Ok(DocsApi::new(self.client(Service::Docs, scopes::DEFAULT).await?))
    }

    pub async fn sheets(&self) -> AppResult<SheetsApi> {
        Ok(SheetsApi::new(self.client(Service::Sheets, scopes::DEFAULT).await?))
    }

    pub async fn reports(&self) -> AppResult<ReportsApi> {
        self.reports_with_scope(scopes::ADMIN_REPORTS_AUDIT_READONLY).await
    }

    pub async fn reports_with_scope(&self, scope: &str) -> AppResult<ReportsApi> {
        Ok(ReportsApi::new(self.client(Service::Reports, &[scope]).await?))
    }
}
