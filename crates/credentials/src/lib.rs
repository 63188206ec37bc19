//! Call-time credential resolution
//!
//! Database credentials are never part of deploy-time configuration. Instead the
//! caller hands us an opaque secret reference (an ARN, an env var name, ...) and
//! we look it up on every ingestion, decode the `{username, password}` payload,
//! and hand back a [`CredentialBundle`] that lives only as long as the database
//! connection that needs it.
//!
//! Two stores ship with the crate:
//!
//! - [`SecretsManagerStore`] - AWS Secrets Manager (`aws` feature, on by default)
//! - [`EnvSecretStore`] - reads the payload from an environment variable
//!
//! Anything else plugs in through the [`SecretStore`] trait.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use credentials::{CredentialResolver, EnvSecretStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! std::env::set_var("DOC_DB_SECRET", r#"{"username":"raguser","password":"pw"}"#);
//!
//! let resolver = CredentialResolver::new(Arc::new(EnvSecretStore));
//! let creds = resolver.resolve("DOC_DB_SECRET").await.unwrap();
//! assert_eq!(creds.username(), "raguser");
//! # }
//! ```
//!
//! Nothing in here retries or caches. A failed lookup is surfaced as-is so the
//! caller can decide whether the whole ingestion is worth another go.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

mod bundle;
pub mod config;
mod error;
mod store;

pub use crate::bundle::{parse_secret_payload, CredentialBundle};
pub use crate::config::{SecretProvider, SecretsConfig};
pub use crate::error::CredentialError;
pub use crate::store::{EnvSecretStore, SecretStore};
#[cfg(feature = "aws")]
pub use crate::store::SecretsManagerStore;

/// Upper bound for a single secret lookup unless configured otherwise.
pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves secret references into [`CredentialBundle`]s.
///
/// Cheap to clone; the store handle is shared and immutable.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    timeout: Duration,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_SECRET_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and decode the secret identified by `reference`.
    pub async fn resolve(&self, reference: &str) -> Result<CredentialBundle, CredentialError> {
        let start = Instant::now();
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(CredentialError::SecretUnavailable(
                "secret reference is empty".into(),
            ));
        }

        let result = match tokio::time::timeout(self.timeout, self.store.fetch_secret(reference))
            .await
        {
            Ok(fetched) => fetched.and_then(|payload| parse_secret_payload(&payload)),
            Err(_) => Err(CredentialError::SecretUnavailable(format!(
                "secret lookup timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(_) => debug!(
                store = self.store.name(),
                secret_ref = %reference,
                elapsed_micros,
                "credentials_resolved"
            ),
            Err(err) => warn!(
                store = self.store.name(),
                secret_ref = %reference,
                error = %err,
                elapsed_micros,
                "credentials_failure"
            ),
        }
        result
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        payload: Result<String, CredentialError>,
        calls: AtomicUsize,
    }

    impl FixedStore {
        fn ok(payload: &str) -> Self {
            Self {
                payload: Ok(payload.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: CredentialError) -> Self {
            Self {
                payload: Err(err),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SecretStore for FixedStore {
        async fn fetch_secret(&self, _reference: &str) -> Result<String, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct SlowStore;

    #[async_trait]
    impl SecretStore for SlowStore {
        async fn fetch_secret(&self, _reference: &str) -> Result<String, CredentialError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(r#"{"username":"u","password":"p"}"#.into())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn resolves_well_formed_secret() {
        let store = Arc::new(FixedStore::ok(r#"{"username":"u","password":"p"}"#));
        let resolver = CredentialResolver::new(store.clone());

        let creds = resolver.resolve("arn:aws:secretsmanager:db").await.unwrap();

        assert_eq!(creds.username(), "u");
        assert_eq!(creds.password(), "p");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_resolve_hits_the_store() {
        let store = Arc::new(FixedStore::ok(r#"{"username":"u","password":"p"}"#));
        let resolver = CredentialResolver::new(store.clone());

        resolver.resolve("ref").await.unwrap();
        resolver.resolve("ref").await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store = Arc::new(FixedStore::failing(CredentialError::SecretUnavailable(
            "dns failure".into(),
        )));
        let err = CredentialResolver::new(store).resolve("ref").await.unwrap_err();
        assert_eq!(
            err,
            CredentialError::SecretUnavailable("dns failure".into())
        );
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let store = Arc::new(FixedStore::ok(r#"{"username":"u"}"#));
        let err = CredentialResolver::new(store).resolve("ref").await.unwrap_err();
        assert!(matches!(err, CredentialError::SecretMalformed(_)));
    }

    #[tokio::test]
    async fn empty_reference_skips_the_store() {
        let store = Arc::new(FixedStore::ok(r#"{"username":"u","password":"p"}"#));
        let err = CredentialResolver::new(store.clone())
            .resolve("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::SecretUnavailable(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out_as_unavailable() {
        let resolver =
            CredentialResolver::new(Arc::new(SlowStore)).with_timeout(Duration::from_millis(250));
        let err = resolver.resolve("ref").await.unwrap_err();
        assert_eq!(
            err,
            CredentialError::SecretUnavailable("secret lookup timed out after 250ms".into())
        );
    }
}
