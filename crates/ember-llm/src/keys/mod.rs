//! Credential sources and scoped borrowing
//!
//! A model never holds a raw key; it asks its provider for a
//! [`CredentialLease`] per request and drops the lease when the upstream
//! exchange is over. Pool members go back to their pool at that point.

mod pool;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ember_core::RequestContext;
use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};

pub use pool::PoolKeyProvider;
use pool::PoolSlot;

use crate::error::{ConfigError, LlmError};

/// An upstream credential held exclusively for one request
#[derive(Debug)]
pub struct CredentialLease {
    key: SecretString,
    slots: Vec<PoolSlot>,
}

impl CredentialLease {
    fn new(key: SecretString) -> Self {
        Self { key, slots: Vec::new() }
    }

    /// The secret itself; never log the returned value
    pub fn expose(&self) -> &str {
        self.key.expose_secret()
    }

    /// A clone of the secret
    pub fn secret(&self) -> SecretString {
        self.key.clone()
    }
}

/// Source of upstream credentials
#[derive(Debug)]
pub enum KeyProvider {
    /// Secret baked into configuration
    Literal(SecretString),
    /// Secret read from the environment at startup
    Environment { var: String, key: SecretString },
    /// Round-robin over nested providers
    Union(UnionKeyProvider),
    /// Exclusive leases over nested providers
    Pool(PoolKeyProvider),
}

impl KeyProvider {
    pub const fn literal(key: SecretString) -> Self {
        Self::Literal(key)
    }

    /// Read `var` from the environment once
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if the variable is unset or empty
    pub fn environment(var: &str) -> Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Self::Environment {
                var: var.to_owned(),
                key: SecretString::from(value),
            }),
            _ => Err(ConfigError::MissingEnvVar { var: var.to_owned() }),
        }
    }

    pub fn union(members: Vec<Arc<Self>>) -> Self {
        Self::Union(UnionKeyProvider::new(members))
    }

    pub fn pool(members: Vec<Arc<Self>>, timeout: Option<Duration>) -> Self {
        Self::Pool(PoolKeyProvider::new(members, timeout))
    }

    /// Borrow one credential until the returned lease is dropped
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Cancelled` if the request is cancelled before a
    /// credential is obtained, or `LlmError::NoCredential` if no source can
    /// provide one
    pub fn acquire<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<CredentialLease, LlmError>> {
        Box::pin(async move {
            if ctx.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            match self {
                Self::Literal(key) | Self::Environment { key, .. } => Ok(CredentialLease::new(key.clone())),
                Self::Union(union) => union.acquire(ctx).await,
                Self::Pool(pool) => pool.acquire(ctx).await,
            }
        })
    }

    /// Run `f` with an exclusively held credential
    ///
    /// The credential is released once the future returned by `f` settles,
    /// whatever its outcome.
    ///
    /// # Errors
    ///
    /// Propagates acquisition errors and whatever `f` returns
    pub async fn with_credential<T, F, Fut>(&self, ctx: &RequestContext, f: F) -> Result<T, LlmError>
    where
        F: FnOnce(SecretString) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let lease = self.acquire(ctx).await?;
        let result = f(lease.secret()).await;
        drop(lease);
        result
    }

    /// Number of direct members for composite providers, 1 otherwise
    pub fn len(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Environment { .. } => 1,
            Self::Union(union) => union.members.len(),
            Self::Pool(pool) => pool.len(),
        }
    }

    /// Whether acquiring from this provider can never succeed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Round-robin over nested providers
///
/// Every borrow advances the cursor by one, so a fixed member set cycles
/// deterministically.
#[derive(Debug)]
pub struct UnionKeyProvider {
    members: Vec<Arc<KeyProvider>>,
    cursor: AtomicUsize,
}

impl UnionKeyProvider {
    pub const fn new(members: Vec<Arc<KeyProvider>>) -> Self {
        Self {
            members,
            cursor: AtomicUsize::new(0),
        }
    }

    async fn acquire(&self, ctx: &RequestContext) -> Result<CredentialLease, LlmError> {
        if self.members.is_empty() {
            return Err(LlmError::NoCredential);
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.members.len();
        self.members[index].acquire(ctx).await
    }
}
