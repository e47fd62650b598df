use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// The access/secret pair every request must present.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_key: String,
    pub secret_key: String,
}

impl CredentialPair {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Exact, case-sensitive comparison of both fields.
    pub fn matches(&self, claim: &Credentials) -> bool {
        self.access_key == claim.access_key && self.secret_key == claim.secret_key
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Credentials claimed by a single request.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Decides whether a request's claimed credentials may touch the store.
///
/// Routing only knows how to pull a [`Credentials`] claim out of the
/// request; what counts as valid is up to the implementation.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, credentials: &Credentials) -> ServerResult<()>;
}

/// Authorizes requests whose claim equals the configured [`CredentialPair`].
///
/// The pair is held as an immutable snapshot. Updates build a new pair and
/// swap it in, so a request always compares against one consistent pair
/// even while an operator rotates credentials.
pub struct CredentialAuthorizer {
    current: RwLock<Arc<CredentialPair>>,
}

impl CredentialAuthorizer {
    pub fn new(pair: CredentialPair) -> Self {
        Self {
            current: RwLock::new(Arc::new(pair)),
        }
    }

    /// The pair in effect right now.
    pub fn snapshot(&self) -> Arc<CredentialPair> {
        Arc::clone(&self.current.read().expect("lock poisoned"))
    }

    pub fn replace(&self, pair: CredentialPair) {
        *self.current.write().expect("lock poisoned") = Arc::new(pair);
    }

    pub fn set_access_key(&self, access_key: impl Into<String>) {
        self.update(|pair| pair.access_key = access_key.into());
    }

    pub fn set_secret_key(&self, secret_key: impl Into<String>) {
        self.update(|pair| pair.secret_key = secret_key.into());
    }

    fn update(&self, f: impl FnOnce(&mut CredentialPair)) {
        let mut guard = self.current.write().expect("lock poisoned");
        let mut next = CredentialPair::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}

impl fmt::Debug for CredentialAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAuthorizer")
            .field("current", &self.snapshot())
            .finish()
    }
}

#[async_trait]
impl Authorizer for CredentialAuthorizer {
    async fn authorize(&self, credentials: &Credentials) -> ServerResult<()> {
        if self.snapshot().matches(credentials) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized)
        }
    }
}

/// Credential segments of a `/{access_key}/{secret_key}/...` path.
#[derive(Deserialize)]
pub struct PathCredentials {
    access_key: String,
    secret_key: String,
}

/// Auth gate for the blob routes.
///
/// Runs before the handler. A rejected request gets `401 Unauthorized.`
/// and the handler is never called.
pub async fn require_credentials(
    State(state): State<AppState>,
    Path(claim): Path<PathCredentials>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let credentials = Credentials::new(claim.access_key, claim.secret_key);
    if let Err(e) = state.authorizer.authorize(&credentials).await {
        tracing::debug!(
            access_key = %credentials.access_key,
            method = %request.method(),
            "rejected request credentials"
        );
        return Err(e);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_matches_exactly() {
        let pair = CredentialPair::new("u", "p");
        assert!(pair.matches(&Credentials::new("u", "p")));
        assert!(!pair.matches(&Credentials::new("u", "x")));
        assert!(!pair.matches(&Credentials::new("x", "p")));
        assert!(!pair.matches(&Credentials::new("U", "p")));
        assert!(!pair.matches(&Credentials::new("u", "p ")));
    }

    #[test]
    fn debug_redacts_secret() {
        let pair = CredentialPair::new("alice", "hunter2");
        let debug = format!("{pair:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));

        let claim = format!("{:?}", Credentials::new("bob", "swordfish"));
        assert!(!claim.contains("swordfish"));
    }

    #[tokio::test]
    async fn authorizer_accepts_and_rejects() {
        let auth = CredentialAuthorizer::new(CredentialPair::new("u", "p"));
        auth.authorize(&Credentials::new("u", "p")).await.unwrap();
        let err = auth.authorize(&Credentials::new("u", "x")).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized));
    }

    #[tokio::test]
    async fn setters_swap_snapshot() {
        let auth = CredentialAuthorizer::new(CredentialPair::default());
        let before = auth.snapshot();

        auth.set_access_key("u");
        auth.set_secret_key("p");

        assert_eq!(*before, CredentialPair::default());
        assert_eq!(*auth.snapshot(), CredentialPair::new("u", "p"));
        auth.authorize(&Credentials::new("u", "p")).await.unwrap();

        auth.replace(CredentialPair::new("v", "q"));
        assert!(auth.authorize(&Credentials::new("u", "p")).await.is_err());
        auth.authorize(&Credentials::new("v", "q")).await.unwrap();
    }

    #[test]
    fn concurrent_rotation_never_tears() {
        use std::thread;

        let auth = Arc::new(CredentialAuthorizer::new(CredentialPair::new("a0", "s0")));
        let writer = {
            let auth = Arc::clone(&auth);
            thread::spawn(move || {
                for i in 1..200 {
                    auth.replace(CredentialPair::new(format!("a{i}"), format!("s{i}")));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let auth = Arc::clone(&auth);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let pair = auth.snapshot();
                        assert_eq!(&pair.access_key[1..], &pair.secret_key[1..]);
                    }
                })
            })
            .collect();

        writer.join().expect("writer should not panic");
        for r in readers {
            r.join().expect("reader should not panic");
        }
    }
}
