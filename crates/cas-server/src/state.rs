use std::sync::Arc;

use cas_store::BlobStore;

use crate::auth::Authorizer;

/// Shared state handed to every handler and to the auth gate.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    pub fn new(store: Arc<dyn BlobStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }
}
