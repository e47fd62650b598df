//! HTTP front end for the CAS blob store.
//!
//! Serves `GET` and `PUT` on `/{access_key}/{secret_key}/{key}`. Requests
//! pass an auth gate that compares the two credential segments with the
//! configured pair before the get/put handlers stream bytes to and from a
//! [`cas_store::BlobStore`].

pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Authorizer, CredentialAuthorizer, CredentialPair, Credentials};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::CasServer;
pub use state::AppState;
