//! # tutora-client
//!
//! Client library for Tutora front ends.
//!
//! - [`ApiClient`]: typed calls against the REST API (reqwest)
//! - [`Session`]: the signed-in account, with an explicit
//!   hydrate / login / logout lifecycle
//! - [`TokenStore`]: where the bearer token survives restarts

pub mod api;
pub mod error;
pub mod session;
pub mod token_store;

pub use api::{ApiClient, AuthResponse, BookingRequest, Page, Registration, SlotChanges};
pub use error::{ClientError, Result};
pub use session::Session;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
