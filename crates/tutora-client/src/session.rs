//! The signed-in account on the client side.
//!
//! A [`Session`] starts empty. [`Session::hydrate`] restores it from the
//! persisted token, `login`/`register` establish it, and `logout` (or a
//! token the server no longer accepts) tears it down again, clearing the
//! [`TokenStore`] as well.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, info, warn};
use tutora_store::{Account, ProfileUpdate};

use crate::api::{ApiClient, AuthResponse, Registration};
use crate::error::{ClientError, Result};
use crate::token_store::TokenStore;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Read `exp` from a token without checking its signature. The server
/// remains the authority; this only avoids sending tokens that are
/// certainly dead.
fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

fn is_expired(token: &str, now: i64) -> bool {
    token_expiry(token).map_or(true, |exp| exp <= now)
}

pub struct Session<S: TokenStore> {
    client: ApiClient,
    store: S,
    account: Option<Account>,
}

impl<S: TokenStore> Session<S> {
    pub fn new(client: ApiClient, store: S) -> Self {
        Self {
            client,
            store,
            account: None,
        }
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    /// Authenticated client for calls outside the session lifecycle.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Restore the session from the persisted token.
    ///
    /// Expired, unreadable or rejected tokens are discarded and the session
    /// stays signed out. Transport errors are returned and leave the stored
    /// token in place.
    pub async fn hydrate(&mut self) -> Result<Option<&Account>> {
        let Some(token) = self.store.load().await? else {
            return Ok(None);
        };

        if is_expired(&token, Utc::now().timestamp()) {
            debug!("Stored token expired");
            self.teardown().await?;
            return Ok(None);
        }

        self.client.set_token(Some(token));
        match self.client.me().await {
            Ok(account) => {
                info!(account = %account.id, "Session restored");
                self.account = Some(account);
                Ok(self.account.as_ref())
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Stored token rejected by server");
                self.teardown().await?;
                Ok(None)
            }
            Err(e) => {
                self.client.set_token(None);
                Err(e)
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Account> {
        let auth = self.client.login(email, password).await?;
        self.establish(auth).await
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<&Account> {
        let auth = self.client.register(registration).await?;
        self.establish(auth).await
    }

    pub async fn logout(&mut self) -> Result<()> {
        if let Some(account) = &self.account {
            info!(account = %account.id, "Signed out");
        }
        self.teardown().await
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&Account> {
        if self.account.is_none() {
            return Err(ClientError::NotAuthenticated);
        }
        let account = self.client.update_profile(update).await?;
        self.account = Some(account);
        self.account.as_ref().ok_or(ClientError::NotAuthenticated)
    }

    async fn establish(&mut self, auth: AuthResponse) -> Result<&Account> {
        self.store.save(&auth.token).await?;
        self.client.set_token(Some(auth.token));
        info!(account = %auth.account.id, "Signed in");
        self.account = Some(auth.account);
        self.account.as_ref().ok_or(ClientError::NotAuthenticated)
    }

    async fn teardown(&mut self) -> Result<()> {
        self.account = None;
        self.client.set_token(None);
        self.store.clear().await
    }
}
