//! Registration, login and bearer tokens.
//!
//! Passwords are stored as Argon2 PHC strings; tokens are HS256 JWTs carrying
//! the user id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::{
    error::{Error, Result, StoreError},
    model::{AuthSession, NewUser, PublicUser, User},
    store::UserStore,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is unreadable: {e}");
            false
        }
    }
}

/// Runs a CPU-heavy closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {e}")))
}

#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn UserStore>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("store", &self.store)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    pub fn new(store: Arc<dyn UserStore>, secret: &str, token_ttl: Duration) -> Self {
        Self {
            store,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("Name, email and password are required".into()));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(Error::EmailInUse);
        }

        let password = password.to_owned();
        let password_hash = blocking(move || hash_password(&password)).await??;

        let user = self
            .store
            .insert(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => Error::EmailInUse,
                other => Error::Storage(other),
            })?;

        tracing::info!(user_id = %user.id, "registered user");
        self.session(&user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_by_email(&email).await? else {
            return Err(Error::InvalidCredentials);
        };

        let password = password.to_owned();
        let stored = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &stored)).await? {
            return Err(Error::InvalidCredentials);
        }

        self.session(&user)
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: user_id.to_string(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected bearer token: {e}");
                Error::Unauthorized
            })
    }

    fn session(&self, user: &User) -> Result<AuthSession> {
        Ok(AuthSession {
            token: self.issue_token(&user.id)?,
            user: PublicUser::from(user),
        })
    }
}
