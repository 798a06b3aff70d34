//! User registry: owns the account lifecycle.
//!
//! Uniqueness is checked before the insert without a transaction around the
//! pair, so two concurrent registrations can both pass the check. The table
//! constraints catch the loser and its violation is reported as the same
//! duplicate error the check would have produced.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::password::CredentialManager;
use crate::auth::store::{StoreError, UniqueField, UserStore};
use crate::auth::{AuthError, AuthFailureReason};
use crate::models::user::{NewUserRecord, User};

/// Raw registration input, before normalization.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Uppercases the first letter of every word and lowercases the rest,
/// where a word is a run of alphabetic characters ("o'neil" -> "O'Neil").
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.trim().chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[derive(Clone)]
pub struct UserRegistry {
    store: Arc<dyn UserStore>,
    credentials: CredentialManager,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn UserStore>, credentials: CredentialManager) -> Self {
        Self { store, credentials }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Creates an account. Username conflicts are reported before e-mail
    /// conflicts.
    pub async fn register(&self, account: NewAccount) -> Result<User, AuthError> {
        let username = normalize_identifier(&account.username);
        let email = normalize_identifier(&account.email);

        if self.store.find_by_username(&username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let record = NewUserRecord {
            password_hash: self.credentials.hash_password(&account.password)?,
            username,
            email,
            first_name: title_case(&account.first_name),
            last_name: title_case(&account.last_name),
        };

        let user = self.store.insert(record).await.map_err(|e| match e {
            StoreError::UniqueViolation(UniqueField::Username) => AuthError::DuplicateUsername,
            StoreError::UniqueViolation(UniqueField::Email) => AuthError::DuplicateEmail,
            other => AuthError::Storage(other),
        })?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Looks the identifier up as a username first, then as an e-mail.
    /// The password is checked before the active flag.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = normalize_identifier(identifier);

        let user = match self.store.find_by_username(&identifier).await? {
            Some(user) => Some(user),
            None => self.store.find_by_email(&identifier).await?,
        };

        let Some(user) = user else {
            info!("Login rejected: no account for {identifier:?}");
            return Err(AuthError::AuthFailure(AuthFailureReason::NotFound));
        };

        if !self.credentials.verify_password(password, &user.password_hash) {
            info!("Login rejected: wrong password for {}", user.username);
            return Err(AuthError::AuthFailure(AuthFailureReason::WrongPassword));
        }

        if !user.is_active {
            warn!("Login rejected: account {} is deactivated", user.username);
            return Err(AuthError::AuthFailure(AuthFailureReason::Deactivated));
        }

        Ok(user)
    }

    /// Stamps `last_login` with the current time and persists it at once.
    /// Only that column is written, so a copy of `user` loaded before a
    /// concurrent password change or deactivation cannot undo it.
    pub async fn record_login(&self, user: &mut User) -> Result<(), AuthError> {
        let now = Utc::now();
        self.store.touch_last_login(user.id, now).await?;
        user.last_login = Some(now);
        Ok(())
    }

    pub async fn change_password(
        &self,
        user: &mut User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !self
            .credentials
            .verify_password(current_password, &user.password_hash)
        {
            return Err(AuthError::AuthFailure(AuthFailureReason::WrongPassword));
        }
        let digest = self.credentials.hash_password(new_password)?;
        self.store.set_password_hash(user.id, &digest).await?;
        user.password_hash = digest;
        info!("Password changed for {}", user.username);
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list().await?)
    }

    /// Registers `account` unless its username is already taken.
    /// Returns the account and whether it was created by this call.
    pub async fn ensure_account(&self, account: NewAccount) -> Result<(User, bool), AuthError> {
        let username = normalize_identifier(&account.username);
        if let Some(existing) = self.store.find_by_username(&username).await? {
            return Ok((existing, false));
        }
        let user = self.register(account).await?;
        Ok((user, true))
    }
}
