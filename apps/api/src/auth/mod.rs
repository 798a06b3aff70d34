//! Account lifecycle: credential hashing, field validation, the user registry,
//! storage and session collaborators, and the HTTP handlers on top of them.

pub mod extract;
pub mod handlers;
pub mod password;
pub mod registry;
pub mod session;
pub mod store;
pub mod validation;

use thiserror::Error;

use crate::auth::store::StoreError;

pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid username/email or password. Please try again.";
pub const DEACTIVATED_MESSAGE: &str = "Your account has been deactivated. Please contact support.";

/// Why a login was refused. Kept distinct internally; `NotFound` and
/// `WrongPassword` share one caller-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    NotFound,
    WrongPassword,
    Deactivated,
}

impl AuthFailureReason {
    pub fn user_message(self) -> &'static str {
        match self {
            AuthFailureReason::NotFound | AuthFailureReason::WrongPassword => {
                INVALID_CREDENTIALS_MESSAGE
            }
            AuthFailureReason::Deactivated => DEACTIVATED_MESSAGE,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username already taken. Please choose a different one.")]
    DuplicateUsername,

    #[error("Email already registered. Please use a different email address.")]
    DuplicateEmail,

    #[error("authentication failed ({0:?})")]
    AuthFailure(AuthFailureReason),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
