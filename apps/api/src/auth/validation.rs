//! Form validation for the account endpoints.
//!
//! Each field has its own validator returning the violations it found; the
//! `*Form::validate` methods compose them so a caller gets every problem in
//! one response instead of the first one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email regex is valid")
});

/// Absent and `null` fields both read as empty, so the field validators
/// report them with their own "is required" messages.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// `Some(violation)` when the trimmed value is empty.
fn required(field: &'static str, value: &str, message: &str) -> Option<FieldViolation> {
    value
        .trim()
        .is_empty()
        .then(|| FieldViolation::new(field, message))
}

fn length_between(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    message: &str,
) -> Option<FieldViolation> {
    let len = char_len(value.trim());
    (len < min || len > max).then(|| FieldViolation::new(field, message))
}

pub fn validate_name(field: &'static str, label: &str, value: &str) -> Vec<FieldViolation> {
    if let Some(v) = required(field, value, &format!("{label} is required.")) {
        return vec![v];
    }
    length_between(
        field,
        value,
        2,
        50,
        &format!("{label} must be between 2 and 50 characters."),
    )
    .into_iter()
    .collect()
}

pub fn validate_username(value: &str) -> Vec<FieldViolation> {
    if let Some(v) = required("username", value, "Username is required.") {
        return vec![v];
    }
    length_between(
        "username",
        value,
        3,
        80,
        "Username must be between 3 and 80 characters.",
    )
    .into_iter()
    .collect()
}

pub fn validate_email(value: &str) -> Vec<FieldViolation> {
    if let Some(v) = required("email", value, "Email is required.") {
        return vec![v];
    }
    let trimmed = value.trim();
    let mut out = Vec::new();
    if !EMAIL_RE.is_match(trimmed) {
        out.push(FieldViolation::new(
            "email",
            "Please enter a valid email address.",
        ));
    }
    if char_len(trimmed) > 120 {
        out.push(FieldViolation::new(
            "email",
            "Email must be less than 120 characters.",
        ));
    }
    out
}

/// Passwords are not trimmed: surrounding spaces are part of the secret.
pub fn validate_new_password(field: &'static str, value: &str, required_msg: &str) -> Vec<FieldViolation> {
    if value.is_empty() {
        return vec![FieldViolation::new(field, required_msg)];
    }
    let len = char_len(value);
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return vec![FieldViolation::new(
            field,
            format!(
                "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters."
            ),
        )];
    }
    Vec::new()
}

pub fn validate_confirmation(
    field: &'static str,
    password: &str,
    confirmation: &str,
    required_msg: &str,
) -> Vec<FieldViolation> {
    if confirmation.is_empty() {
        return vec![FieldViolation::new(field, required_msg)];
    }
    if password != confirmation {
        return vec![FieldViolation::new(field, "Passwords must match.")];
    }
    Vec::new()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(default, deserialize_with = "nullable_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub username: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub password: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub password_confirm: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        out.extend(validate_name("first_name", "First name", &self.first_name));
        out.extend(validate_name("last_name", "Last name", &self.last_name));
        out.extend(validate_username(&self.username));
        out.extend(validate_email(&self.email));
        out.extend(validate_new_password(
            "password",
            &self.password,
            "Password is required.",
        ));
        out.extend(validate_confirmation(
            "password_confirm",
            &self.password,
            &self.password_confirm,
            "Please confirm your password.",
        ));
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default, deserialize_with = "nullable_string")]
    pub username_or_email: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        match required(
            "username_or_email",
            &self.username_or_email,
            "Username or email is required.",
        ) {
            Some(v) => out.push(v),
            None => out.extend(length_between(
                "username_or_email",
                &self.username_or_email,
                3,
                120,
                "Username or email must be between 3 and 120 characters.",
            )),
        }
        if self.password.is_empty() {
            out.push(FieldViolation::new("password", "Password is required."));
        } else if char_len(&self.password) < MIN_PASSWORD_LENGTH {
            out.push(FieldViolation::new(
                "password",
                "Password must be at least 6 characters long.",
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default, deserialize_with = "nullable_string")]
    pub current_password: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub new_password: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut out = Vec::new();
        if self.current_password.is_empty() {
            out.push(FieldViolation::new(
                "current_password",
                "Current password is required.",
            ));
        }
        out.extend(validate_new_password(
            "new_password",
            &self.new_password,
            "New password is required.",
        ));
        out.extend(validate_confirmation(
            "confirm_password",
            &self.new_password,
            &self.confirm_password,
            "Please confirm your new password.",
        ));
        out
    }
}
