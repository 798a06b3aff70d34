use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};

use crate::divider::{divide, parse_count, DivideError, NOT_AN_INTEGER_MESSAGE};
use crate::errors::AppError;

/// A count as submitted by a client: a JSON number or the raw text of a form
/// field. Anything else (booleans, arrays, objects) lands in `Other`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CountInput {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl CountInput {
    fn to_count(&self) -> Result<u64, DivideError> {
        match self {
            CountInput::Number(n) => n
                .as_u64()
                .ok_or(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE)),
            CountInput::Text(text) => parse_count(text),
            CountInput::Other(_) => Err(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE)),
        }
    }
}

/// Missing or `null` counts are `None`.
fn required_count(input: Option<&CountInput>) -> Result<u64, DivideError> {
    input
        .ok_or(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE))?
        .to_count()
}

#[derive(Debug, Deserialize)]
pub struct DivideRequest {
    #[serde(default)]
    pub resumes: Option<CountInput>,
    #[serde(default)]
    pub reviewers: Option<CountInput>,
}

#[derive(Debug, Serialize)]
pub struct DivideResponse {
    pub base_count: u64,
    pub remainder: u64,
    pub message: String,
}

/// POST /api/v1/divide
pub async fn handle_divide(
    payload: Result<Json<DivideRequest>, JsonRejection>,
) -> Result<Json<DivideResponse>, AppError> {
    let Json(req) = payload?;
    let total = required_count(req.resumes.as_ref())?;
    let parts = required_count(req.reviewers.as_ref())?;
    let result = divide(total, parts)?;
    Ok(Json(DivideResponse {
        base_count: result.base_count,
        remainder: result.remainder,
        message: result.message(),
    }))
}
