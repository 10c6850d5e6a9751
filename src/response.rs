//! Validation outcomes as a request/response boundary reports them.
//!
//! This crate does not serve HTTP itself. A boundary layer feeds the outcome
//! of [`Validator::validate_schema`](../validator/struct.Validator.html#method.validate_schema)
//! to [`Response::from_outcome`](struct.Response.html#method.from_outcome)
//! and sends back the status code and serialized body.

use crate::validator::ValidationError;
use failure::Error;
use serde::Serialize;
use tracing::error;

/// One entry of an error response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub error: String,
}

/// A response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Body {
    /// The form is valid.
    Valid {
        status: &'static str,
        message: &'static str,
    },

    /// The form has problems; the client should fix them.
    Invalid {
        status: &'static str,
        errors: Vec<ErrorEntry>,
    },

    /// Validation itself could not complete.
    Failed { status: &'static str, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    body: Body,
}

impl Response {
    /// Map a validation outcome to a response: 200 when there are no errors,
    /// 400 listing them when there are, and 500 when validation failed.
    pub fn from_outcome(outcome: Result<Vec<ValidationError>, Error>) -> Response {
        match outcome {
            Ok(ref errors) if errors.is_empty() => Response {
                status_code: 200,
                body: Body::Valid {
                    status: "success",
                    message: "Form is valid",
                },
            },
            Ok(errors) => Response {
                status_code: 400,
                body: Body::Invalid {
                    status: "error",
                    errors: errors
                        .into_iter()
                        .map(|err| ErrorEntry {
                            error: err.to_string(),
                        })
                        .collect(),
                },
            },
            Err(err) => {
                error!(error = %err, "validation failed");
                Response {
                    status_code: 500,
                    body: Body::Failed {
                        status: "error",
                        error: err.to_string(),
                    },
                }
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The body as a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}
