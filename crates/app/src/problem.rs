use std::process::ExitCode;

use serde::Serialize;

use catalog_query_core::{catalog_price_rule::CatalogPriceRuleError, DispatchError};

use crate::error::AppError;

/// Problem document written to stderr when a command fails.
#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
}

/// Coarse failure class, which also decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemClass {
    InvalidInput,
    NotFound,
    WiringDefect,
    Internal,
}

impl ProblemClass {
    fn title(self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid input",
            Self::NotFound => "Not found",
            Self::WiringDefect => "Wiring defect",
            Self::Internal => "Internal error",
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::InvalidInput => 2,
            Self::NotFound => 3,
            Self::WiringDefect => 70,
            Self::Internal => 1,
        }
    }
}

pub struct Problem {
    class: ProblemClass,
    body: ProblemDetails,
}

impl Problem {
    pub fn new<S: Into<String>>(class: ProblemClass, problem_type: &'static str, detail: S) -> Self {
        Self {
            class,
            body: ProblemDetails {
                problem_type,
                title: class.title(),
                detail: detail.into(),
            },
        }
    }

    pub fn class(&self) -> ProblemClass {
        self.class
    }

    pub fn problem_type(&self) -> &'static str {
        self.body.problem_type
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.class.exit_code())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| {
            format!(
                "{{\"type\":\"{}\",\"title\":\"{}\"}}",
                self.body.problem_type, self.body.title
            )
        })
    }
}

impl From<&AppError> for Problem {
    fn from(err: &AppError) -> Self {
        let detail = err.to_string();
        match err {
            AppError::Validation(validation) => {
                Self::new(ProblemClass::InvalidInput, validation.code(), detail)
            }
            AppError::Dispatch(DispatchError::HandlerNotFound { .. }) => {
                Self::new(ProblemClass::WiringDefect, "handler_not_found", detail)
            }
            AppError::Dispatch(DispatchError::Handler(handler)) => match handler {
                CatalogPriceRuleError::LanguageNotFound(_) => {
                    Self::new(ProblemClass::NotFound, "language_not_found", detail)
                }
                CatalogPriceRuleError::CatalogPriceRuleNotFound(_) => {
                    Self::new(ProblemClass::NotFound, "catalog_price_rule_not_found", detail)
                }
                CatalogPriceRuleError::Storage(_) => {
                    Self::new(ProblemClass::Internal, "storage_failure", detail)
                }
            },
            AppError::Registration(_) => {
                Self::new(ProblemClass::WiringDefect, "duplicate_handler_registration", detail)
            }
            AppError::Config(_) => Self::new(ProblemClass::Internal, "invalid_configuration", detail),
            AppError::Storage(_) => Self::new(ProblemClass::Internal, "storage_failure", detail),
            AppError::Telemetry(_) | AppError::Output(_) => {
                Self::new(ProblemClass::Internal, "internal", detail)
            }
        }
    }
}
