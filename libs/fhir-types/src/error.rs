//! Error types for FHIR value types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid {type_name} value: {message}")]
    Validation {
        type_name: &'static str,
        message: String,
    },

    #[error("Missing required field `{field}` on FHIR.{type_name}")]
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("The key `{key}` isn't supported on FHIR.{type_name}")]
    UnsupportedField { type_name: &'static str, key: String },

    #[error("Invalid value for FHIR.{type_name}.{field}: expected {expected}")]
    InvalidFieldValue {
        type_name: &'static str,
        field: String,
        expected: &'static str,
    },
}

impl Error {
    pub(crate) fn validation(type_name: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            type_name,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_field(
        type_name: &'static str,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Error::InvalidFieldValue {
            type_name,
            field: field.into(),
            expected,
        }
    }
}
