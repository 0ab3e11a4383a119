//! The module contains the errors the engine can throw.
//!
//! Every variant belongs to one [`ErrorClass`], which is what callers (the
//! CLI, an HTTP layer) should branch on:
//!
//! - [`KeyNotFound`] when a referenced record is missing *or* belongs to
//!   another user. The message never tells the two apart.
//! - [`InsufficientFunds`] when applying a movement would overdraw an account.
//! - [`InvalidTransfer`] when source and destination account are the same.
//! - validation errors for malformed input.
//! - [`Database`] and [`Corrupted`] for store failures.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`InvalidTransfer`]: EngineError::InvalidTransfer
//!  [`Database`]: EngineError::Database
//!  [`Corrupted`]: EngineError::Corrupted
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    KeyNotFound(String),
    #[error("Insufficient balance: {0}")]
    InsufficientFunds(String),
    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid kind: {0}")]
    InvalidKind(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Corrupted record: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Coarse error taxonomy surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    NotFound,
    InsufficientBalance,
    InvalidTransfer,
    Validation,
    Internal,
}

impl EngineError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::KeyNotFound(_) => ErrorClass::NotFound,
            Self::InsufficientFunds(_) => ErrorClass::InsufficientBalance,
            Self::InvalidTransfer(_) => ErrorClass::InvalidTransfer,
            Self::InvalidAmount(_)
            | Self::InvalidDate(_)
            | Self::InvalidKind(_)
            | Self::InvalidFilter(_)
            | Self::CurrencyMismatch(_) => ErrorClass::Validation,
            Self::Corrupted(_) | Self::Database(_) => ErrorClass::Internal,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidTransfer(a), Self::InvalidTransfer(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InvalidFilter(a), Self::InvalidFilter(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Corrupted(a), Self::Corrupted(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_only_the_entity() {
        let err = EngineError::KeyNotFound("account".to_string());
        assert_eq!(err.to_string(), "account not found");
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn validation_variants_share_a_class() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidDate("x".to_string()),
            EngineError::InvalidKind("x".to_string()),
            EngineError::InvalidFilter("x".to_string()),
            EngineError::CurrencyMismatch("x".to_string()),
        ] {
            assert_eq!(err.class(), ErrorClass::Validation);
        }
    }

    #[test]
    fn store_failures_are_internal() {
        let err = EngineError::from(DbErr::Custom("boom".to_string()));
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(
            EngineError::Corrupted("kind".to_string()).class(),
            ErrorClass::Internal
        );
    }
}
