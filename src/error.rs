//! Error types for statekeep operations.
//!
//! This module defines [`ClassifiedError`], the single error type returned
//! across the crate's public surface, and a [`Result`] type alias for
//! convenience.
//!
//! # Error Handling Strategy
//!
//! - Every failure is classified onto an [`ErrorCode`] at the site where it
//!   is caught, so callers branch on the code rather than on message text
//! - The original failure travels along as the `source` for diagnostics
//! - Structured context (paths, attempt counts) rides in a sorted map so it
//!   serialises deterministically

use std::collections::BTreeMap;

use thiserror::Error;

use crate::taxonomy::{ErrorCode, ErrorKind};

/// Structured details attached to a [`ClassifiedError`].
pub type Context = BTreeMap<String, serde_json::Value>;

/// A failure mapped onto the error catalog.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    code: ErrorCode,
    message: String,
    context: Context,
    #[source]
    source: Option<anyhow::Error>,
}

impl ClassifiedError {
    /// Create an error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Context::new(),
            source: None,
        }
    }

    /// Decorate an existing error with a code, keeping its message.
    ///
    /// Unlike [`crate::taxonomy::classify`], this never inspects the error;
    /// the given code wins.
    pub fn attach<E>(err: E, code: ErrorCode) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let err = err.into();
        Self {
            code,
            message: err.to_string(),
            context: Context::new(),
            source: Some(err),
        }
    }

    /// Set the underlying cause.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.source = Some(cause.into());
        self
    }

    /// Add one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Merge a whole context map.
    pub fn with_context_map(mut self, context: Context) -> Self {
        self.context.extend(context);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The catalog record for this error's code.
    pub fn kind(&self) -> &'static ErrorKind {
        self.code.kind()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The error this one was created from, if any.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Result type alias for statekeep operations.
pub type Result<T> = std::result::Result<T, ClassifiedError>;
