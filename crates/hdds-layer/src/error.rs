// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error kinds shared by composition, registration and accepter operations.

use crate::host::Resource;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayerError>;

/// Layering errors.
///
/// Construction calls are atomic: when one of these is returned, nothing the
/// call allocated is still alive. Errors from filter factories, resolvers and
/// child constructors are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of memory allocating {0}")]
    OutOfMemory(Resource),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Type '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("{0}")]
    Underlying(String),
}

impl LayerError {
    /// Shorthand for an [`LayerError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for a [`LayerError::NotSupported`].
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Shorthand for an [`LayerError::Underlying`].
    pub fn underlying(msg: impl Into<String>) -> Self {
        Self::Underlying(msg.into())
    }
}
