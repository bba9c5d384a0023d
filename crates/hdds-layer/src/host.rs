// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host resource gate.
//!
//! Every object this crate builds is admitted by the [`Host`] before it is
//! created. The default [`SystemHost`] admits everything; embedders with
//! bounded memory pools (and tests injecting failure points) supply their own.

use std::fmt;

/// Kinds of objects created by the layering core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Adapter placing a child stream beneath a filter.
    LowerLayer,
    /// The composed filtered stream itself.
    BaseObject,
    /// Per-accepter wrapper state.
    WrapperData,
    /// Deep copy of an accepter's argument list.
    ArgCopy,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::LowerLayer => "lower layer",
            Resource::BaseObject => "base object",
            Resource::WrapperData => "wrapper data",
            Resource::ArgCopy => "argument copy",
        };
        f.write_str(name)
    }
}

/// Allocation gate supplied by the host framework.
pub trait Host: Send + Sync {
    /// Return `false` to refuse creation of `resource`.
    ///
    /// A refusal surfaces to the caller as
    /// [`LayerError::OutOfMemory`](crate::LayerError::OutOfMemory).
    fn admit(&self, resource: Resource) -> bool;
}

/// Host that never refuses an allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn admit(&self, _resource: Resource) -> bool {
        true
    }
}
