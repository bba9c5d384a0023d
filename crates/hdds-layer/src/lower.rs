// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lower-layer adapter.
//!
//! Places a child stream underneath a filter. The adapter owns one handle
//! to the child for as long as it lives, so the child cannot disappear while
//! a filtered stream depends on it.

use crate::error::{LayerError, Result};
use crate::host::{Host, Resource};
use crate::stream::{StreamAttrs, StreamHandle};
use std::sync::Arc;

/// Child stream acting as the transport of a filtered stream.
#[derive(Debug)]
pub struct LowerLayer {
    child: StreamHandle,
}

impl LowerLayer {
    /// Wrap `child`, taking one shared handle on it.
    pub(crate) fn new(host: &dyn Host, child: &StreamHandle) -> Result<Self> {
        if !host.admit(Resource::LowerLayer) {
            return Err(LayerError::OutOfMemory(Resource::LowerLayer));
        }
        Ok(Self {
            child: Arc::clone(child),
        })
    }

    /// The wrapped child.
    pub fn child(&self) -> &StreamHandle {
        &self.child
    }

    /// Attributes of the wrapped child.
    pub fn attrs(&self) -> StreamAttrs {
        self.child.attrs()
    }
}

impl Drop for LowerLayer {
    fn drop(&mut self) {
        tracing::trace!(
            "Releasing lower layer over '{}'",
            self.child.type_name()
        );
    }
}
