// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filter accepters.
//!
//! An [`AccepterCore`] wraps a child accepter and layers a filter over every
//! connection it produces. The core knows nothing about the filter: it drives
//! a wrapper through the [`AccepterOps`] protocol, one call per operation, in
//! a fixed order for each inbound connection:
//!
//! ```text
//!  raw child --> new_child --> alloc_gensio --> finish_parent --> application
//!                (filter)      (compose)        (copy attrs)
//! ```
//!
//! `free` releases the wrapper state once, when the accepter is torn down.

use crate::args::ArgList;
use crate::compose::{compose, compose_with_filter, FilteredStream};
use crate::error::{LayerError, Result};
use crate::filter::{Filter, FilterFactory};
use crate::host::{Host, Resource};
use crate::stream::{StreamAttrs, StreamHandle};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an accepter.
pub type AccepterHandle = Arc<dyn Accepter>;

/// Accepter lifecycle as seen by the application and by wrapping layers.
pub trait Accepter: Send + Sync + fmt::Debug {
    /// Type tag (`"tcp"`, `"echo"`, ...).
    fn type_name(&self) -> &str;

    /// Attributes of the connections this accepter produces.
    fn attrs(&self) -> StreamAttrs;

    /// Start accepting connections.
    fn enable(&self) -> Result<()> {
        Ok(())
    }

    /// Stop accepting connections.
    fn shutdown(&self) {}

    /// Hand over an inbound connection; returns the stream the application
    /// should see.
    ///
    /// Terminal accepters return `raw` unchanged.
    fn connection(&self, raw: StreamHandle) -> Result<StreamHandle> {
        Ok(raw)
    }
}

/// Application callback for accepted connections.
pub trait AccepterEvents: Send + Sync {
    /// A fully composed connection is ready.
    fn new_connection(&self, accepter_type: &str, stream: &StreamHandle);
}

// ============================================================================
// Operation protocol
// ============================================================================

/// Wrapper operations, with their stable wire codes.
///
/// [`AccepterOp::code`] and `TryFrom<u32>` are the encode/decode point for
/// cores that dispatch by raw operation number instead of through
/// [`AccepterOps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AccepterOp {
    AllocGensio = 1,
    NewChild = 2,
    FinishParent = 3,
    Free = 4,
}

impl AccepterOp {
    /// Stable code of this operation.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for AccepterOp {
    type Error = LayerError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            1 => Ok(Self::AllocGensio),
            2 => Ok(Self::NewChild),
            3 => Ok(Self::FinishParent),
            4 => Ok(Self::Free),
            other => Err(LayerError::not_supported(format!(
                "accepter operation {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AccepterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllocGensio => "ALLOC_GENSIO",
            Self::NewChild => "NEW_CHILD",
            Self::FinishParent => "FINISH_PARENT",
            Self::Free => "FREE",
        };
        f.write_str(name)
    }
}

/// Filter prepared for a connection that has not been accepted yet.
#[derive(Debug)]
pub struct PendingConnection {
    filter: Box<dyn Filter>,
}

impl PendingConnection {
    /// Wrap a freshly built filter.
    pub fn new(filter: Box<dyn Filter>) -> Self {
        Self { filter }
    }

    /// The prepared filter.
    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    /// Take the filter out.
    pub fn into_filter(self) -> Box<dyn Filter> {
        self.filter
    }
}

/// What `alloc_gensio` is asked to build.
#[derive(Debug)]
pub enum AllocRequest {
    /// An inbound connection prepared by `new_child`.
    Accepted(PendingConnection),
    /// An outbound connection created from the accepter with its own
    /// arguments.
    Outbound(ArgList),
}

/// Operations a wrapper provides to the generic accepter core.
///
/// Implementations return failures immediately; retrying is left to the
/// core's owner.
pub trait AccepterOps: Send {
    /// Type tag given to every composed stream.
    fn type_name(&self) -> &str;

    /// NEW_CHILD: prepare a filter for the next connection.
    fn new_child(&self) -> Result<PendingConnection>;

    /// ALLOC_GENSIO: compose the filtered stream over `child`.
    fn alloc_gensio(&self, request: AllocRequest, child: &StreamHandle) -> Result<FilteredStream>;

    /// FINISH_PARENT: final attribute propagation before delivery.
    fn finish_parent(&self, stream: &mut FilteredStream) -> Result<()>;

    /// FREE: release the wrapper state. Extra calls must be harmless.
    fn free(&mut self);
}

// ============================================================================
// Filter wrapper
// ============================================================================

/// Per-accepter wrapper state applying one filter type to every connection.
pub struct FilterAccepter {
    host: Arc<dyn Host>,
    factory: Arc<dyn FilterFactory>,
    args: Option<ArgList>,
}

impl FilterAccepter {
    /// Allocate wrapper state holding a private copy of `args`.
    pub fn new(host: Arc<dyn Host>, factory: Arc<dyn FilterFactory>, args: &ArgList) -> Result<Self> {
        if !host.admit(Resource::WrapperData) {
            return Err(LayerError::OutOfMemory(Resource::WrapperData));
        }
        if !host.admit(Resource::ArgCopy) {
            return Err(LayerError::OutOfMemory(Resource::ArgCopy));
        }
        Ok(Self {
            host,
            factory,
            args: Some(args.clone()),
        })
    }

    /// Build a listening-ready accepter layering `factory` over `child`.
    ///
    /// The new accepter inherits reliable/packet/message from `child`.
    pub fn alloc(
        host: Arc<dyn Host>,
        factory: Arc<dyn FilterFactory>,
        child: AccepterHandle,
        args: &ArgList,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterCore> {
        let ops = Self::new(host, factory, args)?;
        Ok(AccepterCore::new(child, Box::new(ops), events))
    }

    /// Stored argument copy; `None` once freed.
    pub fn args(&self) -> Option<&ArgList> {
        self.args.as_ref()
    }

    /// Check if `free` already ran.
    pub fn is_freed(&self) -> bool {
        self.args.is_none()
    }

    fn stored_args(&self) -> Result<&ArgList> {
        self.args.as_ref().ok_or_else(|| {
            LayerError::invalid(format!(
                "'{}' accepter wrapper already freed",
                self.factory.type_name()
            ))
        })
    }
}

impl AccepterOps for FilterAccepter {
    fn type_name(&self) -> &str {
        self.factory.type_name()
    }

    fn new_child(&self) -> Result<PendingConnection> {
        let filter = self.factory.build(self.stored_args()?)?;
        Ok(PendingConnection::new(filter))
    }

    fn alloc_gensio(&self, request: AllocRequest, child: &StreamHandle) -> Result<FilteredStream> {
        self.stored_args()?;
        match request {
            AllocRequest::Accepted(pending) => compose_with_filter(
                self.host.as_ref(),
                self.factory.type_name(),
                pending.into_filter(),
                child,
                None,
            ),
            AllocRequest::Outbound(args) => {
                compose(self.host.as_ref(), self.factory.as_ref(), child, &args, None)
            }
        }
    }

    fn finish_parent(&self, stream: &mut FilteredStream) -> Result<()> {
        stream.inherit_child_attrs();
        Ok(())
    }

    fn free(&mut self) {
        match self.args.take() {
            Some(args) => tracing::debug!(
                "Freed '{}' accepter wrapper ({} args)",
                self.factory.type_name(),
                args.len()
            ),
            None => tracing::warn!(
                "'{}' accepter wrapper freed twice, ignoring",
                self.factory.type_name()
            ),
        }
    }
}

impl fmt::Debug for FilterAccepter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterAccepter")
            .field("type_name", &self.factory.type_name())
            .field("args", &self.args)
            .finish()
    }
}

// ============================================================================
// Generic accepter core
// ============================================================================

/// Accepter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccepterState {
    /// Wrapper allocated, child accepter inert.
    Created,
    /// Child accepter active.
    Listening,
    /// No longer accepting.
    ShutDown,
    /// Wrapper state released.
    Freed,
}

struct CoreInner {
    state: AccepterState,
    ops: Box<dyn AccepterOps>,
    accepted: u64,
}

/// Generic accepter driving an [`AccepterOps`] wrapper over a child accepter.
pub struct AccepterCore {
    type_name: String,
    child: AccepterHandle,
    attrs: StreamAttrs,
    events: Option<Arc<dyn AccepterEvents>>,
    inner: Mutex<CoreInner>,
}

impl AccepterCore {
    /// Wrap `child` with `ops`.
    pub fn new(
        child: AccepterHandle,
        ops: Box<dyn AccepterOps>,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Self {
        let type_name = ops.type_name().to_string();
        let attrs = child.attrs();
        tracing::debug!(
            "Created '{}' accepter over '{}' ({:?})",
            type_name,
            child.type_name(),
            attrs
        );
        Self {
            type_name,
            child,
            attrs,
            events,
            inner: Mutex::new(CoreInner {
                state: AccepterState::Created,
                ops,
                accepted: 0,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> AccepterState {
        self.inner.lock().state
    }

    /// Number of connections delivered so far.
    pub fn accepted(&self) -> u64 {
        self.inner.lock().accepted
    }

    /// The wrapped accepter.
    pub fn child(&self) -> &AccepterHandle {
        &self.child
    }

    /// Create an outbound connection over `child` with per-call arguments.
    pub fn connect(&self, child: &StreamHandle, args: &ArgList) -> Result<StreamHandle> {
        let inner = self.inner.lock();
        if inner.state == AccepterState::Freed {
            return Err(LayerError::invalid(format!(
                "'{}' accepter is freed",
                self.type_name
            )));
        }
        tracing::trace!("'{}' op {}", self.type_name, AccepterOp::AllocGensio);
        let stream = inner
            .ops
            .alloc_gensio(AllocRequest::Outbound(args.clone()), child)?;
        Ok(stream.into_handle())
    }

    /// Release the wrapper state. Later calls are no-ops.
    pub fn free(&self) {
        let mut inner = self.inner.lock();
        if inner.state == AccepterState::Freed {
            tracing::debug!("'{}' accepter already freed", self.type_name);
            return;
        }
        if inner.state == AccepterState::Listening {
            self.child.shutdown();
        }
        tracing::trace!("'{}' op {}", self.type_name, AccepterOp::Free);
        inner.ops.free();
        inner.state = AccepterState::Freed;
    }
}

impl Accepter for AccepterCore {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attrs(&self) -> StreamAttrs {
        self.attrs
    }

    fn enable(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != AccepterState::Created {
            return Err(LayerError::invalid(format!(
                "'{}' accepter cannot be enabled from {:?}",
                self.type_name, inner.state
            )));
        }
        self.child.enable()?;
        inner.state = AccepterState::Listening;
        tracing::info!("'{}' accepter listening", self.type_name);
        Ok(())
    }

    fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.state == AccepterState::Listening {
            self.child.shutdown();
            inner.state = AccepterState::ShutDown;
            tracing::info!(
                "'{}' accepter shut down after {} connections",
                self.type_name,
                inner.accepted
            );
        }
    }

    fn connection(&self, raw: StreamHandle) -> Result<StreamHandle> {
        let handle = {
            let mut inner = self.inner.lock();
            if inner.state != AccepterState::Listening {
                return Err(LayerError::invalid(format!(
                    "'{}' accepter is not listening ({:?})",
                    self.type_name, inner.state
                )));
            }

            tracing::trace!("'{}' op {}", self.type_name, AccepterOp::NewChild);
            let pending = inner.ops.new_child()?;

            let child = self.child.connection(raw)?;

            tracing::trace!("'{}' op {}", self.type_name, AccepterOp::AllocGensio);
            let mut stream = inner
                .ops
                .alloc_gensio(AllocRequest::Accepted(pending), &child)?;

            tracing::trace!("'{}' op {}", self.type_name, AccepterOp::FinishParent);
            inner.ops.finish_parent(&mut stream)?;

            inner.accepted += 1;
            stream.into_handle()
        };

        if let Some(events) = &self.events {
            events.new_connection(&self.type_name, &handle);
        }
        Ok(handle)
    }
}

impl Drop for AccepterCore {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == AccepterState::Listening {
            self.child.shutdown();
        }
        if inner.state != AccepterState::Freed {
            inner.ops.free();
            inner.state = AccepterState::Freed;
        }
    }
}

impl fmt::Debug for AccepterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccepterCore")
            .field("type_name", &self.type_name)
            .field("child", &self.child.type_name())
            .field("attrs", &self.attrs)
            .field("state", &self.state())
            .finish()
    }
}
