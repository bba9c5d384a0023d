// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream abstraction shared by terminal transports and filtered layers.
//!
//! A stream is anything that can sit underneath a filter: a TCP connection,
//! a serial line, or another filtered stream. Streams are shared through
//! [`StreamHandle`]; the layering core only ever clones or drops handles, so
//! other holders may keep using a child concurrently.

use std::fmt;
use std::sync::Arc;

/// Shared handle to a stream.
pub type StreamHandle = Arc<dyn Stream>;

/// Transport attributes propagated from a child to the layer above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamAttrs {
    /// Delivery is reliable and ordered.
    pub reliable: bool,
    /// Writes are delivered as discrete packets.
    pub packet: bool,
    /// Message boundaries are preserved end to end.
    pub message: bool,
}

impl StreamAttrs {
    /// Attributes of a reliable byte stream (TCP-like).
    pub const fn reliable_stream() -> Self {
        Self {
            reliable: true,
            packet: false,
            message: false,
        }
    }

    /// Attributes of an unreliable datagram transport (UDP-like).
    pub const fn datagram() -> Self {
        Self {
            reliable: false,
            packet: true,
            message: true,
        }
    }
}

/// A stream object as seen by the layering core.
pub trait Stream: Send + Sync + fmt::Debug {
    /// Type tag (`"tcp"`, `"echo"`, ...).
    fn type_name(&self) -> &str;

    /// Current transport attributes.
    fn attrs(&self) -> StreamAttrs;

    /// Immediate child, if this stream is layered on another one.
    fn child(&self) -> Option<StreamHandle> {
        None
    }
}

/// Notifications delivered to the application owning a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// Data can be read.
    ReadReady,
    /// The stream can accept more data.
    WriteReady,
    /// The stream was closed.
    Closed,
}

/// Application callback for stream events.
pub trait EventSink: Send + Sync {
    /// Called by the host runtime for every event on `stream_type`.
    fn on_event(&self, stream_type: &str, event: StreamEvent);
}

/// Walk the child chain of `stream`, outermost first.
///
/// The first element is `stream` itself.
pub fn layers(stream: &StreamHandle) -> Vec<StreamHandle> {
    let mut out = vec![Arc::clone(stream)];
    while let Some(next) = out.last().and_then(|s| s.child()) {
        out.push(next);
    }
    out
}

// ============================================================================
// Test mocks
// ============================================================================
