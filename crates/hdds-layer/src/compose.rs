// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Composition engine.
//!
//! Builds a [`FilteredStream`] (filter + lower layer + base object) on top of
//! a child stream. Construction is staged through [`Composition`], which owns
//! everything acquired so far; a failed step drops the builder and with it
//! every staged resource, so a caller either gets a complete stream or
//! nothing at all.
//!
//! ```text
//!   application
//!        |
//!  +-----v----------+
//!  | FilteredStream |  type tag = filter type, attrs copied from child
//!  |  +----------+  |
//!  |  |  Filter  |  |
//!  |  +----------+  |
//!  |  |LowerLayer|--+---> child stream (shared handle)
//!  |  +----------+  |
//!  +----------------+
//! ```

use crate::args::ArgList;
use crate::error::{LayerError, Result};
use crate::filter::{Filter, FilterFactory};
use crate::host::{Host, Resource};
use crate::lower::LowerLayer;
use crate::stream::{EventSink, Stream, StreamAttrs, StreamEvent, StreamHandle};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// FilteredStream
// ============================================================================

/// Stream composed of a filter stacked on a child stream.
pub struct FilteredStream {
    type_name: String,
    attrs: StreamAttrs,
    lower: LowerLayer,
    filter: Box<dyn Filter>,
    events: Option<Arc<dyn EventSink>>,
}

impl FilteredStream {
    /// Type tag (the filter's type name).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Current attributes.
    pub fn attrs(&self) -> StreamAttrs {
        self.attrs
    }

    /// Override the attributes.
    pub fn set_attrs(&mut self, attrs: StreamAttrs) {
        self.attrs = attrs;
    }

    /// Copy reliable/packet/message from the immediate child.
    pub fn inherit_child_attrs(&mut self) {
        self.attrs = self.lower.attrs();
    }

    /// The immediate child.
    pub fn child(&self) -> &StreamHandle {
        self.lower.child()
    }

    /// The lower layer carrying the child.
    pub fn lower(&self) -> &LowerLayer {
        &self.lower
    }

    /// The filter of this layer.
    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    /// Install or replace the application event sink.
    pub fn set_event_sink(&mut self, events: Option<Arc<dyn EventSink>>) {
        self.events = events;
    }

    /// Check if an application event sink is installed.
    pub fn has_event_sink(&self) -> bool {
        self.events.is_some()
    }

    /// Forward a runtime event to the application.
    ///
    /// Returns `false` when no sink is installed and the event was dropped.
    pub fn deliver(&self, event: StreamEvent) -> bool {
        match &self.events {
            Some(sink) => {
                sink.on_event(&self.type_name, event);
                true
            }
            None => false,
        }
    }

    /// Convert into a shared handle, usable as the child of another layer.
    pub fn into_handle(self) -> StreamHandle {
        Arc::new(self)
    }
}

impl Stream for FilteredStream {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attrs(&self) -> StreamAttrs {
        self.attrs
    }

    fn child(&self) -> Option<StreamHandle> {
        Some(Arc::clone(self.lower.child()))
    }
}

impl fmt::Debug for FilteredStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredStream")
            .field("type_name", &self.type_name)
            .field("attrs", &self.attrs)
            .field("child", &self.lower.child().type_name())
            .field("filter", &self.filter)
            .field("has_events", &self.events.is_some())
            .finish()
    }
}

// ============================================================================
// Composition builder
// ============================================================================

/// Staged construction of a [`FilteredStream`].
///
/// Each step consumes the builder and returns it on success. On failure the
/// builder is dropped, releasing the lower layer (and its child handle) before
/// the filter.
pub struct Composition<'a> {
    host: &'a dyn Host,
    child: &'a StreamHandle,
    type_name: String,
    events: Option<Arc<dyn EventSink>>,
    filter: Option<Box<dyn Filter>>,
    lower: Option<LowerLayer>,
}

impl<'a> Composition<'a> {
    /// Start composing a `type_name` layer over `child`.
    ///
    /// The borrow of `child` keeps the caller's handle alive for the whole
    /// construction.
    pub fn new(host: &'a dyn Host, type_name: impl Into<String>, child: &'a StreamHandle) -> Self {
        Self {
            host,
            child,
            type_name: type_name.into(),
            events: None,
            filter: None,
            lower: None,
        }
    }

    /// Set the application event sink of the stream being built.
    pub fn events(mut self, events: Option<Arc<dyn EventSink>>) -> Self {
        self.events = events;
        self
    }

    /// Build the filter from `args`.
    ///
    /// The factory's error is returned unchanged.
    pub fn build_filter(mut self, factory: &dyn FilterFactory, args: &ArgList) -> Result<Self> {
        let filter = factory.build(args)?;
        self.filter = Some(filter);
        Ok(self)
    }

    /// Use a filter prepared beforehand.
    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Wrap the child in a lower layer.
    pub fn lower_layer(mut self) -> Result<Self> {
        let lower = LowerLayer::new(self.host, self.child)?;
        self.lower = Some(lower);
        Ok(self)
    }

    /// Allocate the base object and hand over every staged resource.
    pub fn commit(mut self) -> Result<FilteredStream> {
        if self.filter.is_none() {
            return Err(LayerError::invalid("composition has no filter"));
        }
        if self.lower.is_none() {
            return Err(LayerError::invalid("composition has no lower layer"));
        }
        if !self.host.admit(Resource::BaseObject) {
            return Err(LayerError::OutOfMemory(Resource::BaseObject));
        }

        let (Some(lower), Some(filter)) = (self.lower.take(), self.filter.take()) else {
            return Err(LayerError::invalid("composition lost a staged resource"));
        };
        let attrs = self.child.attrs();

        Ok(FilteredStream {
            type_name: std::mem::take(&mut self.type_name),
            attrs,
            lower,
            filter,
            events: self.events.take(),
        })
    }
}

impl Drop for Composition<'_> {
    fn drop(&mut self) {
        if self.filter.is_none() && self.lower.is_none() {
            return;
        }
        tracing::debug!(
            "Rolling back '{}' over '{}' (lower layer: {}, filter: {})",
            self.type_name,
            self.child.type_name(),
            self.lower.is_some(),
            self.filter.is_some()
        );
        drop(self.lower.take());
        drop(self.filter.take());
    }
}

/// Compose a filtered stream from `child` and `args`.
///
/// On success the stream owns one handle to `child` (through its lower
/// layer) and its attributes equal the child's. On failure the child's
/// handle count is exactly what it was before the call.
pub fn compose(
    host: &dyn Host,
    factory: &dyn FilterFactory,
    child: &StreamHandle,
    args: &ArgList,
    events: Option<Arc<dyn EventSink>>,
) -> Result<FilteredStream> {
    let stream = Composition::new(host, factory.type_name(), child)
        .events(events)
        .build_filter(factory, args)?
        .lower_layer()?
        .commit()?;

    tracing::debug!(
        "Composed '{}' over '{}' ({:?})",
        stream.type_name(),
        child.type_name(),
        stream.attrs()
    );
    Ok(stream)
}

/// Compose a filtered stream around a filter built beforehand.
pub fn compose_with_filter(
    host: &dyn Host,
    type_name: &str,
    filter: Box<dyn Filter>,
    child: &StreamHandle,
    events: Option<Arc<dyn EventSink>>,
) -> Result<FilteredStream> {
    let stream = Composition::new(host, type_name, child)
        .events(events)
        .with_filter(filter)
        .lower_layer()?
        .commit()?;

    tracing::debug!(
        "Composed '{}' over '{}' with prepared filter",
        stream.type_name(),
        child.type_name()
    );
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::mock::CountingFactory;
    use crate::host::mock::FaultyHost;
    use crate::host::SystemHost;
    use crate::stream::mock::{MockStream, RecordingSink};

    fn tcp_child() -> StreamHandle {
        MockStream::handle("tcp", StreamAttrs::reliable_stream())
    }

    #[test]
    fn test_compose_success() {
        let child = tcp_child();
        let factory = CountingFactory::default();

        let stream = compose(&SystemHost, &factory, &child, &ArgList::new(), None)
            .expect("compose");

        assert_eq!(stream.type_name(), "echo");
        assert_eq!(stream.attrs(), child.attrs());
        assert_eq!(stream.child().type_name(), "tcp");
        assert_eq!(stream.filter().type_name(), "echo");
        assert_eq!(factory.live(), 1);
        // The lower layer owns exactly one extra handle
        assert_eq!(Arc::strong_count(&child), 2);

        drop(stream);
        assert_eq!(Arc::strong_count(&child), 1);
        assert_eq!(factory.live(), 0);
    }

    #[test]
    fn test_compose_filter_error_untouched() {
        let child = tcp_child();
        let factory = CountingFactory::default();
        let args: ArgList = ["bad=1"].into_iter().collect();

        let err = compose(&SystemHost, &factory, &child, &args, None).unwrap_err();

        assert_eq!(err, LayerError::underlying("echo: bad=1 rejected"));
        assert_eq!(Arc::strong_count(&child), 1);
        assert_eq!(factory.live(), 0);
    }

    #[test]
    fn test_compose_lower_layer_refused() {
        let child = tcp_child();
        let factory = CountingFactory::default();
        let host = FaultyHost::refusing(Resource::LowerLayer);

        let err = compose(&host, &factory, &child, &ArgList::new(), None).unwrap_err();

        assert_eq!(err, LayerError::OutOfMemory(Resource::LowerLayer));
        assert_eq!(Arc::strong_count(&child), 1);
        assert_eq!(factory.built(), 1);
        assert_eq!(factory.live(), 0);
    }

    #[test]
    fn test_compose_base_object_refused() {
        let child = tcp_child();
        let factory = CountingFactory::default();
        let host = FaultyHost::refusing(Resource::BaseObject);

        let err = compose(&host, &factory, &child, &ArgList::new(), None).unwrap_err();

        assert_eq!(err, LayerError::OutOfMemory(Resource::BaseObject));
        assert_eq!(Arc::strong_count(&child), 1);
        assert_eq!(factory.live(), 0);
        // Lower layer was admitted before the base object was refused
        assert_eq!(host.admitted(), 1);
    }

    #[test]
    fn test_commit_without_filter() {
        let child = tcp_child();
        let err = Composition::new(&SystemHost, "echo", &child)
            .lower_layer()
            .expect("lower layer")
            .commit()
            .unwrap_err();

        assert!(matches!(err, LayerError::InvalidArgument(_)));
        assert_eq!(Arc::strong_count(&child), 1);
    }

    #[test]
    fn test_compose_with_prepared_filter() {
        let child = MockStream::handle("udp", StreamAttrs::datagram());
        let factory = CountingFactory::default();
        let filter = factory.build(&ArgList::new()).expect("filter");

        let stream =
            compose_with_filter(&SystemHost, "echo", filter, &child, None).expect("compose");

        assert_eq!(stream.attrs(), StreamAttrs::datagram());
        assert_eq!(factory.built(), 1);
    }

    #[test]
    fn test_events_forwarded() {
        let child = tcp_child();
        let factory = CountingFactory::default();
        let sink = Arc::new(RecordingSink::default());

        let mut stream = compose(
            &SystemHost,
            &factory,
            &child,
            &ArgList::new(),
            Some(sink.clone() as Arc<dyn EventSink>),
        )
        .expect("compose");

        assert!(stream.deliver(StreamEvent::ReadReady));
        assert!(stream.deliver(StreamEvent::Closed));
        assert_eq!(
            *sink.events.lock(),
            vec![
                ("echo".to_string(), StreamEvent::ReadReady),
                ("echo".to_string(), StreamEvent::Closed)
            ]
        );

        stream.set_event_sink(None);
        assert!(!stream.deliver(StreamEvent::WriteReady));
    }

    #[test]
    fn test_stacked_layers() {
        let child = tcp_child();
        let factory = CountingFactory::default();

        let inner = compose(&SystemHost, &factory, &child, &ArgList::new(), None)
            .expect("inner")
            .into_handle();
        let outer = compose(&SystemHost, &factory, &inner, &ArgList::new(), None)
            .expect("outer")
            .into_handle();

        let chain = crate::stream::layers(&outer);
        let names: Vec<_> = chain.iter().map(|s| s.type_name().to_string()).collect();
        assert_eq!(names, vec!["echo", "echo", "tcp"]);
        assert_eq!(outer.attrs(), StreamAttrs::reliable_stream());
    }

    #[test]
    fn test_inherit_child_attrs_after_override() {
        let child = tcp_child();
        let factory = CountingFactory::default();
        let mut stream =
            compose(&SystemHost, &factory, &child, &ArgList::new(), None).expect("compose");

        stream.set_attrs(StreamAttrs::default());
        assert!(!stream.attrs().reliable);

        stream.inherit_child_attrs();
        assert_eq!(stream.attrs(), StreamAttrs::reliable_stream());
    }
}
