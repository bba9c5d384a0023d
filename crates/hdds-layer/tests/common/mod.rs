// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for layering integration tests.

#![allow(dead_code)]

use hdds_layer::{
    Accepter, AccepterConstructor, AccepterEvents, AccepterHandle, AccepterOp, AccepterOps,
    AllocRequest, ArgList, EventSink, Filter, FilterFactory, FilteredStream, Host, LayerError,
    PendingConnection, Resolver, Resource, Result, Stream, StreamAttrs, StreamConstructor,
    StreamHandle,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Terminal streams and accepters
// ============================================================================

/// Terminal stream with fixed attributes.
#[derive(Debug)]
pub struct MockStream {
    type_name: String,
    attrs: StreamAttrs,
}

impl MockStream {
    pub fn handle(type_name: &str, attrs: StreamAttrs) -> StreamHandle {
        Arc::new(Self {
            type_name: type_name.to_string(),
            attrs,
        })
    }
}

impl Stream for MockStream {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attrs(&self) -> StreamAttrs {
        self.attrs
    }
}

/// Terminal accepter handing raw connections through unchanged.
#[derive(Debug)]
pub struct MockAccepter {
    attrs: StreamAttrs,
    pub enabled: AtomicBool,
    pub shutdowns: AtomicUsize,
}

impl MockAccepter {
    pub fn new(attrs: StreamAttrs) -> Arc<Self> {
        Arc::new(Self {
            attrs,
            enabled: AtomicBool::new(false),
            shutdowns: AtomicUsize::new(0),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Accepter for MockAccepter {
    fn type_name(&self) -> &str {
        "mock"
    }

    fn attrs(&self) -> StreamAttrs {
        self.attrs
    }

    fn enable(&self) -> Result<()> {
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Attributes from bare `reliable`, `packet` and `message` flags.
pub fn attrs_from_args(args: &ArgList) -> StreamAttrs {
    StreamAttrs {
        reliable: args.contains_key("reliable"),
        packet: args.contains_key("packet"),
        message: args.contains_key("message"),
    }
}

/// Terminal `mock` type for both tables.
///
/// Keeps every object it creates so tests can inspect handle counts after
/// the registry is done with them.
#[derive(Default)]
pub struct MockType {
    pub streams: Mutex<Vec<StreamHandle>>,
    pub accepters: Mutex<Vec<Arc<MockAccepter>>>,
}

impl MockType {
    pub fn last_stream(&self) -> StreamHandle {
        Arc::clone(self.streams.lock().last().expect("no mock stream created"))
    }

    pub fn last_accepter(&self) -> Arc<MockAccepter> {
        Arc::clone(self.accepters.lock().last().expect("no mock accepter created"))
    }
}

impl StreamConstructor for MockType {
    fn from_descriptor(
        &self,
        _resolver: &dyn Resolver,
        _host: &Arc<dyn Host>,
        _rest: Option<&str>,
        args: &ArgList,
        _events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        let stream = MockStream::handle("mock", attrs_from_args(args));
        self.streams.lock().push(Arc::clone(&stream));
        Ok(stream)
    }
}

impl AccepterConstructor for MockType {
    fn from_descriptor(
        &self,
        _resolver: &dyn Resolver,
        _host: &Arc<dyn Host>,
        _rest: Option<&str>,
        args: &ArgList,
        _events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        let acc = MockAccepter::new(attrs_from_args(args));
        self.accepters.lock().push(Arc::clone(&acc));
        Ok(acc)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Filter tracking how many instances are alive.
#[derive(Debug)]
pub struct EchoFilter {
    pub id: usize,
    live: Arc<AtomicUsize>,
}

impl Filter for EchoFilter {
    fn type_name(&self) -> &str {
        "echo"
    }
}

impl Drop for EchoFilter {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `echo` factory; rejects `bad=1`, records the arguments of every build.
#[derive(Default)]
pub struct EchoFactory {
    live: Arc<AtomicUsize>,
    pub built_args: Mutex<Vec<ArgList>>,
}

impl EchoFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Filters currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Filters built so far.
    pub fn built(&self) -> usize {
        self.built_args.lock().len()
    }
}

impl FilterFactory for EchoFactory {
    fn type_name(&self) -> &str {
        "echo"
    }

    fn build(&self, args: &ArgList) -> Result<Box<dyn Filter>> {
        if args.get("bad") == Some("1") {
            return Err(LayerError::underlying("echo: bad=1 rejected"));
        }
        let mut built = self.built_args.lock();
        built.push(args.clone());
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EchoFilter {
            id: built.len(),
            live: Arc::clone(&self.live),
        }))
    }
}

// ============================================================================
// Host and accepter instrumentation
// ============================================================================

/// Host refusing one kind of resource.
#[derive(Debug)]
pub struct FaultyHost {
    refuse: Resource,
}

impl FaultyHost {
    pub fn refusing(refuse: Resource) -> Arc<Self> {
        Arc::new(Self { refuse })
    }
}

impl Host for FaultyHost {
    fn admit(&self, resource: Resource) -> bool {
        resource != self.refuse
    }
}

/// Shared log of wrapper operations.
pub type OpLog = Arc<Mutex<Vec<AccepterOp>>>;

/// Wrapper recording each operation before delegating it.
pub struct RecordingOps {
    inner: Box<dyn AccepterOps>,
    log: OpLog,
    reset_attrs: bool,
}

impl RecordingOps {
    pub fn new(inner: Box<dyn AccepterOps>) -> (Self, OpLog) {
        let log = OpLog::default();
        (
            Self {
                inner,
                log: Arc::clone(&log),
                reset_attrs: false,
            },
            log,
        )
    }

    /// Like [`RecordingOps::new`], but every stream leaves `alloc_gensio`
    /// with all attributes cleared, so only FINISH_PARENT can restore them.
    pub fn resetting_attrs(inner: Box<dyn AccepterOps>) -> (Self, OpLog) {
        let (mut ops, log) = Self::new(inner);
        ops.reset_attrs = true;
        (ops, log)
    }
}

impl AccepterOps for RecordingOps {
    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn new_child(&self) -> Result<PendingConnection> {
        self.log.lock().push(AccepterOp::NewChild);
        self.inner.new_child()
    }

    fn alloc_gensio(&self, request: AllocRequest, child: &StreamHandle) -> Result<FilteredStream> {
        self.log.lock().push(AccepterOp::AllocGensio);
        let mut stream = self.inner.alloc_gensio(request, child)?;
        if self.reset_attrs {
            stream.set_attrs(StreamAttrs::default());
        }
        Ok(stream)
    }

    fn finish_parent(&self, stream: &mut FilteredStream) -> Result<()> {
        self.log.lock().push(AccepterOp::FinishParent);
        self.inner.finish_parent(stream)
    }

    fn free(&mut self) {
        self.log.lock().push(AccepterOp::Free);
        self.inner.free();
    }
}

/// Application callback recording delivered connections.
///
/// Only the type tag and attributes are kept, so the application side never
/// extends a stream's lifetime.
#[derive(Default)]
pub struct RecordingEvents {
    pub connections: Mutex<Vec<(String, StreamAttrs)>>,
}

impl AccepterEvents for RecordingEvents {
    fn new_connection(&self, accepter_type: &str, stream: &StreamHandle) {
        self.connections
            .lock()
            .push((accepter_type.to_string(), stream.attrs()));
    }
}

pub fn tcp_attrs() -> StreamAttrs {
    StreamAttrs::reliable_stream()
}
