// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry.
//!
//! Maps type names to constructor pairs, separately for streams and
//! accepters. A registry is built once at startup, filled by each layer's
//! init function, and then shared by reference with everything that resolves
//! descriptors. Entries are never replaced or removed.

use crate::accepter::{AccepterEvents, AccepterHandle, FilterAccepter};
use crate::args::ArgList;
use crate::compose::compose;
use crate::config::LayerConfig;
use crate::descriptor::{filtered_from_descriptor, Descriptor, Resolver};
use crate::error::{LayerError, Result};
use crate::filter::FilterFactory;
use crate::host::{Host, SystemHost};
use crate::stream::{EventSink, StreamHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Default limit on descriptor nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Constructor pair of a stream type.
pub trait StreamConstructor: Send + Sync {
    /// Build from the descriptor remainder and arguments.
    fn from_descriptor(
        &self,
        resolver: &dyn Resolver,
        host: &Arc<dyn Host>,
        rest: Option<&str>,
        args: &ArgList,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle>;

    /// Build programmatically on top of an existing child.
    fn alloc(
        &self,
        _host: &Arc<dyn Host>,
        _child: &StreamHandle,
        _args: &ArgList,
        _events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        Err(LayerError::not_supported("type cannot be layered on a child"))
    }
}

/// Constructor pair of an accepter type.
pub trait AccepterConstructor: Send + Sync {
    /// Build from the descriptor remainder and arguments.
    fn from_descriptor(
        &self,
        resolver: &dyn Resolver,
        host: &Arc<dyn Host>,
        rest: Option<&str>,
        args: &ArgList,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle>;

    /// Build programmatically on top of an existing child accepter.
    fn alloc(
        &self,
        _host: &Arc<dyn Host>,
        _child: AccepterHandle,
        _args: &ArgList,
        _events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        Err(LayerError::not_supported("type cannot be layered on a child"))
    }
}

// ============================================================================
// Filter types
// ============================================================================

/// Constructor pair shared by every filter type.
///
/// One instance serves both the stream and the accepter table.
pub struct FilterType {
    factory: Arc<dyn FilterFactory>,
}

impl FilterType {
    pub fn new(factory: Arc<dyn FilterFactory>) -> Self {
        Self { factory }
    }

    fn child_descriptor<'r>(&self, rest: Option<&'r str>) -> Result<&'r str> {
        rest.ok_or_else(|| {
            LayerError::invalid(format!(
                "'{}' needs a child descriptor",
                self.factory.type_name()
            ))
        })
    }
}

impl StreamConstructor for FilterType {
    fn from_descriptor(
        &self,
        resolver: &dyn Resolver,
        host: &Arc<dyn Host>,
        rest: Option<&str>,
        args: &ArgList,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        let child_descriptor = self.child_descriptor(rest)?;
        filtered_from_descriptor(
            resolver,
            host.as_ref(),
            self.factory.as_ref(),
            child_descriptor,
            args,
            events,
        )
        .map(|stream| stream.into_handle())
    }

    fn alloc(
        &self,
        host: &Arc<dyn Host>,
        child: &StreamHandle,
        args: &ArgList,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        compose(host.as_ref(), self.factory.as_ref(), child, args, events)
            .map(|stream| stream.into_handle())
    }
}

impl AccepterConstructor for FilterType {
    fn from_descriptor(
        &self,
        resolver: &dyn Resolver,
        host: &Arc<dyn Host>,
        rest: Option<&str>,
        args: &ArgList,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        let child = resolver.resolve_accepter(self.child_descriptor(rest)?, None)?;
        // On failure the resolved child accepter is dropped with `child`
        AccepterConstructor::alloc(self, host, child, args, events)
    }

    fn alloc(
        &self,
        host: &Arc<dyn Host>,
        child: AccepterHandle,
        args: &ArgList,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        let acc = FilterAccepter::alloc(
            Arc::clone(host),
            Arc::clone(&self.factory),
            child,
            args,
            events,
        )?;
        Ok(Arc::new(acc))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of stream and accepter types.
pub struct Registry {
    host: Arc<dyn Host>,
    max_depth: usize,
    defaults: HashMap<String, ArgList>,
    streams: RwLock<HashMap<String, Arc<dyn StreamConstructor>>>,
    accepters: RwLock<HashMap<String, Arc<dyn AccepterConstructor>>>,
}

impl Registry {
    /// Create an empty registry using [`SystemHost`].
    pub fn new() -> Self {
        Self::with_host(Arc::new(SystemHost))
    }

    /// Create an empty registry using `host` for every allocation.
    pub fn with_host(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            max_depth: DEFAULT_MAX_DEPTH,
            defaults: HashMap::new(),
            streams: RwLock::new(HashMap::new()),
            accepters: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty registry configured from `config`.
    pub fn with_config(host: Arc<dyn Host>, config: &LayerConfig) -> Self {
        let mut registry = Self::with_host(host);
        registry.max_depth = config.max_depth;
        registry.defaults = config
            .defaults
            .iter()
            .map(|d| (d.type_name.clone(), d.args.iter().collect::<ArgList>()))
            .collect();
        registry
    }

    /// Host used for allocations.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Maximum descriptor nesting depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Default arguments configured for `type_name`.
    pub fn defaults_for(&self, type_name: &str) -> Option<&ArgList> {
        self.defaults.get(type_name)
    }

    /// Register a stream type.
    ///
    /// Fails with [`LayerError::AlreadyRegistered`] if the name is taken; the
    /// existing entry is kept.
    pub fn register_stream_type(
        &self,
        name: &str,
        ctor: Arc<dyn StreamConstructor>,
    ) -> Result<()> {
        check_name(name)?;
        let mut streams = self.streams.write();
        if streams.contains_key(name) {
            return Err(LayerError::AlreadyRegistered(name.to_string()));
        }
        streams.insert(name.to_string(), ctor);
        tracing::debug!("Registered stream type '{}'", name);
        Ok(())
    }

    /// Register an accepter type.
    ///
    /// Same duplicate rule as [`Registry::register_stream_type`].
    pub fn register_accepter_type(
        &self,
        name: &str,
        ctor: Arc<dyn AccepterConstructor>,
    ) -> Result<()> {
        check_name(name)?;
        let mut accepters = self.accepters.write();
        if accepters.contains_key(name) {
            return Err(LayerError::AlreadyRegistered(name.to_string()));
        }
        accepters.insert(name.to_string(), ctor);
        tracing::debug!("Registered accepter type '{}'", name);
        Ok(())
    }

    /// Register a filter under both tables.
    ///
    /// Either both entries are added or neither is.
    pub fn register_filter(&self, factory: Arc<dyn FilterFactory>) -> Result<()> {
        let name = factory.type_name().to_string();
        check_name(&name)?;

        let mut streams = self.streams.write();
        let mut accepters = self.accepters.write();
        if streams.contains_key(&name) || accepters.contains_key(&name) {
            return Err(LayerError::AlreadyRegistered(name));
        }

        let filter_type = Arc::new(FilterType::new(factory));
        streams.insert(name.clone(), filter_type.clone());
        accepters.insert(name.clone(), filter_type);
        tracing::debug!("Registered filter type '{}'", name);
        Ok(())
    }

    /// Check if a stream type is registered.
    pub fn has_stream_type(&self, name: &str) -> bool {
        self.streams.read().contains_key(name)
    }

    /// Check if an accepter type is registered.
    pub fn has_accepter_type(&self, name: &str) -> bool {
        self.accepters.read().contains_key(name)
    }

    /// Registered stream type names, sorted.
    pub fn stream_types(&self) -> Vec<String> {
        sorted_keys(&self.streams.read())
    }

    /// Registered accepter type names, sorted.
    pub fn accepter_types(&self) -> Vec<String> {
        sorted_keys(&self.accepters.read())
    }

    /// Build the stream described by `descriptor`.
    pub fn resolve_stream(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        self.resolve_stream_at(descriptor, 0, events)
    }

    /// Build the accepter described by `descriptor`.
    pub fn resolve_accepter(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        self.resolve_accepter_at(descriptor, 0, events)
    }

    /// Layer a registered type over an existing child stream.
    pub fn alloc_stream(
        &self,
        type_name: &str,
        child: &StreamHandle,
        args: &ArgList,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        let ctor = self.stream_ctor(type_name)?;
        let args = self.merged_args(type_name, args);
        ctor.alloc(&self.host, child, &args, events)
    }

    /// Layer a registered type over an existing child accepter.
    pub fn alloc_accepter(
        &self,
        type_name: &str,
        child: AccepterHandle,
        args: &ArgList,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        let ctor = self.accepter_ctor(type_name)?;
        let args = self.merged_args(type_name, args);
        ctor.alloc(&self.host, child, &args, events)
    }

    fn stream_ctor(&self, name: &str) -> Result<Arc<dyn StreamConstructor>> {
        // Clone out so the lock is not held while constructors recurse
        self.streams
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LayerError::not_supported(format!("unknown stream type '{}'", name)))
    }

    fn accepter_ctor(&self, name: &str) -> Result<Arc<dyn AccepterConstructor>> {
        self.accepters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LayerError::not_supported(format!("unknown accepter type '{}'", name)))
    }

    fn merged_args(&self, type_name: &str, args: &ArgList) -> ArgList {
        match self.defaults.get(type_name) {
            Some(defaults) => args.with_defaults(defaults),
            None => args.clone(),
        }
    }

    fn check_depth(&self, descriptor: &str, depth: usize) -> Result<()> {
        if depth >= self.max_depth {
            return Err(LayerError::invalid(format!(
                "descriptor '{}' nests deeper than {} layers",
                descriptor, self.max_depth
            )));
        }
        Ok(())
    }

    fn resolve_stream_at(
        &self,
        descriptor: &str,
        depth: usize,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        self.check_depth(descriptor, depth)?;
        let head = Descriptor::parse(descriptor)?;
        let ctor = self.stream_ctor(head.type_name)?;
        let args = self.merged_args(head.type_name, &head.args);

        tracing::trace!(
            "Resolving stream '{}' at depth {} (args: {})",
            head.type_name,
            depth,
            args
        );
        let scope = Scope {
            registry: self,
            depth: depth + 1,
        };
        ctor.from_descriptor(&scope, &self.host, head.rest, &args, events)
    }

    fn resolve_accepter_at(
        &self,
        descriptor: &str,
        depth: usize,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        self.check_depth(descriptor, depth)?;
        let head = Descriptor::parse(descriptor)?;
        let ctor = self.accepter_ctor(head.type_name)?;
        let args = self.merged_args(head.type_name, &head.args);

        tracing::trace!(
            "Resolving accepter '{}' at depth {} (args: {})",
            head.type_name,
            depth,
            args
        );
        let scope = Scope {
            registry: self,
            depth: depth + 1,
        };
        ctor.from_descriptor(&scope, &self.host, head.rest, &args, events)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for Registry {
    fn resolve(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        self.resolve_stream(descriptor, events)
    }

    fn resolve_accepter(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        Registry::resolve_accepter(self, descriptor, events)
    }
}

/// Resolver handed to constructors, tracking nesting depth.
struct Scope<'a> {
    registry: &'a Registry,
    depth: usize,
}

impl Resolver for Scope<'_> {
    fn resolve(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle> {
        self.registry
            .resolve_stream_at(descriptor, self.depth, events)
    }

    fn resolve_accepter(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle> {
        self.registry
            .resolve_accepter_at(descriptor, self.depth, events)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(|c: char| c == '(' || c == ')' || c == ',') {
        return Err(LayerError::invalid(format!(
            "'{}' is not a valid type name",
            name
        )));
    }
    Ok(())
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<_> = map.keys().cloned().collect();
    keys.sort();
    keys
}
