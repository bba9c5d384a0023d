// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Stream Layering
//!
//! Stacks filter layers on top of byte streams and accepters. A filter
//! transforms data on its way through; the layer below it (its *child*) is
//! any other stream, possibly filtered itself.
//!
//! ```text
//!   application
//!       |
//!   FilteredStream "echo"  --- Filter
//!       |  LowerLayer
//!   FilteredStream "xlt"   --- Filter
//!       |  LowerLayer
//!   terminal stream "tcp"
//! ```
//!
//! # Features
//!
//! - **All-or-nothing composition**: a failed layer releases everything it
//!   built and leaves the child untouched
//! - **Descriptors**: `echo(mode=x),tcp,localhost,7400` resolved through a
//!   [`Registry`]
//! - **Accepters**: every inbound connection gets its own filter through the
//!   [`AccepterOps`] protocol
//! - **Configuration**: nesting limit and per-type default arguments from TOML
//!
//! # Quick Start
//!
//! ```ignore
//! use hdds_layer::{FnFilterFactory, Registry};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! registry.register_filter(Arc::new(FnFilterFactory::new("echo", build_echo)))?;
//! let stream = registry.resolve_stream("echo(mode=x),tcp,localhost,7400", None)?;
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "edge-node"
//! max_depth = 8
//!
//! [[defaults]]
//! type_name = "xlt"
//! args = ["in=cr", "out=lf"]
//! ```

pub mod accepter;
pub mod args;
pub mod compose;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod host;
pub mod lower;
pub mod registry;
pub mod stream;

pub use accepter::{
    Accepter, AccepterCore, AccepterEvents, AccepterHandle, AccepterOp, AccepterOps,
    AccepterState, AllocRequest, FilterAccepter, PendingConnection,
};
pub use args::ArgList;
pub use compose::{compose, compose_with_filter, Composition, FilteredStream};
pub use config::{ConfigError, LayerConfig, TypeDefaults};
pub use descriptor::{filtered_from_descriptor, split_layers, Descriptor, Resolver};
pub use error::{LayerError, Result};
pub use filter::{Filter, FilterFactory, FnFilterFactory};
pub use host::{Host, Resource, SystemHost};
pub use lower::LowerLayer;
pub use registry::{
    AccepterConstructor, FilterType, Registry, StreamConstructor, DEFAULT_MAX_DEPTH,
};
pub use stream::{layers, EventSink, Stream, StreamAttrs, StreamEvent, StreamHandle};
