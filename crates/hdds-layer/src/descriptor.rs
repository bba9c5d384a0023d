// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Textual descriptors.
//!
//! A descriptor names the outermost layer first and its child after a comma:
//!
//! ```text
//! echo(mode=x),xlt(in=cr),tcp(nodelay),localhost,7400
//! ^^^^ ^^^^^^  ^-------------- rest ----------------^
//! type  args
//! ```
//!
//! Only the head is parsed here; the rest is handed to the child's own
//! constructor through a [`Resolver`].

use crate::accepter::{AccepterEvents, AccepterHandle};
use crate::args::ArgList;
use crate::compose::{compose, FilteredStream};
use crate::error::{LayerError, Result};
use crate::filter::FilterFactory;
use crate::host::Host;
use crate::stream::{EventSink, StreamHandle};
use std::sync::Arc;

/// Head of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor<'a> {
    /// Registered type name of the outermost layer.
    pub type_name: &'a str,
    /// Arguments given in parentheses.
    pub args: ArgList,
    /// Descriptor of the child, if any.
    pub rest: Option<&'a str>,
}

impl<'a> Descriptor<'a> {
    /// Parse the head of `input`.
    pub fn parse(input: &'a str) -> Result<Self> {
        let split = input.find(|c: char| c == '(' || c == ',').unwrap_or(input.len());
        let type_name = input[..split].trim();
        if type_name.is_empty() {
            return Err(LayerError::invalid(format!(
                "descriptor '{}' has no type name",
                input
            )));
        }

        let mut tail = &input[split..];
        let mut args = ArgList::new();

        if tail.starts_with('(') {
            let close = matching_paren(tail).ok_or_else(|| {
                LayerError::invalid(format!("unbalanced parenthesis in '{}'", input))
            })?;
            for arg in split_top_level(&tail[1..close]) {
                let arg = arg.trim();
                if !arg.is_empty() {
                    args.push(arg);
                }
            }
            tail = &tail[close + 1..];
        }

        let rest = if tail.is_empty() {
            None
        } else if let Some(rest) = tail.strip_prefix(',') {
            let rest = rest.trim();
            if rest.is_empty() {
                return Err(LayerError::invalid(format!(
                    "descriptor '{}' ends with a separator",
                    input
                )));
            }
            Some(rest)
        } else {
            return Err(LayerError::invalid(format!(
                "unexpected '{}' after arguments of '{}'",
                tail, type_name
            )));
        };

        Ok(Self {
            type_name,
            args,
            rest,
        })
    }
}

/// Split `descriptor` into its layers, outermost first.
///
/// The walk descends into `rest` only while `is_filter` accepts the head's
/// type name. The first other type is the terminal layer and keeps its
/// `rest` (host, port, ...) as its own arguments, the way a registry hands
/// it to that type's constructor. Depth is counted per layer, with the same
/// limit the registry applies.
pub fn split_layers<'a>(
    descriptor: &'a str,
    is_filter: impl Fn(&str) -> bool,
    max_depth: usize,
) -> Result<Vec<Descriptor<'a>>> {
    let mut layers = Vec::new();
    let mut remaining = Some(descriptor);

    while let Some(current) = remaining {
        if layers.len() >= max_depth {
            return Err(LayerError::invalid(format!(
                "descriptor '{}' nests deeper than {} layers",
                current, max_depth
            )));
        }

        let head = Descriptor::parse(current)?;
        remaining = if is_filter(head.type_name) {
            let rest = head.rest.ok_or_else(|| {
                LayerError::invalid(format!("'{}' needs a child descriptor", head.type_name))
            })?;
            Some(rest)
        } else {
            None
        };
        layers.push(head);
    }

    Ok(layers)
}

/// Byte index of the `)` closing the `(` at index 0.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Turns descriptors into streams and accepters.
pub trait Resolver {
    /// Build the stream described by `descriptor`.
    fn resolve(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn EventSink>>,
    ) -> Result<StreamHandle>;

    /// Build the accepter described by `descriptor`.
    fn resolve_accepter(
        &self,
        descriptor: &str,
        events: Option<Arc<dyn AccepterEvents>>,
    ) -> Result<AccepterHandle>;
}

/// Resolve `child_descriptor` and layer a `factory` filter over it.
///
/// A resolver error is returned without building a filter. If composition
/// fails, the freshly resolved child is released here.
pub fn filtered_from_descriptor(
    resolver: &dyn Resolver,
    host: &dyn Host,
    factory: &dyn FilterFactory,
    child_descriptor: &str,
    args: &ArgList,
    events: Option<Arc<dyn EventSink>>,
) -> Result<FilteredStream> {
    let child = resolver.resolve(child_descriptor, None)?;

    match compose(host, factory, &child, args, events) {
        Ok(stream) => Ok(stream),
        Err(err) => {
            tracing::debug!(
                "Releasing child '{}' after failed '{}' composition: {}",
                child.type_name(),
                factory.type_name(),
                err
            );
            Err(err)
        }
    }
}
