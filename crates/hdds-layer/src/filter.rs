// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filter plug-in interface.
//!
//! A filter is the per-connection transform sitting between an application
//! and a child stream (line translation, compression, TLS, ...). This crate
//! never looks inside a filter: it builds one through a [`FilterFactory`],
//! hands it to the composed stream, and drops it on failure or teardown.

use crate::args::ArgList;
use crate::error::Result;
use std::fmt;

/// Opaque per-connection transform state.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Type tag of the filter (`"xlt"`, `"echo"`, ...).
    fn type_name(&self) -> &str;
}

/// Filter constructor.
///
/// `build` validates the argument list; any error it returns is passed to
/// the caller unchanged.
pub trait FilterFactory: Send + Sync {
    /// Type tag of the filters this factory builds.
    fn type_name(&self) -> &str;

    /// Build a fresh filter for one connection.
    fn build(&self, args: &ArgList) -> Result<Box<dyn Filter>>;
}

/// [`FilterFactory`] backed by a closure.
pub struct FnFilterFactory<F> {
    type_name: String,
    build: F,
}

impl<F> FnFilterFactory<F>
where
    F: Fn(&ArgList) -> Result<Box<dyn Filter>> + Send + Sync,
{
    /// Create a factory named `type_name`.
    pub fn new(type_name: impl Into<String>, build: F) -> Self {
        Self {
            type_name: type_name.into(),
            build,
        }
    }
}

impl<F> FilterFactory for FnFilterFactory<F>
where
    F: Fn(&ArgList) -> Result<Box<dyn Filter>> + Send + Sync,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn build(&self, args: &ArgList) -> Result<Box<dyn Filter>> {
        (self.build)(args)
    }
}

impl<F> fmt::Debug for FnFilterFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilterFactory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

// ============================================================================
// Test mocks
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayerError;

    #[derive(Debug)]
    struct Nop;

    impl Filter for Nop {
        fn type_name(&self) -> &str {
            "nop"
        }
    }

    #[test]
    fn test_fn_factory() {
        let factory = FnFilterFactory::new("nop", |_args: &ArgList| {
            Ok(Box::new(Nop) as Box<dyn Filter>)
        });

        assert_eq!(factory.type_name(), "nop");
        let filter = factory.build(&ArgList::new()).expect("build");
        assert_eq!(filter.type_name(), "nop");
    }

    #[test]
    fn test_fn_factory_error_passthrough() {
        let factory = FnFilterFactory::new("nop", |args: &ArgList| {
            if args.contains_key("strict") {
                Err(LayerError::underlying("strict mode unavailable"))
            } else {
                Ok(Box::new(Nop) as Box<dyn Filter>)
            }
        });

        let args: ArgList = ["strict"].into_iter().collect();
        assert_eq!(
            factory.build(&args).unwrap_err(),
            LayerError::underlying("strict mode unavailable")
        );
    }

    #[test]
    fn test_counting_factory() {
        let factory = mock::CountingFactory::default();
        let a = factory.build(&ArgList::new()).expect("build");
        let b = factory.build(&ArgList::new()).expect("build");
        assert_eq!(factory.live(), 2);
        drop(a);
        drop(b);
        assert_eq!(factory.live(), 0);
        assert_eq!(factory.built(), 2);
    }
}
