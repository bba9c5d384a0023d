// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filter argument lists.
//!
//! Arguments are plain strings, usually `key=value` pairs (`mode=x`) or bare
//! flags (`strict`). Cloning an [`ArgList`] is a deep copy.

use std::fmt;

/// Ordered list of filter arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<String>,
}

impl ArgList {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if the list has no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Append an argument.
    pub fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Iterate over raw arguments.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }

    /// Value of the first `key=value` argument with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter()
            .filter_map(split_pair)
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Check for a bare flag or a `key=...` pair.
    pub fn contains_key(&self, key: &str) -> bool {
        self.iter().any(|a| arg_key(a) == key)
    }

    /// Merge `defaults` underneath this list.
    ///
    /// Defaults come first; any default whose key is also given explicitly is
    /// dropped, so explicit arguments always win.
    pub fn with_defaults(&self, defaults: &ArgList) -> ArgList {
        let mut merged: Vec<String> = defaults
            .iter()
            .filter(|d| !self.contains_key(arg_key(d)))
            .map(str::to_string)
            .collect();
        merged.extend(self.args.iter().cloned());
        ArgList { args: merged }
    }
}

fn split_pair(arg: &str) -> Option<(&str, &str)> {
    arg.split_once('=')
}

fn arg_key(arg: &str) -> &str {
    split_pair(arg).map(|(k, _)| k).unwrap_or(arg)
}

impl<S: Into<String>> FromIterator<S> for ArgList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for ArgList {
    fn from(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl From<&[&str]> for ArgList {
    fn from(args: &[&str]) -> Self {
        args.iter().copied().collect()
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(","))
    }
}
