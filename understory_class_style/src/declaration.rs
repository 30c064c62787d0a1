// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style declarations and the blocks they produce.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;

use thiserror::Error;
use understory_class_registry::PropertySet;

/// The output of one evaluation of a [`StyleDeclaration`]: logical key →
/// property set.
///
/// Keys are chosen by the component author and are what templates look up
/// in the [`StyleMap`](crate::StyleMap).
///
/// # Example
///
/// ```rust
/// use understory_class_registry::PropertySet;
/// use understory_class_style::StyleBlockSet;
///
/// let blocks = StyleBlockSet::new()
///     .with("title", PropertySet::new().with("color", "red"))
///     .with("body", PropertySet::new().with("lineHeight", 1.5));
///
/// assert_eq!(blocks.len(), 2);
/// assert!(blocks.get("title").is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleBlockSet {
    blocks: BTreeMap<String, PropertySet>,
}

impl StyleBlockSet {
    /// Creates an empty block set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block and returns the set, for chained construction.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, props: PropertySet) -> Self {
        self.insert(key, props);
        self
    }

    /// Sets the block for `key`, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, props: PropertySet) {
        self.blocks.insert(key.into(), props);
    }

    /// Returns the block for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertySet> {
        self.blocks.get(key)
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if there are no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates blocks in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertySet)> + '_ {
        self.blocks.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, PropertySet)> for StyleBlockSet {
    fn from_iter<I: IntoIterator<Item = (K, PropertySet)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, props) in iter {
            set.insert(key, props);
        }
        set
    }
}

/// A style declaration failed to produce a block set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("style declaration failed: {message}")]
pub struct DeclarationError {
    message: String,
}

impl DeclarationError {
    /// Creates an error carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A per-instance, side-effect-free function of the instance's state.
///
/// Implementations read whatever reactive state they captured and return
/// the current blocks. They are re-evaluated every time that state changes.
/// Any `Fn() -> Result<StyleBlockSet, DeclarationError>` closure is a
/// declaration.
pub trait StyleDeclaration {
    /// Evaluates the declaration against the current state.
    fn evaluate(&self) -> Result<StyleBlockSet, DeclarationError>;
}

impl<F> StyleDeclaration for F
where
    F: Fn() -> Result<StyleBlockSet, DeclarationError>,
{
    fn evaluate(&self) -> Result<StyleBlockSet, DeclarationError> {
        self()
    }
}

impl fmt::Debug for dyn StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StyleDeclaration")
    }
}
