// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The read-only key → class name view handed to templates.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;

use understory_class_registry::ClassName;

/// An immutable snapshot of an instance's logical key → class name mapping.
///
/// Each completed mount or update publishes a new snapshot in one step, so a
/// holder never sees a partially updated key set. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use understory_class_style::StyleMap;
///
/// let map = StyleMap::default();
/// assert_eq!(map.get("a"), None);
/// // Templates can bind `class` directly; a missing key binds no class.
/// assert_eq!(map.class("a"), "");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleMap {
    classes: Rc<BTreeMap<String, ClassName>>,
}

impl StyleMap {
    pub(crate) fn from_classes(classes: BTreeMap<String, ClassName>) -> Self {
        Self {
            classes: Rc::new(classes),
        }
    }

    /// Returns the class bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ClassName> {
        self.classes.get(key)
    }

    /// Returns the class bound to `key`, or `""` if there is none.
    #[must_use]
    pub fn class(&self, key: &str) -> &str {
        self.classes.get(key).map_or("", ClassName::as_str)
    }

    /// Returns `true` if `key` is bound.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.classes.contains_key(key)
    }

    /// Returns the number of bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no keys are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassName)> + '_ {
        self.classes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if both maps are the same published snapshot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.classes, &other.classes)
    }
}
