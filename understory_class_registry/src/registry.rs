// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content-addressed, reference-counted class registry.
//!
//! [`StyleRegistry`] maps a [`Fingerprint`] to the class generated for it and
//! counts how many holders share it. The first `acquire` of a fingerprint
//! allocates a class name and injects its rule; the last `release` removes
//! the rule again. This keeps the injected sheet bounded by the number of
//! distinct styles alive at once, however many mount/unmount cycles a page
//! goes through.

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;
use core::num::NonZeroUsize;
use core::ops::Deref;

use hashbrown::HashMap;

use crate::fingerprint::{CanonicalStyle, Fingerprint};
use crate::sheet::{StyleDocument, StyleInjector};

/// A generated class name.
///
/// Cheap to clone. Unique among the fingerprints alive in its registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassName(Rc<str>);

impl ClassName {
    /// Returns the class name as a string slice.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ClassName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live registry entry.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    class_name: ClassName,
    refs: NonZeroUsize,
    rule: String,
}

impl RegistryEntry {
    /// Returns the generated class name.
    #[must_use]
    pub fn class_name(&self) -> &ClassName {
        &self.class_name
    }

    /// Returns the number of holders. Always at least one.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.refs.get()
    }

    /// Returns the injected rule text.
    #[must_use]
    pub fn rule_text(&self) -> &str {
        &self.rule
    }
}

/// Outcome of [`StyleRegistry::release`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Release {
    /// Other holders remain; the rule stays.
    Retained {
        /// Remaining holders.
        refs: usize,
    },
    /// That was the last holder; the rule was removed.
    Removed,
    /// No entry was live for the fingerprint. Nothing happened.
    NotLive,
}

const DEFAULT_CLASS_PREFIX: &str = "s-";

/// Builder for [`StyleRegistry`].
///
/// # Example
///
/// ```rust
/// use understory_class_registry::{MemoryDocument, PropertySet, CanonicalStyle, RegistryBuilder};
///
/// let mut registry = RegistryBuilder::new()
///     .class_prefix("ui-")
///     .build(MemoryDocument::new());
///
/// let style = CanonicalStyle::from_properties(&PropertySet::new().with("color", "red")).unwrap();
/// let class = registry.acquire_style(&style);
/// assert!(class.starts_with("ui-"));
/// ```
#[derive(Clone, Debug)]
pub struct RegistryBuilder {
    class_prefix: String,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            class_prefix: DEFAULT_CLASS_PREFIX.to_owned(),
        }
    }
}

impl RegistryBuilder {
    /// Creates a builder with the default class prefix, `s-`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix every generated class name starts with.
    #[must_use]
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Builds a registry that injects into `document`.
    ///
    /// # Panics
    ///
    /// Panics if the class prefix cannot start a CSS class selector: it must
    /// be non-empty, start with an ASCII letter, `_` or `-`, and contain only
    /// ASCII alphanumerics, `_` and `-`.
    #[must_use]
    pub fn build<D: StyleDocument>(self, document: D) -> StyleRegistry<D> {
        assert!(
            valid_prefix(&self.class_prefix),
            "invalid class prefix {:?}",
            self.class_prefix
        );
        StyleRegistry {
            entries: HashMap::new(),
            injector: StyleInjector::new(document),
            class_prefix: self.class_prefix,
            next_serial: 0,
        }
    }
}

fn valid_prefix(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    let starts_selector = match bytes {
        [] | [b'-'] => false,
        [b'-', second, ..] => !second.is_ascii_digit(),
        [first, ..] => first.is_ascii_alphabetic() || matches!(*first, b'_' | b'-'),
    };
    starts_selector
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(*b, b'_' | b'-'))
}

/// The registry of live generated classes for one document.
///
/// The registry is the only writer to its [`StyleInjector`]: every rule in
/// the injected sheet corresponds to exactly one live entry.
///
/// # Example
///
/// ```rust
/// use understory_class_registry::{
///     CanonicalStyle, MemoryDocument, PropertySet, Release, StyleRegistry,
/// };
///
/// let mut registry = StyleRegistry::new(MemoryDocument::new());
/// let red = CanonicalStyle::from_properties(&PropertySet::new().with("color", "red")).unwrap();
///
/// let first = registry.acquire_style(&red);
/// let second = registry.acquire_style(&red);
/// assert_eq!(first, second);
/// assert_eq!(registry.sheet().unwrap().len(), 1);
///
/// assert_eq!(registry.release(red.fingerprint()), Release::Retained { refs: 1 });
/// assert_eq!(registry.release(red.fingerprint()), Release::Removed);
/// assert!(registry.sheet().unwrap().is_empty());
/// ```
pub struct StyleRegistry<D: StyleDocument> {
    entries: HashMap<Fingerprint, RegistryEntry>,
    injector: StyleInjector<D>,
    class_prefix: String,
    /// Serial of the next generated class; never reused.
    next_serial: u64,
}

impl<D: StyleDocument> StyleRegistry<D> {
    /// Creates a registry with default settings.
    #[must_use]
    pub fn new(document: D) -> Self {
        RegistryBuilder::new().build(document)
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the live entry for `fingerprint`.
    #[must_use]
    pub fn get(&self, fingerprint: Fingerprint) -> Option<&RegistryEntry> {
        self.entries.get(&fingerprint)
    }

    /// Returns the class name of the live entry for `fingerprint`.
    #[must_use]
    pub fn class_name(&self, fingerprint: Fingerprint) -> Option<&ClassName> {
        self.get(fingerprint).map(RegistryEntry::class_name)
    }

    /// Returns the number of holders of `fingerprint`, zero if not live.
    #[must_use]
    pub fn ref_count(&self, fingerprint: Fingerprint) -> usize {
        self.get(fingerprint).map_or(0, RegistryEntry::ref_count)
    }

    /// Iterates live entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Fingerprint, &RegistryEntry)> + '_ {
        self.entries.iter().map(|(fp, entry)| (*fp, entry))
    }

    /// Returns the document the registry injects into.
    #[must_use]
    pub fn document(&self) -> &D {
        self.injector.document()
    }

    /// Returns the injected sheet, if any rule was ever inserted.
    #[must_use]
    pub fn sheet(&self) -> Option<&D::Sheet> {
        self.injector.sheet()
    }

    /// Takes a reference on `fingerprint` and returns its class name.
    ///
    /// If the fingerprint is already live, only its count changes. Otherwise
    /// a fresh class name is generated, `rule_text` is called with it, and
    /// the resulting rule is injected.
    pub fn acquire(
        &mut self,
        fingerprint: Fingerprint,
        rule_text: impl FnOnce(&str) -> String,
    ) -> ClassName {
        if let Some(entry) = self.entries.get_mut(&fingerprint) {
            entry.refs = entry.refs.saturating_add(1);
            return entry.class_name.clone();
        }

        let class_name = self.next_class_name();
        let rule = rule_text(class_name.as_str());
        self.injector.insert_rule(&class_name, &rule);
        tracing::debug!(class = %class_name, ?fingerprint, "created style entry");
        self.entries.insert(
            fingerprint,
            RegistryEntry {
                class_name: class_name.clone(),
                refs: NonZeroUsize::MIN,
                rule,
            },
        );
        class_name
    }

    /// Acquires the fingerprint of `style`, rendering its rule if needed.
    pub fn acquire_style(&mut self, style: &CanonicalStyle) -> ClassName {
        self.acquire(style.fingerprint(), |class| style.rule_text(class))
    }

    /// Drops a reference on `fingerprint`.
    ///
    /// When the last reference goes, the entry is deleted and its rule
    /// removed from the sheet. Releasing a fingerprint that is not live does
    /// nothing and returns [`Release::NotLive`].
    pub fn release(&mut self, fingerprint: Fingerprint) -> Release {
        let Some(entry) = self.entries.get_mut(&fingerprint) else {
            tracing::debug!(?fingerprint, "release of a style entry that is not live");
            return Release::NotLive;
        };
        if let Some(refs) = NonZeroUsize::new(entry.refs.get() - 1) {
            entry.refs = refs;
            return Release::Retained { refs: refs.get() };
        }
        if let Some(entry) = self.entries.remove(&fingerprint) {
            self.injector.remove_rule(&entry.class_name);
            tracing::debug!(class = %entry.class_name, ?fingerprint, "removed style entry");
        }
        Release::Removed
    }

    /// Moves one reference from `old` to `new`, reusing the class in place
    /// when possible.
    ///
    /// If `old` is held only by the caller and `new` is not live yet, the
    /// entry is re-keyed to `new`: the class name stays the same and its
    /// rule text is replaced in the sheet. Otherwise this is an
    /// [`acquire`](Self::acquire) of `new` followed by a
    /// [`release`](Self::release) of `old`.
    pub fn reassign(
        &mut self,
        old: Fingerprint,
        new: Fingerprint,
        rule_text: impl FnOnce(&str) -> String,
    ) -> ClassName {
        if old == new {
            // The caller's reference on `old` already covers `new`.
            if let Some(entry) = self.entries.get(&new) {
                return entry.class_name.clone();
            }
            return self.acquire(new, rule_text);
        }
        let exclusive = self.ref_count(old) == 1 && !self.entries.contains_key(&new);
        if exclusive && let Some(mut entry) = self.entries.remove(&old) {
            entry.rule = rule_text(entry.class_name.as_str());
            self.injector.replace_rule(&entry.class_name, &entry.rule);
            tracing::debug!(
                class = %entry.class_name,
                from = ?old,
                to = ?new,
                "re-keyed style entry"
            );
            let class_name = entry.class_name.clone();
            self.entries.insert(new, entry);
            return class_name;
        }
        let class_name = self.acquire(new, rule_text);
        self.release(old);
        class_name
    }

    fn next_class_name(&mut self) -> ClassName {
        let serial = self.next_serial;
        self.next_serial += 1;
        ClassName(Rc::from(format!("{}{serial:x}", self.class_prefix)))
    }
}

impl<D> fmt::Debug for StyleRegistry<D>
where
    D: StyleDocument + fmt::Debug,
    D::Sheet: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleRegistry")
            .field("entries", &self.entries.len())
            .field("class_prefix", &self.class_prefix)
            .field("next_serial", &self.next_serial)
            .field("injector", &self.injector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use crate::value::PropertySet;

    fn style(name: &str, value: &str) -> CanonicalStyle {
        CanonicalStyle::from_properties(&PropertySet::new().with(name, value)).unwrap()
    }

    #[test]
    fn acquire_dedups_by_content() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let red = style("color", "red");

        let a = registry.acquire_style(&red);
        let b = registry.acquire_style(&red);

        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ref_count(red.fingerprint()), 2);
        assert_eq!(registry.sheet().unwrap().len(), 1);
    }

    #[test]
    fn distinct_content_gets_distinct_classes() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let a = registry.acquire_style(&style("color", "red"));
        let b = registry.acquire_style(&style("color", "blue"));
        assert_ne!(a, b);
        assert_eq!(registry.sheet().unwrap().len(), 2);
    }

    #[test]
    fn rule_factory_runs_once_per_entry() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let red = style("color", "red");
        let mut calls = 0;
        registry.acquire(red.fingerprint(), |c| {
            calls += 1;
            red.rule_text(c)
        });
        registry.acquire(red.fingerprint(), |c| {
            calls += 1;
            red.rule_text(c)
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn last_release_removes_rule() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let red = style("color", "red");
        let class = registry.acquire_style(&red);
        registry.acquire_style(&red);

        assert_eq!(
            registry.release(red.fingerprint()),
            Release::Retained { refs: 1 }
        );
        assert!(registry.sheet().unwrap().rule_for(&class).is_some());

        assert_eq!(registry.release(red.fingerprint()), Release::Removed);
        assert!(registry.sheet().unwrap().rule_for(&class).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn double_release_is_a_no_op() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let red = style("color", "red");
        let blue = style("color", "blue");
        registry.acquire_style(&red);
        registry.acquire_style(&blue);

        assert_eq!(registry.release(red.fingerprint()), Release::Removed);
        assert_eq!(registry.release(red.fingerprint()), Release::NotLive);
        assert_eq!(registry.ref_count(blue.fingerprint()), 1);
        assert_eq!(registry.sheet().unwrap().len(), 1);
    }

    #[test]
    fn class_names_are_never_reused() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let red = style("color", "red");
        let first = registry.acquire_style(&red);
        registry.release(red.fingerprint());
        let second = registry.acquire_style(&red);
        assert_ne!(first, second);
    }

    #[test]
    fn reassign_rekeys_exclusive_entry() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let blue = style("background-color", "blue");
        let cyan = style("background-color", "cyan");

        let class = registry.acquire_style(&blue);
        let (from, to) = (blue.fingerprint(), cyan.fingerprint());
        let moved = registry.reassign(from, to, |c| cyan.rule_text(c));

        assert_eq!(class, moved);
        assert_eq!(registry.ref_count(blue.fingerprint()), 0);
        assert_eq!(registry.ref_count(cyan.fingerprint()), 1);
        let sheet = registry.sheet().unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(
            sheet.computed_value(&class, "background-color"),
            Some("cyan")
        );
    }

    #[test]
    fn reassign_rotates_shared_entry() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let blue = style("background-color", "blue");
        let cyan = style("background-color", "cyan");

        let shared = registry.acquire_style(&blue);
        registry.acquire_style(&blue);
        let (from, to) = (blue.fingerprint(), cyan.fingerprint());
        let moved = registry.reassign(from, to, |c| cyan.rule_text(c));

        assert_ne!(shared, moved);
        assert_eq!(registry.ref_count(blue.fingerprint()), 1);
        assert_eq!(registry.ref_count(cyan.fingerprint()), 1);
        assert_eq!(
            registry.sheet().unwrap().computed_value(&shared, "background-color"),
            Some("blue")
        );
    }

    #[test]
    fn reassign_joins_live_target() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let blue = style("color", "blue");
        let red = style("color", "red");

        registry.acquire_style(&blue);
        let red_class = registry.acquire_style(&red);
        let (from, to) = (blue.fingerprint(), red.fingerprint());
        let moved = registry.reassign(from, to, |c| red.rule_text(c));

        assert_eq!(moved, red_class);
        assert_eq!(registry.ref_count(red.fingerprint()), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn custom_prefix() {
        let mut registry = RegistryBuilder::new()
            .class_prefix("_x")
            .build(MemoryDocument::new());
        let class = registry.acquire_style(&style("color", "red"));
        assert_eq!(class.as_str(), "_x0");
    }

    #[test]
    #[should_panic(expected = "invalid class prefix")]
    fn prefix_must_start_a_selector() {
        let _ = RegistryBuilder::new()
            .class_prefix("9lives")
            .build(MemoryDocument::new());
    }

    #[test]
    #[should_panic(expected = "invalid class prefix")]
    fn lone_hyphen_prefix_is_rejected() {
        // The first class would be "-0", which is not an identifier.
        let _ = RegistryBuilder::new()
            .class_prefix("-")
            .build(MemoryDocument::new());
    }

    #[test]
    fn prefix_validation() {
        assert!(valid_prefix("s-"));
        assert!(valid_prefix("-x"));
        assert!(valid_prefix("_"));
        assert!(!valid_prefix(""));
        assert!(!valid_prefix("-1"));
        assert!(!valid_prefix("-"));
        assert!(!valid_prefix("a b"));
        assert!(!valid_prefix("a.b"));
    }
}
