// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-instance reconciliation of a style declaration against the registry.
//!
//! A [`StyleBinder`] remembers which fingerprint it holds for each logical
//! key. Every evaluation of its declaration is diffed against that record:
//! unchanged keys keep their class without touching the registry, changed
//! and new keys acquire, and stale fingerprints are released. Only after the
//! registry work for an evaluation is finished is the new [`StyleMap`]
//! published, in one swap.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use understory_class_registry::{
    CanonicalStyle, ClassName, Fingerprint, InvalidStyleValue, StyleDocument, StyleRegistry,
};

use crate::declaration::StyleDeclaration;
use crate::error::StyleError;
use crate::style_map::StyleMap;

/// How a key whose content changed gets its new class.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Acquire the class for the new content and release the old one. The
    /// key's class name changes with its content, and instances with equal
    /// content keep sharing classes.
    #[default]
    Rotate,
    /// When the old class is held by this key alone and the new content has
    /// no class yet, rewrite the old class's rule in place so the key keeps
    /// its class name. Falls back to [`Rotate`](Self::Rotate) otherwise.
    InPlace,
}

/// Lifecycle phase of a [`StyleBinder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinderPhase {
    /// Holds no registry references.
    Unmounted,
    /// Holds one registry reference per bound key.
    Mounted,
}

/// Result of a completed mount or update.
#[derive(Clone, Debug)]
pub struct Reconciled {
    /// The newly published map.
    pub style_map: StyleMap,
    /// Properties that were rejected and left out of their blocks.
    pub rejected: Vec<InvalidStyleValue>,
}

#[derive(Clone, Debug)]
struct Held {
    fingerprint: Fingerprint,
    class_name: ClassName,
}

/// Binds one component instance's style declaration to generated classes.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use understory_class_registry::{MemoryDocument, PropertySet, StyleRegistry};
/// use understory_class_style::{StyleBinder, StyleBlockSet};
///
/// let mut registry = StyleRegistry::new(MemoryDocument::new());
/// let color = Rc::new(RefCell::new(String::from("blue")));
///
/// let state = color.clone();
/// let mut binder = StyleBinder::new(Rc::new(move || {
///     Ok(StyleBlockSet::new().with(
///         "a",
///         PropertySet::new().with("backgroundColor", state.borrow().as_str()),
///     ))
/// }));
///
/// let mounted = binder.mount(&mut registry).unwrap();
/// let class = mounted.style_map.class("a").to_owned();
/// assert_eq!(
///     registry.sheet().unwrap().computed_value(&class, "background-color"),
///     Some("blue"),
/// );
///
/// *color.borrow_mut() = "cyan".into();
/// let updated = binder.update(&mut registry).unwrap();
/// let class = updated.style_map.class("a");
/// assert_eq!(
///     registry.sheet().unwrap().computed_value(class, "background-color"),
///     Some("cyan"),
/// );
///
/// binder.unmount(&mut registry);
/// assert!(registry.is_empty());
/// ```
#[derive(Debug)]
pub struct StyleBinder {
    declaration: Rc<dyn StyleDeclaration>,
    strategy: UpdateStrategy,
    phase: BinderPhase,
    held: BTreeMap<String, Held>,
    published: StyleMap,
}

impl StyleBinder {
    /// Creates an unmounted binder for `declaration` using [`UpdateStrategy::Rotate`].
    #[must_use]
    pub fn new(declaration: Rc<dyn StyleDeclaration>) -> Self {
        Self::with_strategy(declaration, UpdateStrategy::default())
    }

    /// Creates an unmounted binder with an explicit update strategy.
    #[must_use]
    pub fn with_strategy(declaration: Rc<dyn StyleDeclaration>, strategy: UpdateStrategy) -> Self {
        Self {
            declaration,
            strategy,
            phase: BinderPhase::Unmounted,
            held: BTreeMap::new(),
            published: StyleMap::default(),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> BinderPhase {
        self.phase
    }

    /// Returns the update strategy.
    #[must_use]
    pub fn strategy(&self) -> UpdateStrategy {
        self.strategy
    }

    /// Returns the most recently published map.
    #[must_use]
    pub fn style_map(&self) -> &StyleMap {
        &self.published
    }

    /// Returns the fingerprint currently held for `key`.
    #[must_use]
    pub fn fingerprint(&self, key: &str) -> Option<Fingerprint> {
        self.held.get(key).map(|h| h.fingerprint)
    }

    /// Evaluates the declaration and acquires a class for every key.
    ///
    /// The binder is mounted afterwards even if the declaration fails; in
    /// that case it publishes an empty map and a later
    /// [`update`](Self::update) can recover. Mounting a mounted binder is an
    /// update.
    pub fn mount<D: StyleDocument>(
        &mut self,
        registry: &mut StyleRegistry<D>,
    ) -> Result<Reconciled, StyleError> {
        if self.phase == BinderPhase::Mounted {
            tracing::debug!("mount of an already mounted style binder, updating instead");
            return self.update(registry);
        }
        self.phase = BinderPhase::Mounted;
        self.reconcile(registry)
    }

    /// Re-evaluates the declaration and reconciles changed keys.
    ///
    /// If the declaration fails, nothing is acquired or released and the
    /// previous map stays published. Updating an unmounted binder does
    /// nothing.
    pub fn update<D: StyleDocument>(
        &mut self,
        registry: &mut StyleRegistry<D>,
    ) -> Result<Reconciled, StyleError> {
        if self.phase == BinderPhase::Unmounted {
            tracing::debug!("update of an unmounted style binder ignored");
            return Ok(Reconciled {
                style_map: self.published.clone(),
                rejected: Vec::new(),
            });
        }
        self.reconcile(registry)
    }

    /// Releases every held fingerprint and publishes an empty map.
    pub fn unmount<D: StyleDocument>(&mut self, registry: &mut StyleRegistry<D>) {
        for (_, held) in core::mem::take(&mut self.held) {
            registry.release(held.fingerprint);
        }
        self.published = StyleMap::default();
        self.phase = BinderPhase::Unmounted;
    }

    fn reconcile<D: StyleDocument>(
        &mut self,
        registry: &mut StyleRegistry<D>,
    ) -> Result<Reconciled, StyleError> {
        let blocks = self.declaration.evaluate().inspect_err(|err| {
            tracing::warn!(error = %err, "style declaration rejected, keeping previous styles");
        })?;

        let mut previous = core::mem::take(&mut self.held);
        let mut next = BTreeMap::new();
        let mut stale = Vec::new();
        let mut rejected = Vec::new();

        for (key, props) in blocks.iter() {
            let (style, mut bad) = CanonicalStyle::from_properties_lossy(props);
            for err in &bad {
                tracing::warn!(key, error = %err, "style property rejected");
            }
            rejected.append(&mut bad);

            let fingerprint = style.fingerprint();
            let held = match previous.remove(key) {
                Some(held) if held.fingerprint == fingerprint => held,
                // Re-key only an entry nobody else holds into content that is
                // not live yet. Anything else rotates with a deferred release.
                Some(held)
                    if self.strategy == UpdateStrategy::InPlace
                        && registry.ref_count(held.fingerprint) == 1
                        && registry.get(fingerprint).is_none() =>
                {
                    let rule = |class: &str| style.rule_text(class);
                    let class_name = registry.reassign(held.fingerprint, fingerprint, rule);
                    Held {
                        fingerprint,
                        class_name,
                    }
                }
                Some(held) => {
                    stale.push(held.fingerprint);
                    Held {
                        fingerprint,
                        class_name: registry.acquire_style(&style),
                    }
                }
                None => Held {
                    fingerprint,
                    class_name: registry.acquire_style(&style),
                },
            };
            next.insert(key.to_owned(), held);
        }

        // Keys that disappeared from the declaration.
        stale.extend(previous.into_values().map(|held| held.fingerprint));
        for fingerprint in stale {
            registry.release(fingerprint);
        }

        let classes = next
            .iter()
            .map(|(key, held)| (key.clone(), held.class_name.clone()))
            .collect();
        self.held = next;
        self.published = StyleMap::from_classes(classes);

        Ok(Reconciled {
            style_map: self.published.clone(),
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{DeclarationError, StyleBlockSet};
    use core::cell::RefCell;
    use understory_class_registry::{MemoryDocument, PropertySet, Release};

    type Blocks = Rc<RefCell<Result<StyleBlockSet, DeclarationError>>>;

    /// A binder whose declaration returns whatever is stored in the handle.
    fn scripted(strategy: UpdateStrategy) -> (StyleBinder, Blocks) {
        let blocks: Blocks = Rc::new(RefCell::new(Ok(StyleBlockSet::new())));
        let source = blocks.clone();
        let binder = StyleBinder::with_strategy(Rc::new(move || source.borrow().clone()), strategy);
        (binder, blocks)
    }

    fn color(value: &str) -> PropertySet {
        PropertySet::new().with("color", value)
    }

    fn set(blocks: &Blocks, value: StyleBlockSet) {
        *blocks.borrow_mut() = Ok(value);
    }

    #[test]
    fn mount_acquires_every_key() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("blue")),
        );

        let mounted = binder.mount(&mut registry).unwrap();
        assert_eq!(binder.phase(), BinderPhase::Mounted);
        assert_eq!(mounted.style_map.len(), 2);
        assert_ne!(mounted.style_map.class("a"), mounted.style_map.class("b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn keys_with_equal_content_share_a_class() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("red")),
        );

        let map = binder.mount(&mut registry).unwrap().style_map;
        assert_eq!(map.class("a"), map.class("b"));
        let fp = binder.fingerprint("a").unwrap();
        assert_eq!(registry.ref_count(fp), 2);

        binder.unmount(&mut registry);
        assert_eq!(registry.ref_count(fp), 0);
        assert!(registry.sheet().unwrap().is_empty());
    }

    #[test]
    fn unchanged_keys_keep_their_class() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("blue")),
        );
        let before = binder.mount(&mut registry).unwrap().style_map;

        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("green")),
        );
        let after = binder.update(&mut registry).unwrap().style_map;

        assert_eq!(before.class("a"), after.class("a"));
        assert_ne!(before.class("b"), after.class("b"));
        assert!(!before.ptr_eq(&after));
        // The old "b" rule is gone; only "a" and the new "b" remain.
        assert_eq!(registry.sheet().unwrap().len(), 2);
    }

    #[test]
    fn removed_keys_are_released_and_new_keys_acquired() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(&blocks, StyleBlockSet::new().with("a", color("red")));
        binder.mount(&mut registry).unwrap();
        let red = binder.fingerprint("a").unwrap();

        set(&blocks, StyleBlockSet::new().with("b", color("blue")));
        let map = binder.update(&mut registry).unwrap().style_map;

        assert!(!map.contains_key("a"));
        assert!(map.contains_key("b"));
        assert_eq!(registry.ref_count(red), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn swapped_contents_do_not_churn_rules() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("blue")),
        );
        let before = binder.mount(&mut registry).unwrap().style_map;

        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("blue"))
                .with("b", color("red")),
        );
        let after = binder.update(&mut registry).unwrap().style_map;

        assert_eq!(before.class("a"), after.class("b"));
        assert_eq!(before.class("b"), after.class("a"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn failed_declaration_keeps_previous_map() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(&blocks, StyleBlockSet::new().with("a", color("red")));
        let before = binder.mount(&mut registry).unwrap().style_map;

        *blocks.borrow_mut() = Err(DeclarationError::new("boom"));
        let err = binder.update(&mut registry).unwrap_err();

        assert_eq!(
            err,
            StyleError::InvalidStyleDeclaration(DeclarationError::new("boom"))
        );
        assert!(binder.style_map().ptr_eq(&before));
        assert_eq!(registry.ref_count(binder.fingerprint("a").unwrap()), 1);
    }

    #[test]
    fn failed_mount_publishes_empty_map_and_can_recover() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        *blocks.borrow_mut() = Err(DeclarationError::new("not ready"));

        assert!(binder.mount(&mut registry).is_err());
        assert_eq!(binder.phase(), BinderPhase::Mounted);
        assert!(binder.style_map().is_empty());

        set(&blocks, StyleBlockSet::new().with("a", color("red")));
        let map = binder.update(&mut registry).unwrap().style_map;
        assert!(map.contains_key("a"));
    }

    #[test]
    fn invalid_property_is_dropped_not_fatal() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(
            &blocks,
            StyleBlockSet::new()
                .with(
                    "a",
                    PropertySet::new()
                        .with("color", "red")
                        .with("width", f64::NAN),
                )
                .with("b", color("blue")),
        );

        let mounted = binder.mount(&mut registry).unwrap();
        assert_eq!(mounted.rejected.len(), 1);
        assert_eq!(mounted.rejected[0].property, "width");

        let sheet = registry.sheet().unwrap();
        let a = mounted.style_map.class("a");
        assert_eq!(sheet.computed_value(a, "color"), Some("red"));
        assert_eq!(sheet.computed_value(a, "width"), None);
        assert_eq!(
            sheet.computed_value(mounted.style_map.class("b"), "color"),
            Some("blue")
        );
    }

    #[test]
    fn in_place_strategy_keeps_class_name() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::InPlace);
        set(&blocks, StyleBlockSet::new().with("a", color("blue")));
        let before = binder.mount(&mut registry).unwrap().style_map;

        set(&blocks, StyleBlockSet::new().with("a", color("cyan")));
        let after = binder.update(&mut registry).unwrap().style_map;

        assert_eq!(before.class("a"), after.class("a"));
        let sheet = registry.sheet().unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(
            sheet.computed_value(after.class("a"), "color"),
            Some("cyan")
        );
    }

    #[test]
    fn in_place_strategy_rotates_shared_classes() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut first, first_blocks) = scripted(UpdateStrategy::InPlace);
        let (mut second, second_blocks) = scripted(UpdateStrategy::InPlace);
        set(&first_blocks, StyleBlockSet::new().with("a", color("blue")));
        set(
            &second_blocks,
            StyleBlockSet::new().with("a", color("blue")),
        );
        let shared = first.mount(&mut registry).unwrap().style_map;
        second.mount(&mut registry).unwrap();

        set(&first_blocks, StyleBlockSet::new().with("a", color("cyan")));
        let moved = first.update(&mut registry).unwrap().style_map;

        assert_ne!(shared.class("a"), moved.class("a"));
        let sheet = registry.sheet().unwrap();
        assert_eq!(
            sheet.computed_value(second.style_map().class("a"), "color"),
            Some("blue")
        );
    }

    #[test]
    fn in_place_swap_does_not_churn_rules() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::InPlace);
        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("red"))
                .with("b", color("blue")),
        );
        let before = binder.mount(&mut registry).unwrap().style_map;

        set(
            &blocks,
            StyleBlockSet::new()
                .with("a", color("blue"))
                .with("b", color("red")),
        );
        let after = binder.update(&mut registry).unwrap().style_map;

        assert_eq!(after.class("a"), before.class("b"));
        assert_eq!(after.class("b"), before.class("a"));
        assert_eq!(registry.len(), 2);
        let sheet = registry.sheet().unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(
            sheet.computed_value(after.class("a"), "color"),
            Some("blue")
        );
        assert_eq!(
            sheet.computed_value(after.class("b"), "color"),
            Some("red")
        );
    }

    #[test]
    fn unmount_then_update_is_ignored() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(&blocks, StyleBlockSet::new().with("a", color("red")));
        binder.mount(&mut registry).unwrap();
        let fp = binder.fingerprint("a").unwrap();

        binder.unmount(&mut registry);
        assert_eq!(binder.phase(), BinderPhase::Unmounted);
        assert!(binder.style_map().is_empty());
        assert_eq!(registry.release(fp), Release::NotLive);

        let result = binder.update(&mut registry).unwrap();
        assert!(result.style_map.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn remount_after_unmount() {
        let mut registry = StyleRegistry::new(MemoryDocument::new());
        let (mut binder, blocks) = scripted(UpdateStrategy::Rotate);
        set(&blocks, StyleBlockSet::new().with("a", color("red")));
        binder.mount(&mut registry).unwrap();
        binder.unmount(&mut registry);

        let map = binder.mount(&mut registry).unwrap().style_map;
        assert!(map.contains_key("a"));
        assert_eq!(registry.len(), 1);
    }
}
