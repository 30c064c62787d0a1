// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Class Style: component style declarations bound to generated classes.
//!
//! A component supplies a [`StyleDeclaration`], a function of its reactive
//! state returning named blocks of CSS properties. This crate keeps one
//! generated class per block content in the document's injected stylesheet
//! (via [`understory_class_registry`]) and hands the component a [`StyleMap`]
//! of block name → class name for its template.
//!
//! ## Core Concepts
//!
//! - [`StyleBlockSet`]: one evaluation of a declaration.
//! - [`StyleBinder`]: per-instance state machine. Mount acquires a class per
//!   block, update diffs against what is held, unmount releases everything.
//!   Maps are published in one swap after all registry work is done.
//! - [`UpdateQueue`]: coalesces invalidations so a burst of changes within
//!   one tick yields one recompute per instance.
//! - [`StyleRuntime`] / [`StylePlugin`]: the lifecycle hook set a host
//!   framework installs once per application root.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use understory_class_registry::{MemoryDocument, PropertySet};
//! use understory_class_style::{
//!     Component, ComponentId, DeclarationError, LifecycleHooks, StyleBlockSet,
//!     StyleDeclaration, StyleError, StyleMap, StylePlugin, STYLE_CHANGE_EVENT,
//! };
//!
//! struct Button {
//!     color: Rc<RefCell<String>>,
//!     style: StyleMap,
//!     events: Vec<String>,
//! }
//!
//! impl Component for Button {
//!     fn id(&self) -> ComponentId {
//!         ComponentId(1)
//!     }
//!
//!     fn style_declaration(&self) -> Option<Rc<dyn StyleDeclaration>> {
//!         let color = self.color.clone();
//!         Some(Rc::new(move || -> Result<StyleBlockSet, DeclarationError> {
//!             let label = PropertySet::new().with("backgroundColor", color.borrow().as_str());
//!             Ok(StyleBlockSet::new().with("label", label))
//!         }))
//!     }
//!
//!     fn expose_style_map(&mut self, map: StyleMap) {
//!         self.style = map;
//!     }
//!
//!     fn emit(&mut self, event: &str) {
//!         self.events.push(event.to_owned());
//!     }
//!
//!     fn report_error(&mut self, error: StyleError) {
//!         panic!("{error}");
//!     }
//! }
//!
//! let runtime = StylePlugin::new(MemoryDocument::new()).build();
//! let mut button = Button {
//!     color: Rc::new(RefCell::new("blue".into())),
//!     style: StyleMap::default(),
//!     events: Vec::new(),
//! };
//!
//! runtime.mounted(&mut button);
//! *button.color.borrow_mut() = "cyan".into();
//! runtime.updated(&mut button);
//!
//! assert_eq!(button.events, [STYLE_CHANGE_EVENT]);
//! let registry = runtime.registry();
//! let sheet = registry.sheet().unwrap();
//! assert_eq!(
//!     sheet.computed_value(button.style.class("label"), "background-color"),
//!     Some("cyan"),
//! );
//! ```
//!
//! ## Threading
//!
//! Single-threaded. Hooks take `&self` and the runtime is shared with the
//! host through `Rc`.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod binder;
mod declaration;
mod error;
mod lifecycle;
mod queue;
mod style_map;

pub use binder::{BinderPhase, Reconciled, StyleBinder, UpdateStrategy};
pub use declaration::{DeclarationError, StyleBlockSet, StyleDeclaration};
pub use error::StyleError;
pub use lifecycle::{
    Component, ComponentId, ComponentLookup, Installation, LifecycleHooks, PLUGIN_NAME,
    PluginHost, STYLE_CHANGE_EVENT, StylePlugin, StyleRuntime, install,
};
pub use queue::UpdateQueue;
pub use style_map::StyleMap;
