// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Class Registry: content-addressed generated CSS classes.
//!
//! This crate turns flat sets of CSS properties into generated class names
//! backed by rules in a single injected stylesheet, sharing one class among
//! every holder of the same content and removing the rule once the last
//! holder lets go.
//!
//! ## Core Concepts
//!
//! - [`PropertySet`] / [`CssValue`]: the author-facing property mapping.
//! - [`CanonicalStyle`] / [`Fingerprint`]: normalized declarations and their
//!   content hash. `backgroundColor` and `background-color` are the same
//!   property, and property order never matters.
//! - [`StyleRegistry`]: fingerprint → `{class name, reference count, rule}`.
//!   `acquire` creates or reuses, `release` counts down and cleans up.
//! - [`StyleInjector`]: the only writer to the document's injected sheet,
//!   addressed by class name. The document itself is abstracted by
//!   [`StyleDocument`] and [`StyleSheetTarget`].
//! - [`MemoryDocument`]: an in-memory document for tests and headless use.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_class_registry::{CanonicalStyle, MemoryDocument, PropertySet, StyleRegistry};
//!
//! let mut registry = StyleRegistry::new(MemoryDocument::new());
//!
//! let heading = PropertySet::new().with("color", "red").with("fontWeight", 700);
//! let style = CanonicalStyle::from_properties(&heading).unwrap();
//!
//! let class = registry.acquire_style(&style);
//! let sheet = registry.sheet().unwrap();
//! assert_eq!(sheet.computed_value(&class, "font-weight"), Some("700"));
//!
//! registry.release(style.fingerprint());
//! assert!(registry.sheet().unwrap().is_empty());
//! ```
//!
//! ## Threading
//!
//! Everything here is single-threaded: class names are `Rc`-backed and the
//! registry is meant to be owned by one document's context.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod fingerprint;
mod memory;
mod registry;
mod sheet;
mod value;

pub use fingerprint::{CanonicalStyle, Fingerprint, canonicalize, normalize_property_name};
pub use memory::{MemoryDocument, MemorySheet};
pub use registry::{ClassName, RegistryBuilder, RegistryEntry, Release, StyleRegistry};
pub use sheet::{StyleDocument, StyleInjector, StyleSheetTarget};
pub use value::{CssValue, InvalidStyleValue, PropertySet, ValueProblem};
