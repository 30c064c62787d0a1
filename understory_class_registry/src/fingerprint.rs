// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canonical identity of a property set.
//!
//! [`CanonicalStyle`] normalizes property names, drops duplicates (later
//! wins), and sorts declarations by name. Its [`Fingerprint`] is a SHA-256
//! digest over an unambiguous, length-prefixed encoding of those
//! declarations, so it depends only on content: neither the logical key a
//! set was declared under nor the order its properties were written in
//! affects it.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::value::{CssValue, InvalidStyleValue, PropertySet, ValueProblem};

/// Content-derived identity of a [`PropertySet`].
///
/// Structurally equal sets (after name normalization, in any order) share a
/// fingerprint. Distinct sets differ with SHA-256 collision probability.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight bytes is plenty to tell entries apart in logs.
        f.write_str("Fingerprint(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        f.write_str("..)")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A normalized, sorted, validated property set and its fingerprint.
///
/// # Example
///
/// ```rust
/// use understory_class_registry::{CanonicalStyle, PropertySet};
///
/// let a = PropertySet::new().with("backgroundColor", "blue").with("color", "red");
/// let b = PropertySet::new().with("color", "red").with("background-color", "blue");
///
/// let a = CanonicalStyle::from_properties(&a).unwrap();
/// let b = CanonicalStyle::from_properties(&b).unwrap();
///
/// assert_eq!(a.fingerprint(), b.fingerprint());
/// assert_eq!(a.rule_text("s-0"), ".s-0 { background-color: blue; color: red; }");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalStyle {
    /// Sorted by normalized property name, no duplicates.
    declarations: Vec<(String, CssValue)>,
    fingerprint: Fingerprint,
}

impl CanonicalStyle {
    /// Canonicalizes `props`, failing on the first invalid property.
    pub fn from_properties(props: &PropertySet) -> Result<Self, InvalidStyleValue> {
        let mut sorted = BTreeMap::new();
        for (name, value) in props.iter() {
            let (name, value) = validate(name, value)?;
            sorted.insert(name, value);
        }
        Ok(Self::from_sorted(sorted))
    }

    /// Canonicalizes `props`, dropping invalid properties.
    ///
    /// Returns the style built from the valid properties together with one
    /// [`InvalidStyleValue`] per rejected property, in author order.
    #[must_use]
    pub fn from_properties_lossy(props: &PropertySet) -> (Self, Vec<InvalidStyleValue>) {
        let mut sorted = BTreeMap::new();
        let mut rejected = Vec::new();
        for (name, value) in props.iter() {
            match validate(name, value) {
                Ok((name, value)) => {
                    sorted.insert(name, value);
                }
                Err(err) => rejected.push(err),
            }
        }
        (Self::from_sorted(sorted), rejected)
    }

    fn from_sorted(sorted: BTreeMap<String, CssValue>) -> Self {
        let declarations: Vec<_> = sorted.into_iter().collect();
        let fingerprint = digest(&declarations);
        Self {
            declarations,
            fingerprint,
        }
    }

    /// Returns the content fingerprint.
    #[must_use]
    #[inline]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` if there are no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Iterates declarations in canonical order.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &CssValue)> + '_ {
        self.declarations.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Renders a self-contained rule for `class_name`.
    #[must_use]
    pub fn rule_text(&self, class_name: &str) -> String {
        let mut out = String::with_capacity(16 + class_name.len() + 24 * self.len());
        out.push('.');
        out.push_str(class_name);
        out.push_str(" {");
        for (name, value) in &self.declarations {
            // Writing into a `String` is infallible.
            let _ = write!(out, " {name}: {value};");
        }
        out.push_str(" }");
        out
    }
}

/// Computes the fingerprint of `props`.
///
/// Fails with [`InvalidStyleValue`] if any property is invalid. Use
/// [`CanonicalStyle::from_properties_lossy`] to skip bad properties instead.
pub fn canonicalize(props: &PropertySet) -> Result<Fingerprint, InvalidStyleValue> {
    CanonicalStyle::from_properties(props).map(|style| style.fingerprint())
}

/// Normalizes a property name to its hyphenated, lowercase CSS spelling.
///
/// - A hump (an uppercase letter after a lowercase letter or digit) starts a
///   new word, so `backgroundColor` and `border-topWidth` both hyphenate.
///   Everything is then lowercased: `Color` is `color`, `FONT-SIZE` is
///   `font-size`.
/// - A leading `Webkit`, `Moz`, `O` or `Khtml` word, or a leading `ms` word,
///   is a vendor prefix: `WebkitTransition` becomes `-webkit-transition` and
///   `msFlex` becomes `-ms-flex`.
/// - Custom properties (`--accent`) are case-sensitive and kept verbatim.
///
/// ```rust
/// use understory_class_registry::normalize_property_name;
///
/// assert_eq!(normalize_property_name("borderTopWidth").unwrap(), "border-top-width");
/// assert_eq!(normalize_property_name("Font-Size").unwrap(), "font-size");
/// assert_eq!(normalize_property_name("MozBoxSizing").unwrap(), "-moz-box-sizing");
/// assert_eq!(normalize_property_name("--Accent").unwrap(), "--Accent");
/// ```
pub fn normalize_property_name(raw: &str) -> Result<String, ValueProblem> {
    if raw.is_empty() {
        return Err(ValueProblem::EmptyName);
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        || !raw.chars().any(|c| c.is_ascii_alphanumeric())
    {
        return Err(ValueProblem::BadName);
    }
    if raw.starts_with("--") {
        return Ok(raw.to_owned());
    }

    let mut out = String::with_capacity(raw.len() + 4);
    let rest = match vendor_prefix(raw) {
        Some(prefix) => {
            out.push('-');
            out.extend(prefix.chars().map(|c| c.to_ascii_lowercase()));
            out.push('-');
            &raw[prefix.len()..]
        }
        None => raw,
    };
    let mut prev: Option<char> = None;
    for c in rest.chars() {
        let hump = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
        if hump && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    Ok(out)
}

const VENDOR_PREFIXES: &[&str] = &["webkit", "moz", "o", "khtml"];

/// Returns the leading vendor word of a camel-cased name, if it has one.
fn vendor_prefix(raw: &str) -> Option<&str> {
    let end = raw
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c.is_ascii_uppercase() || c == '-')
        .map(|(i, _)| i)?;
    let (word, rest) = raw.split_at(end);
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let vendor = if word.starts_with(|c: char| c.is_ascii_uppercase()) {
        VENDOR_PREFIXES.iter().any(|v| word.eq_ignore_ascii_case(v))
    } else {
        word == "ms"
    };
    vendor.then_some(word)
}

fn validate(name: &str, value: &CssValue) -> Result<(String, CssValue), InvalidStyleValue> {
    let reject = |problem| InvalidStyleValue {
        property: name.to_owned(),
        problem,
    };
    let normalized = normalize_property_name(name).map_err(reject)?;
    value.validate().map_err(reject)?;
    Ok((normalized, value.clone().normalized()))
}

fn digest(declarations: &[(String, CssValue)]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((declarations.len() as u64).to_le_bytes());
    for (name, value) in declarations {
        update_field(&mut hasher, name.as_bytes());
        match value {
            CssValue::Text(text) => {
                hasher.update([b't']);
                update_field(&mut hasher, text.as_bytes());
            }
            CssValue::Number(n) => {
                hasher.update([b'n']);
                hasher.update(n.to_bits().to_le_bytes());
            }
        }
    }
    Fingerprint(hasher.finalize().into())
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
