// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS values and property sets.
//!
//! A [`PropertySet`] is the author-facing description of one generated class:
//! a flat list of property names and primitive [`CssValue`]s, kept in the
//! order the author wrote them. Normalization and ordering happen later, in
//! [`CanonicalStyle`](crate::CanonicalStyle).

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::fmt;

use smallvec::SmallVec;
use thiserror::Error;

/// Default inline capacity for property entries.
///
/// Generated classes rarely carry more than a handful of declarations.
const INLINE_CAPACITY: usize = 8;

/// A primitive CSS value: either text or a finite number.
///
/// Numbers are rendered without units and without a trailing `.0` for
/// integral values, so `12.0` renders as `12`.
#[derive(Clone, Debug, PartialEq)]
pub enum CssValue {
    /// A textual value such as `red` or `1px solid black`.
    Text(String),
    /// A numeric value such as `0.5` or `400`.
    Number(f64),
}

impl CssValue {
    /// Checks that this value can be written into a declaration.
    ///
    /// Non-finite numbers are rejected, as is text that could run past the
    /// end of its declaration: rule and declaration delimiters, backslash
    /// escapes, control characters other than tab, comment openers and
    /// unterminated strings.
    pub fn validate(&self) -> Result<(), ValueProblem> {
        match self {
            Self::Number(n) if !n.is_finite() => Err(ValueProblem::NonFinite),
            Self::Number(_) => Ok(()),
            Self::Text(text) => validate_text(text),
        }
    }

    /// Returns the value with surrounding whitespace trimmed and negative
    /// zero folded into zero.
    pub(crate) fn normalized(self) -> Self {
        match self {
            Self::Number(n) if n == 0.0 => Self::Number(0.0),
            Self::Number(n) => Self::Number(n),
            Self::Text(text) if text.trim().len() == text.len() => Self::Text(text),
            Self::Text(text) => Self::Text(text.trim().to_owned()),
        }
    }
}

const FORBIDDEN: &[char] = &[';', '{', '}', '<', '\\'];

fn validate_text(text: &str) -> Result<(), ValueProblem> {
    let forbidden = |c: char| FORBIDDEN.contains(&c) || (c.is_control() && c != '\t');
    if let Some(c) = text.chars().find(|&c| forbidden(c)) {
        return Err(ValueProblem::Forbidden(c));
    }
    if text.contains("/*") {
        return Err(ValueProblem::OpensComment);
    }
    // No escapes are left at this point, so a quote only ends at the same
    // quote character.
    let mut open = None;
    for c in text.chars() {
        match open {
            None if c == '"' || c == '\'' => open = Some(c),
            Some(quote) if quote == c => open = None,
            _ => {}
        }
    }
    match open {
        Some(quote) => Err(ValueProblem::UnterminatedString(quote)),
        None => Ok(()),
    }
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CssValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CssValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CssValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for CssValue {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for CssValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for CssValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

/// Why a single property was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValueProblem {
    /// The property name was empty.
    #[error("property name is empty")]
    EmptyName,
    /// The property name contained characters outside `[A-Za-z0-9_-]`.
    #[error("property name is not a CSS identifier")]
    BadName,
    /// The numeric value was NaN or infinite.
    #[error("number is not finite")]
    NonFinite,
    /// The text value contained a character that would break out of the rule.
    #[error("value contains forbidden character {0:?}")]
    Forbidden(char),
    /// The text value opened a comment.
    #[error("value opens a comment")]
    OpensComment,
    /// The text value opened a string with this quote and never closed it.
    #[error("value has an unterminated {0}-quoted string")]
    UnterminatedString(char),
}

/// A property that could not be turned into a declaration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid style value for `{property}`: {problem}")]
pub struct InvalidStyleValue {
    /// The property name as the author wrote it.
    pub property: String,
    /// What was wrong with it.
    #[source]
    pub problem: ValueProblem,
}

/// An author-ordered set of CSS properties for one generated class.
///
/// Setting the same name twice replaces the earlier value in place. Names
/// that only differ in spelling (`backgroundColor` and `background-color`)
/// are both kept here and resolved during canonicalization, where the later
/// one wins.
///
/// # Example
///
/// ```rust
/// use understory_class_registry::{CssValue, PropertySet};
///
/// let props = PropertySet::new()
///     .with("backgroundColor", "blue")
///     .with("opacity", 0.5);
///
/// assert_eq!(props.len(), 2);
/// assert_eq!(props.get("opacity"), Some(&CssValue::Number(0.5)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertySet {
    entries: SmallVec<[(String, CssValue); INLINE_CAPACITY]>,
}

impl PropertySet {
    /// Creates an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property and returns the set, for chained construction.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CssValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a property, replacing an earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<CssValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value stored under exactly `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CssValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no properties are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates properties in author order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CssValue)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<N, V> FromIterator<(N, V)> for PropertySet
where
    N: Into<String>,
    V: Into<CssValue>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(CssValue::from(12.0).to_string(), "12");
        assert_eq!(CssValue::from(0.5).to_string(), "0.5");
        assert_eq!(CssValue::from(-0.0).normalized().to_string(), "0");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert_eq!(
            CssValue::Number(f64::NAN).validate(),
            Err(ValueProblem::NonFinite)
        );
        assert_eq!(
            CssValue::Number(f64::INFINITY).validate(),
            Err(ValueProblem::NonFinite)
        );
        assert_eq!(CssValue::Number(3.0).validate(), Ok(()));
    }

    #[test]
    fn text_cannot_escape_its_declaration() {
        assert_eq!(
            CssValue::from("red; display: none").validate(),
            Err(ValueProblem::Forbidden(';'))
        );
        assert_eq!(
            CssValue::from("red } .x {").validate(),
            Err(ValueProblem::Forbidden('}'))
        );
        assert_eq!(CssValue::from("1px solid rgb(0, 0, 0)").validate(), Ok(()));
    }

    #[test]
    fn trailing_backslash_is_rejected() {
        assert_eq!(
            CssValue::from("red\\").validate(),
            Err(ValueProblem::Forbidden('\\'))
        );
        assert_eq!(
            CssValue::from("\\3b").validate(),
            Err(ValueProblem::Forbidden('\\'))
        );
    }

    #[test]
    fn control_characters_are_rejected_but_tab_is_whitespace() {
        assert_eq!(
            CssValue::from("red\nwidth: 0").validate(),
            Err(ValueProblem::Forbidden('\n'))
        );
        assert_eq!(
            CssValue::from("a\u{0}").validate(),
            Err(ValueProblem::Forbidden('\u{0}'))
        );
        assert_eq!(CssValue::from("1px\tsolid").validate(), Ok(()));
    }

    #[test]
    fn comment_openers_are_rejected() {
        assert_eq!(
            CssValue::from("red /* note").validate(),
            Err(ValueProblem::OpensComment)
        );
        assert_eq!(
            CssValue::from("url(/*)").validate(),
            Err(ValueProblem::OpensComment)
        );
        assert_eq!(CssValue::from("calc(2 * 3px)").validate(), Ok(()));
    }

    #[test]
    fn strings_must_be_terminated() {
        assert_eq!(
            CssValue::from("\"Helvetica").validate(),
            Err(ValueProblem::UnterminatedString('"'))
        );
        assert_eq!(
            CssValue::from("'a\" b").validate(),
            Err(ValueProblem::UnterminatedString('\''))
        );
        assert_eq!(
            CssValue::from("\"Helvetica Neue\", sans-serif").validate(),
            Ok(())
        );
        assert_eq!(CssValue::from("'it\"s'").validate(), Ok(()));
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut props = PropertySet::new().with("color", "red");
        props.insert("color", "blue");
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("color"), Some(&CssValue::from("blue")));
    }

    #[test]
    fn iteration_keeps_author_order() {
        let props: PropertySet = [("z-index", 1), ("opacity", 0)].into_iter().collect();
        let names: Vec<_> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["z-index", "opacity"]);
    }
}
