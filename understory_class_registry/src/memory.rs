// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory document and sheet.
//!
//! [`MemoryDocument`] stands in for a browser document in tests and headless
//! embedders. Its [`MemorySheet`] stores rule text verbatim and can resolve
//! the value an element with a given `class` attribute would compute for a
//! property, which is enough to check flat, single-class rules end to end.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use crate::sheet::{StyleDocument, StyleSheetTarget};

/// A document that records how many style sheets were appended to it.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    style_sheets: usize,
}

impl MemoryDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many `<style>` nodes have been appended to the head.
    #[must_use]
    pub fn style_sheet_count(&self) -> usize {
        self.style_sheets
    }
}

impl StyleDocument for MemoryDocument {
    type Sheet = MemorySheet;

    fn append_style_sheet(&mut self) -> MemorySheet {
        self.style_sheets += 1;
        MemorySheet::default()
    }
}

/// An ordered list of rule texts.
#[derive(Clone, Debug, Default)]
pub struct MemorySheet {
    rules: Vec<String>,
}

impl MemorySheet {
    /// Returns the rules in sheet order.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the sheet has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rule whose selector is `.class_name`.
    #[must_use]
    pub fn rule_for(&self, class_name: &str) -> Option<&str> {
        self.rules
            .iter()
            .map(String::as_str)
            .find(|rule| selector_of(rule) == Some(class_name))
    }

    /// Resolves `property` for an element whose class attribute is `class_attr`.
    ///
    /// Classes are whitespace separated. When several matching rules declare
    /// the property, the one later in the sheet wins.
    ///
    /// ```rust
    /// use understory_class_registry::{MemoryDocument, StyleDocument, StyleSheetTarget};
    ///
    /// let mut sheet = MemoryDocument::new().append_style_sheet();
    /// sheet.insert_rule(".a { color: red; }", 0);
    /// sheet.insert_rule(".b { background-color: blue; }", 1);
    ///
    /// assert_eq!(sheet.computed_value("a b", "color"), Some("red"));
    /// assert_eq!(sheet.computed_value("b", "background-color"), Some("blue"));
    /// assert_eq!(sheet.computed_value("b", "color"), None);
    /// ```
    #[must_use]
    pub fn computed_value<'a>(&'a self, class_attr: &str, property: &str) -> Option<&'a str> {
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        self.rules
            .iter()
            .filter(|rule| selector_of(rule).is_some_and(|class| classes.contains(&class)))
            .filter_map(|rule| declared_value(rule, property))
            .next_back()
    }
}

impl StyleSheetTarget for MemorySheet {
    fn insert_rule(&mut self, rule: &str, index: usize) {
        self.rules.insert(index, rule.to_owned());
    }

    fn delete_rule(&mut self, index: usize) {
        self.rules.remove(index);
    }
}

fn selector_of(rule: &str) -> Option<&str> {
    let (selector, _) = rule.split_once('{')?;
    selector.trim().strip_prefix('.')
}

fn declared_value<'a>(rule: &'a str, property: &str) -> Option<&'a str> {
    let (_, body) = rule.split_once('{')?;
    let body = body.trim_end().strip_suffix('}')?;
    body.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim() == property)
        .map(|(_, value)| value.trim())
        .next_back()
}
