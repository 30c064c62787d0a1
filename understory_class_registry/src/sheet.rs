// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stylesheet injection.
//!
//! The embedder describes its document through [`StyleDocument`] and the
//! sheet it hands back through [`StyleSheetTarget`], which mirrors the
//! index-based `insertRule`/`deleteRule` surface of a CSSOM sheet.
//! [`StyleInjector`] owns that sheet and addresses rules by class name,
//! keeping the class-to-index bookkeeping on its side.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A document that can host one injected stylesheet.
pub trait StyleDocument {
    /// The sheet handle returned by [`append_style_sheet`](Self::append_style_sheet).
    type Sheet: StyleSheetTarget;

    /// Appends an empty `<style>` node to the document head and returns its sheet.
    fn append_style_sheet(&mut self) -> Self::Sheet;
}

/// An index-addressed list of CSS rules.
pub trait StyleSheetTarget {
    /// Inserts `rule` so that it ends up at position `index`.
    ///
    /// `index` is never greater than the current number of rules.
    fn insert_rule(&mut self, rule: &str, index: usize);

    /// Deletes the rule at position `index`.
    fn delete_rule(&mut self, index: usize);
}

/// Owns the single injected stylesheet of a document.
///
/// The sheet is created lazily on the first insertion and lives as long as
/// the injector. Rules are keyed by class name; each rule is self-contained,
/// so their relative order carries no meaning.
pub struct StyleInjector<D: StyleDocument> {
    document: D,
    sheet: Option<D::Sheet>,
    /// Class names in sheet order: `order[i]` owns rule `i`.
    order: Vec<String>,
}

impl<D: StyleDocument> StyleInjector<D> {
    /// Creates an injector for `document`. No sheet is created yet.
    #[must_use]
    pub fn new(document: D) -> Self {
        Self {
            document,
            sheet: None,
            order: Vec::new(),
        }
    }

    /// Returns the document.
    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Returns the injected sheet, if one has been created.
    #[must_use]
    pub fn sheet(&self) -> Option<&D::Sheet> {
        self.sheet.as_ref()
    }

    /// Returns the number of live rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no rules are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns `true` if a rule for `class_name` is live.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.position(class_name).is_some()
    }

    /// Appends a rule for `class_name`.
    ///
    /// If the class already has a rule, its text is replaced instead.
    pub fn insert_rule(&mut self, class_name: &str, rule: &str) {
        if self.contains(class_name) {
            tracing::debug!(class = class_name, "rule already present, replacing");
            self.replace_rule(class_name, rule);
            return;
        }
        let index = self.order.len();
        self.sheet_mut().insert_rule(rule, index);
        self.order.push(class_name.to_owned());
        tracing::trace!(class = class_name, index, "inserted rule");
    }

    /// Replaces the text of the rule for `class_name`, keeping its position.
    ///
    /// Inserts the rule if the class has none.
    pub fn replace_rule(&mut self, class_name: &str, rule: &str) {
        let Some(index) = self.position(class_name) else {
            self.insert_rule(class_name, rule);
            return;
        };
        let sheet = self.sheet_mut();
        sheet.delete_rule(index);
        sheet.insert_rule(rule, index);
        tracing::trace!(class = class_name, index, "replaced rule");
    }

    /// Removes the rule for `class_name`.
    ///
    /// Returns `false`, and does nothing else, if the class has no rule.
    pub fn remove_rule(&mut self, class_name: &str) -> bool {
        let Some(index) = self.position(class_name) else {
            return false;
        };
        self.sheet_mut().delete_rule(index);
        self.order.remove(index);
        tracing::trace!(class = class_name, index, "removed rule");
        true
    }

    fn position(&self, class_name: &str) -> Option<usize> {
        self.order.iter().position(|c| c == class_name)
    }

    fn sheet_mut(&mut self) -> &mut D::Sheet {
        self.sheet
            .get_or_insert_with(|| self.document.append_style_sheet())
    }
}

impl<D> fmt::Debug for StyleInjector<D>
where
    D: StyleDocument + fmt::Debug,
    D::Sheet: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleInjector")
            .field("document", &self.document)
            .field("sheet", &self.sheet)
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn sheet_is_created_lazily_once() {
        let mut injector = StyleInjector::new(MemoryDocument::new());
        assert!(injector.sheet().is_none());
        assert_eq!(injector.document().style_sheet_count(), 0);

        injector.insert_rule("a", ".a { color: red; }");
        injector.insert_rule("b", ".b { color: blue; }");
        assert_eq!(injector.document().style_sheet_count(), 1);
        assert_eq!(injector.sheet().unwrap().len(), 2);
    }

    #[test]
    fn remove_shifts_later_rules() {
        let mut injector = StyleInjector::new(MemoryDocument::new());
        injector.insert_rule("a", ".a { color: red; }");
        injector.insert_rule("b", ".b { color: blue; }");
        injector.insert_rule("c", ".c { color: green; }");

        assert!(injector.remove_rule("a"));
        // "c" must still be addressable after "a" shifted it down.
        injector.replace_rule("c", ".c { color: cyan; }");

        let sheet = injector.sheet().unwrap();
        assert_eq!(
            sheet.rules(),
            [".b { color: blue; }", ".c { color: cyan; }"]
        );
    }

    #[test]
    fn remove_absent_rule_is_a_no_op() {
        let mut injector = StyleInjector::new(MemoryDocument::new());
        injector.insert_rule("a", ".a { color: red; }");
        assert!(injector.remove_rule("a"));
        assert!(!injector.remove_rule("a"));
        assert!(!injector.remove_rule("never"));
        assert!(injector.is_empty());
        assert!(injector.sheet().unwrap().is_empty());
    }

    #[test]
    fn replace_keeps_position() {
        let mut injector = StyleInjector::new(MemoryDocument::new());
        injector.insert_rule("a", ".a { color: red; }");
        injector.insert_rule("b", ".b { color: blue; }");
        injector.replace_rule("a", ".a { color: pink; }");
        assert_eq!(
            injector.sheet().unwrap().rules(),
            [".a { color: pink; }", ".b { color: blue; }"]
        );
    }

    #[test]
    fn duplicate_insert_replaces() {
        let mut injector = StyleInjector::new(MemoryDocument::new());
        injector.insert_rule("a", ".a { color: red; }");
        injector.insert_rule("a", ".a { color: blue; }");
        assert_eq!(injector.len(), 1);
        assert_eq!(injector.sheet().unwrap().rules(), [".a { color: blue; }"]);
    }
}
