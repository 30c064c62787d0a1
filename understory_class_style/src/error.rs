// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced to the host's error channel.

use thiserror::Error;
use understory_class_registry::InvalidStyleValue;

use crate::declaration::DeclarationError;

/// A style failure for one component instance.
///
/// None of these are fatal: the affected style is simply not applied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StyleError {
    /// One property was rejected and left out of its block. The other
    /// properties and keys were still applied.
    #[error(transparent)]
    InvalidStyleValue(#[from] InvalidStyleValue),
    /// The declaration failed. The previous style map was kept.
    #[error(transparent)]
    InvalidStyleDeclaration(#[from] DeclarationError),
}
