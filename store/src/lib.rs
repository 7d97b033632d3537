// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Persistent component sets and gauges over them.
//!
//! A [`Set`] stores iCalendar components in a file, a directory of monthly
//! files or a SQLite database, and iterates over them through a [`Gauge`],
//! optionally expanding recurring components into their occurrences.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(clippy::single_match_else, clippy::match_bool)]

mod cluster;
mod config;
mod error;
mod gauge;
mod set;

pub use crate::cluster::Cluster;
pub use crate::config::{RetryBackoff, SetKind, StoreConfig};
pub use crate::error::StoreError;
pub use crate::gauge::{Condition, Expr, Gauge, PropertyPath};
#[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
pub use crate::set::TransactionalBackend;
pub use crate::set::{DirectoryBackend, FileBackend, Set, SetBackend, SetCursor};
