//! Reform Shop Core - domain types and pure catalog logic.
//!
//! This crate is shared by every Reform shop component:
//! - `functions` - HTTP functions (Stripe webhook, order email, newsletter)
//! - `cli` - Operator commands for migrations, Printful sync and variant tables
//!
//! # Architecture
//!
//! The core crate does no I/O: no database access, no HTTP clients, no
//! filesystem. Everything here is deterministic and unit-testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and statuses
//! - [`catalog`] - Designs, sizes and product types
//! - [`colors`] - Canonical color palette keyed by product type
//! - [`reconcile`] - Assigning Printful catalog variant ids to combinations
//! - [`variant_table`] - Read-only index over reconciled variant tables
//! - [`images`] - Image sync planning that leaves custom images alone

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod colors;
pub mod images;
pub mod reconcile;
pub mod types;
pub mod variant_table;

pub use catalog::{Design, ProductType, Size};
pub use colors::ColorPalette;
pub use reconcile::{ReconcileError, Reconciliation, ReconciledVariant, VariantCombination};
pub use types::*;
pub use variant_table::VariantTable;
