//! # stockbook-core: Pure Ledger Rules for Stockbook
//!
//! This crate is the **heart** of Stockbook. It owns the rules that decide
//! how a stock movement changes product stock and counterparty balances,
//! expressed as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (mobile UI, reports, exports)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ intents                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockbook-engine (LedgerEngine)                 │   │
//! │  │    read current state ──► plan ──► commit batch ──► publish     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   ledger  │  │  reports  │  │ validation│  │   │
//! │  │   │  Product  │  │  planning │  │ low stock │  │  numbers  │  │   │
//! │  │   │  Entity   │  │  batches  │  │  drift    │  │   money   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Entity, Transaction) and inputs
//! - [`money`] - Integer currency amounts
//! - [`ledger`] - Effect math and write-batch planning
//! - [`reports`] - Read-side views over collection snapshots
//! - [`validation`] - Input rules
//! - [`numbers`] - Lenient numeric input normalization
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::ledger::{balance_delta, stock_delta};
//! use stockbook_core::{Money, TransactionType};
//!
//! // Selling 3 units takes 3 off the shelf...
//! assert_eq!(stock_delta(TransactionType::Out, 3), -3);
//!
//! // ...and the customer now owes the sale total.
//! let total = Money::from_units(300);
//! assert_eq!(balance_delta(TransactionType::Out, total), total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod numbers;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{BalancePolicy, LedgerPolicy, LedgerWrite, StockPolicy, WriteBatch};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity a single transaction may move.
///
/// ## Business Reason
/// Catches fat-finger input (an extra zero or two) while leaving room for
/// bulk receiving.
pub const MAX_TRANSACTION_QUANTITY: i64 = 1_000_000;

/// Largest unit price, cost or override amount, in whole currency units.
///
/// Together with [`MAX_TRANSACTION_QUANTITY`] this keeps every transaction
/// total within `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Maximum length of product and entity names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of free-text notes and descriptions.
pub const MAX_NOTES_LENGTH: usize = 1000;
