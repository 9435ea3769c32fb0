// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Point Ledger
//!
//! This library provides a concurrency-safe per-user point ledger: a
//! non-negative integer balance per user plus an append-only, time-ordered
//! history of charge/use transactions.
//!
//! ## Core Components
//!
//! - [`PointEngine`]: Balance mutation engine callers invoke
//! - [`LedgerStore`]: Container owning every user's balance and history
//! - [`UserLedger`]: One user's state behind the per-user mutation lock
//! - [`LedgerError`]: Typed failures (invalid argument, insufficient funds)
//!
//! ## Example
//!
//! ```
//! use point_ledger_rs::{PointEngine, UserId};
//!
//! let engine = PointEngine::new();
//!
//! engine.charge(UserId(1), 1000).unwrap();
//! let point = engine.use_points(UserId(1), 300).unwrap();
//! assert_eq!(point.balance, 700);
//!
//! let history = engine.get_history(UserId(1)).unwrap();
//! assert_eq!(history.len(), 2);
//! ```
//!
//! ## Thread Safety
//!
//! Mutations for one user are serialized on that user's lock; operations on
//! different users run fully in parallel. The balance never goes negative
//! and readers never observe a balance/history pair mid-commit.

mod base;
mod engine;
pub mod error;
pub mod history;
mod ledger;
mod store;
pub mod validate;

pub use base::{HistoryId, UserId};
pub use engine::PointEngine;
pub use error::LedgerError;
pub use history::{HistoryEntry, TransactionKind};
pub use ledger::{UserLedger, UserPoint};
pub use store::LedgerStore;
