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

//! Transaction history records.
//!
//! Every successful mutation appends exactly one [`HistoryEntry`] to the
//! owning user's sequence. Entries are immutable once created and are never
//! updated or deleted; replaying a user's sequence from balance 0
//! reproduces the current balance exactly.

use crate::base::{HistoryId, UserId};
use serde::{Deserialize, Serialize};

/// Direction of a balance mutation.
///
/// Serialized as the string enum `"CHARGE"` / `"USE"` on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Credit: balance increases by `amount`.
    Charge,
    /// Debit: balance decreases by `amount`.
    Use,
}

impl TransactionKind {
    /// The signed delta this kind applies for a given magnitude.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            TransactionKind::Charge => amount,
            TransactionKind::Use => -amount,
        }
    }
}

/// One committed balance mutation.
///
/// `amount` is always the positive transaction magnitude; the sign is
/// carried by `kind`, never by the stored value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub user_id: UserId,
    pub amount: i64,
    pub kind: TransactionKind,
    /// Commit time in epoch milliseconds; non-decreasing within one user's
    /// sequence.
    pub timestamp_millis: i64,
}

/// Folds a history sequence into the balance it produces from zero.
///
/// Used by tests and invariant checks; the store never recomputes balances
/// this way at runtime.
pub fn replay(entries: &[HistoryEntry]) -> i64 {
    entries
        .iter()
        .fold(0, |balance, entry| balance + entry.kind.signed(entry.amount))
}
