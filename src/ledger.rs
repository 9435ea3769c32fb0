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

//! Per-user ledger state and the mutation lock that guards it.
//!
//! Each user owns exactly one [`UserLedger`]. Its `RwLock` is the per-user
//! mutation lock: `charge`/`use` take the write guard, so all mutations for
//! one user are totally ordered by lock acquisition, while reads take the
//! read guard and never observe a balance/history pair mid-commit.
//!
//! `parking_lot` locks do not poison. A panic inside a critical section
//! unlocks on unwind, and since the state mutation is the final infallible
//! step of the section, a panicking operation leaves the ledger untouched.
//! No lock reset or process restart is required to recover a user's ledger.
//!
//! # Example
//!
//! ```
//! use point_ledger_rs::{TransactionKind, UserId, UserLedger};
//! use point_ledger_rs::HistoryId;
//!
//! let ledger = UserLedger::new(UserId(1));
//! ledger.apply(TransactionKind::Charge, 1000, || HistoryId(1)).unwrap();
//! assert_eq!(ledger.snapshot().balance, 1000);
//! ```

use crate::base::{HistoryId, UserId};
use crate::error::LedgerError;
use crate::history::{HistoryEntry, TransactionKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Point-in-time view of a user's balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPoint {
    pub user_id: UserId,
    /// Current point total; never negative.
    pub balance: i64,
    /// Epoch milliseconds of the last mutation; `None` until the user has
    /// transacted at least once.
    pub updated_at_millis: Option<i64>,
}

impl UserPoint {
    /// Snapshot for a user that has never transacted.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            updated_at_millis: None,
        }
    }
}

#[derive(Debug)]
struct LedgerState {
    balance: i64,
    updated_at_millis: Option<i64>,
    /// Append-only, in commit order (equivalently, ascending entry id).
    history: Vec<HistoryEntry>,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            balance: 0,
            updated_at_millis: None,
            history: Vec::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= 0,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
        debug_assert!(
            self.history
                .windows(2)
                .all(|w| w[0].timestamp_millis <= w[1].timestamp_millis),
            "Invariant violated: history timestamps decreased"
        );
    }

    /// Commit timestamp for the next entry: wall-clock now, clamped so the
    /// per-user sequence stays non-decreasing if the clock steps backwards.
    fn next_timestamp(&self) -> i64 {
        let now = now_millis();
        match self.history.last() {
            Some(last) => now.max(last.timestamp_millis),
            None => now,
        }
    }

    /// Atomically (relative to this user's lock) replaces the balance and
    /// appends the entry. Both steps are infallible, so no observer can see
    /// one without the other.
    fn commit(&mut self, new_balance: i64, entry: HistoryEntry) {
        self.balance = new_balance;
        self.updated_at_millis = Some(entry.timestamp_millis);
        self.history.push(entry);
        self.assert_invariants();
    }
}

/// A single user's balance and history behind the per-user mutation lock.
#[derive(Debug)]
pub struct UserLedger {
    user_id: UserId,
    state: RwLock<LedgerState>,
}

impl UserLedger {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: RwLock::new(LedgerState::new()),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Current balance snapshot. Takes the read guard only, so concurrent
    /// readers do not serialize behind each other.
    pub fn snapshot(&self) -> UserPoint {
        let state = self.state.read();
        UserPoint {
            user_id: self.user_id,
            balance: state.balance,
            updated_at_millis: state.updated_at_millis,
        }
    }

    /// History entries in commit order.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.read().history.clone()
    }

    /// Runs one mutation's critical section: read current balance, validate
    /// against it, compute the new balance, and commit balance + history
    /// entry as a single unit.
    ///
    /// `next_id` is invoked inside the critical section so history ids for
    /// one user are allocated in commit order. The guard is scoped and
    /// releases on every exit path, including the failure returns.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] - `amount` is not positive, or a
    ///   charge would overflow the balance.
    /// - [`LedgerError::InsufficientFunds`] - a use exceeds the current
    ///   balance; state is left unchanged and no entry is written.
    pub fn apply(
        &self,
        kind: TransactionKind,
        amount: i64,
        next_id: impl FnOnce() -> HistoryId,
    ) -> Result<UserPoint, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidArgument(
                "amount must be a positive integer",
            ));
        }

        let mut state = self.state.write();

        let current = state.balance;
        let new_balance = match kind {
            TransactionKind::Charge => current
                .checked_add(amount)
                .ok_or(LedgerError::InvalidArgument("charge would overflow the balance"))?,
            TransactionKind::Use => {
                if amount > current {
                    return Err(LedgerError::InsufficientFunds {
                        requested: amount,
                        available: current,
                    });
                }
                current - amount
            }
        };

        let entry = HistoryEntry {
            id: next_id(),
            user_id: self.user_id,
            amount,
            kind,
            timestamp_millis: state.next_timestamp(),
        };
        state.commit(new_balance, entry);

        Ok(UserPoint {
            user_id: self.user_id,
            balance: state.balance,
            updated_at_millis: state.updated_at_millis,
        })
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
