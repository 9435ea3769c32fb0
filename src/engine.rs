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

//! Balance mutation engine.
//!
//! The [`PointEngine`] is the component callers invoke. For each mutation it
//! runs "read current balance → validate → compute new balance → persist
//! balance and history" under the owning user's lock; queries go straight
//! to the store through read guards.
//!
//! # Operations
//!
//! - **Charge**: credit points to a user, creating the ledger if needed.
//! - **Use**: debit points (fails if the balance would go negative).
//! - **Balance / history queries**: lock-free with respect to the mutation
//!   path; a read that happens-after a commit observes that commit.
//!
//! # Thread Safety
//!
//! Ledgers live in a [`dashmap::DashMap`], so operations on different users
//! proceed fully in parallel. Mutations for one user serialize on that
//! user's write lock; each operation takes at most one user's lock, so no
//! deadlock is possible.

use crate::base::UserId;
use crate::error::LedgerError;
use crate::history::{HistoryEntry, TransactionKind};
use crate::ledger::UserPoint;
use crate::store::LedgerStore;
use crate::validate;
use tracing::{debug, warn};

/// Balance engine managing every user's point ledger.
///
/// Owns the [`LedgerStore`] as its sole dependency; there is no process-wide
/// singleton, construct one engine and share it (e.g. behind an `Arc`).
///
/// # Invariants
///
/// - A user's balance is never negative, for any observer, including
///   mid-concurrent-access.
/// - Every successful mutation appends exactly one history entry, and the
///   history replayed from 0 reproduces the current balance.
/// - History entries are returned in the order their mutations committed,
///   with non-decreasing timestamps.
pub struct PointEngine {
    store: LedgerStore,
}

impl PointEngine {
    /// Creates an engine with no users and an empty history.
    pub fn new() -> Self {
        Self {
            store: LedgerStore::new(),
        }
    }

    /// Returns the user's current balance.
    ///
    /// A user that has never transacted reads as balance 0 with the
    /// timestamp unset. Does not take the mutation lock.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `user_id <= 0`.
    pub fn get_balance(&self, user_id: UserId) -> Result<UserPoint, LedgerError> {
        validate::user_id(user_id)?;
        Ok(self.store.balance(user_id))
    }

    /// Returns the user's history in commit order, empty if none.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `user_id <= 0`.
    pub fn get_history(&self, user_id: UserId) -> Result<Vec<HistoryEntry>, LedgerError> {
        validate::user_id(user_id)?;
        Ok(self.store.history(user_id))
    }

    /// Credits `amount` points to the user and returns the post-charge
    /// balance.
    ///
    /// Shape checks run before the lock; the commit runs inside the user's
    /// critical section, so concurrent charges never lose updates.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `user_id <= 0`, `amount <= 0`,
    /// or the charge would overflow the balance.
    pub fn charge(&self, user_id: UserId, amount: i64) -> Result<UserPoint, LedgerError> {
        validate::user_id(user_id)?;
        validate::amount(amount)?;

        let ledger = self.store.ledger(user_id);
        let point = ledger.apply(TransactionKind::Charge, amount, || {
            self.store.next_history_id()
        })?;

        debug!(user = %user_id, amount, balance = point.balance, "charge committed");
        Ok(point)
    }

    /// Debits `amount` points from the user and returns the post-use
    /// balance.
    ///
    /// The insufficient-funds rule is evaluated inside the critical section
    /// against the balance at the instant the lock is held; a rejected use
    /// leaves the balance unchanged and writes no history entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if `user_id <= 0` or `amount <= 0`.
    /// - [`LedgerError::InsufficientFunds`] if `amount` exceeds the current
    ///   balance.
    pub fn use_points(&self, user_id: UserId, amount: i64) -> Result<UserPoint, LedgerError> {
        validate::user_id(user_id)?;
        validate::amount(amount)?;

        let ledger = self.store.ledger(user_id);
        let result = ledger.apply(TransactionKind::Use, amount, || {
            self.store.next_history_id()
        });

        match &result {
            Ok(point) => {
                debug!(user = %user_id, amount, balance = point.balance, "use committed");
            }
            Err(LedgerError::InsufficientFunds {
                requested,
                available,
            }) => {
                warn!(user = %user_id, requested, available, "use rejected");
            }
            Err(_) => {}
        }
        result
    }

    /// Balance snapshots for every user seen so far, for report output.
    pub fn balances(&self) -> Vec<UserPoint> {
        self.store.balances()
    }

    /// Number of user ledgers created so far.
    pub fn user_count(&self) -> usize {
        self.store.len()
    }
}

impl Default for PointEngine {
    fn default() -> Self {
        Self::new()
    }
}
