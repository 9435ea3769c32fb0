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

//! Ledger store: owns every user's balance and history.
//!
//! The store is a plain container. It holds one [`UserLedger`] per user id,
//! created lazily on first mutation, and allocates history entry ids from a
//! store-wide counter so ids are unique across all users. Serialization of
//! mutations is the ledger's job; cross-user operations here go through
//! [`DashMap`] and never take more than one user's lock.
//!
//! Ledgers are never removed for the lifetime of the store: one retained
//! lock per user id ever seen, which keeps memory proportional to the
//! distinct-user count rather than the operation count.

use crate::base::{HistoryId, UserId};
use crate::history::HistoryEntry;
use crate::ledger::{UserLedger, UserPoint};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Container for all user ledgers plus the global history id counter.
#[derive(Debug)]
pub struct LedgerStore {
    /// User ledgers indexed by user id.
    ledgers: DashMap<UserId, Arc<UserLedger>>,
    /// Next history entry id; ids start at 1.
    next_history_id: AtomicU64,
}

impl LedgerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
            next_history_id: AtomicU64::new(1),
        }
    }

    /// Returns the user's ledger, creating it with balance 0 on first
    /// reference. The `entry` API makes concurrent first references for the
    /// same id converge on a single ledger.
    pub fn ledger(&self, user_id: UserId) -> Arc<UserLedger> {
        self.ledgers
            .entry(user_id)
            .or_insert_with(|| Arc::new(UserLedger::new(user_id)))
            .clone()
    }

    /// Allocates the next globally unique history id.
    pub fn next_history_id(&self) -> HistoryId {
        HistoryId(self.next_history_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Current balance snapshot; balance 0 with the timestamp unset if the
    /// user has never transacted. Never allocates a ledger.
    pub fn balance(&self, user_id: UserId) -> UserPoint {
        self.ledgers
            .get(&user_id)
            .map(|ledger| ledger.snapshot())
            .unwrap_or_else(|| UserPoint::empty(user_id))
    }

    /// History entries in insertion order; empty if the user has never
    /// transacted.
    pub fn history(&self, user_id: UserId) -> Vec<HistoryEntry> {
        self.ledgers
            .get(&user_id)
            .map(|ledger| ledger.history())
            .unwrap_or_default()
    }

    /// Snapshots of every ledger in the store, for report output.
    pub fn balances(&self) -> Vec<UserPoint> {
        self.ledgers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    /// Number of user ledgers created so far.
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
