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

//! Error types for ledger operations.

use thiserror::Error;

/// Ledger operation errors.
///
/// `InvalidArgument` is raised before any lock is acquired or state is
/// touched. `InsufficientFunds` is raised inside the critical section after
/// reading current state; the balance and history are left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Request shape is invalid (non-positive id or amount, overflow).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A use request exceeded the current balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// Unexpected fault in the storage layer.
    ///
    /// The commit unit is a single in-guard step, so an operation that
    /// reports this has not left the balance/history pair inconsistent.
    #[error("internal ledger failure: {0}")]
    Internal(&'static str),
}

impl LedgerError {
    /// True for errors the caller can fix by correcting the request,
    /// as opposed to system faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidArgument(_) | LedgerError::InsufficientFunds { .. }
        )
    }
}
