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

//! Pure input validation rules.
//!
//! Shape checks are stateless and run before any lock is taken, so invalid
//! requests fail fast without touching ledger state. The state-dependent
//! insufficient-funds rule lives in the critical section instead
//! ([`crate::UserLedger::apply`]), since it reads the current balance.

use crate::base::UserId;
use crate::error::LedgerError;

/// Rejects non-positive user ids.
pub fn user_id(user_id: UserId) -> Result<(), LedgerError> {
    if user_id.is_valid() {
        Ok(())
    } else {
        Err(LedgerError::InvalidArgument(
            "user id must be a positive integer",
        ))
    }
}

/// Rejects non-positive transaction amounts (applies to both charge and use).
pub fn amount(amount: i64) -> Result<(), LedgerError> {
    if amount > 0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidArgument(
            "amount must be a positive integer",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_user_id_passes() {
        assert!(user_id(UserId(1)).is_ok());
        assert!(user_id(UserId(i64::MAX)).is_ok());
    }

    #[test]
    fn zero_and_negative_user_ids_fail() {
        assert_eq!(
            user_id(UserId(0)),
            Err(LedgerError::InvalidArgument(
                "user id must be a positive integer"
            ))
        );
        assert!(user_id(UserId(-5)).is_err());
        assert!(user_id(UserId(i64::MIN)).is_err());
    }

    #[test]
    fn positive_amount_passes() {
        assert!(amount(1).is_ok());
        assert!(amount(i64::MAX).is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_fail() {
        assert_eq!(
            amount(0),
            Err(LedgerError::InvalidArgument(
                "amount must be a positive integer"
            ))
        );
        assert!(amount(-100).is_err());
    }
}
