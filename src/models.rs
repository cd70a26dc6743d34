use {
    crate::ledger::error::LedgerError,
    serde::{Deserialize, Serialize},
};

/// Signed to match the wire format; the ledger only issues non-negative ids.
pub type AccountId = i64;
pub type OwnerId = i64;

/// Limits used by the original account manager service.
pub const DEFAULT_MIN_BALANCE: f64 = 0.0;
pub const DEFAULT_MAX_BALANCE: f64 = 1e6;

/// Point-in-time view of an account. Never aliases ledger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    #[serde(rename = "money")]
    pub balance: f64,
}

impl Account {
    pub fn new(id: AccountId, owner_id: OwnerId) -> Self {
        Account {
            id,
            owner_id,
            balance: 0.0,
        }
    }

    /// Copy of this account carrying a different balance.
    pub fn with_balance(&self, balance: f64) -> Self {
        Account {
            balance,
            ..self.clone()
        }
    }
}

/// Inclusive range every balance must stay within at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceLimits {
    min_balance: f64,
    max_balance: f64,
}

impl BalanceLimits {
    pub fn new(min_balance: f64, max_balance: f64) -> Result<Self, LedgerError> {
        // Written so that NaN fails both comparisons.
        let valid = min_balance.is_finite()
            && max_balance.is_finite()
            && min_balance <= 0.0
            && max_balance > 0.0;

        if !valid {
            return Err(LedgerError::InvalidConfiguration {
                min_balance,
                max_balance,
            });
        }

        Ok(BalanceLimits {
            min_balance,
            max_balance,
        })
    }

    pub fn min_balance(&self) -> f64 {
        self.min_balance
    }

    pub fn max_balance(&self) -> f64 {
        self.max_balance
    }

    pub fn contains(&self, balance: f64) -> bool {
        balance >= self.min_balance && balance <= self.max_balance
    }
}

impl Default for BalanceLimits {
    fn default() -> Self {
        BalanceLimits {
            min_balance: DEFAULT_MIN_BALANCE,
            max_balance: DEFAULT_MAX_BALANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_empty() {
        let account = Account::new(7, 123);
        assert_eq!(account.id, 7);
        assert_eq!(account.owner_id, 123);
        assert_eq!(account.balance, 0.0);
    }

    #[test]
    fn test_account_serializes_with_service_field_names() {
        let account = Account::new(1, 42).with_balance(12.5);
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "id": 1, "ownerId": 42, "money": 12.5 })
        );
    }

    #[test]
    fn test_limits_accept_zero_min_and_positive_max() {
        let limits = BalanceLimits::new(0.0, 100.0).unwrap();
        assert!(limits.contains(0.0));
        assert!(limits.contains(100.0));
        assert!(!limits.contains(-0.01));
        assert!(!limits.contains(100.01));
    }

    #[test]
    fn test_limits_accept_overdraft() {
        let limits = BalanceLimits::new(-50.0, 100.0).unwrap();
        assert!(limits.contains(-50.0));
        assert!(!limits.contains(-50.5));
    }

    #[test]
    fn test_limits_reject_invalid_ranges() {
        for (min, max) in [
            (1.0, 100.0),
            (0.0, 0.0),
            (0.0, -1.0),
            (f64::NAN, 100.0),
            (0.0, f64::NAN),
            (f64::NEG_INFINITY, 100.0),
            (0.0, f64::INFINITY),
        ] {
            assert!(
                matches!(
                    BalanceLimits::new(min, max),
                    Err(LedgerError::InvalidConfiguration { .. })
                ),
                "expected ({min}, {max}) to be rejected"
            );
        }
    }

    #[test]
    fn test_default_limits_match_service_defaults() {
        let limits = BalanceLimits::default();
        assert_eq!(limits.min_balance(), 0.0);
        assert_eq!(limits.max_balance(), 1_000_000.0);
    }
}
