use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Failed to acquire accounts write lock")]
    FailedToAcquireAccountsWriteLock,
    #[error("Failed to acquire accounts read lock")]
    FailedToAcquireAccountsReadLock,
    #[error("Account does not exist.")]
    AccountNotFound,
    #[error("Specified money must be positive.")]
    InvalidAmount,
    #[error("Unable to perform the operation due to account limits.")]
    LimitExceeded,
    #[error("Source and target accounts must be different.")]
    SameAccount,
    #[error(
        "Invalid balance limits: min balance {min_balance} must be zero or less and max balance {max_balance} must be positive"
    )]
    InvalidConfiguration { min_balance: f64, max_balance: f64 },
}

impl LedgerError {
    /// Whether the error is a rejected request rather than a broken ledger.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            LedgerError::FailedToAcquireAccountsReadLock
                | LedgerError::FailedToAcquireAccountsWriteLock
        )
    }
}
