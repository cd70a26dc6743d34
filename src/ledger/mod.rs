//! Ledger module owning every account and enforcing balance limits.

pub mod error;
pub mod interface;

use {
    crate::{
        ledger::{error::LedgerError, interface::LedgerInterface},
        measure,
        metrics::{
            ACCOUNTS_OPENED_TOTAL, DEPOSIT_TIME_SECONDS, OPEN_ACCOUNT_TIME_SECONDS,
            TRANSFER_TIME_SECONDS, WITHDRAW_TIME_SECONDS,
        },
        models::{Account, AccountId, BalanceLimits, OwnerId},
    },
    std::{
        collections::HashMap,
        sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    },
    tracing::debug,
};

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    next_account_id: AccountId,
}

impl LedgerState {
    fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts.get(&id).ok_or(LedgerError::AccountNotFound)
    }

    /// Balance `id` would hold after applying `delta`, if that stays within `limits`.
    fn checked_balance(
        &self,
        id: AccountId,
        delta: f64,
        limits: &BalanceLimits,
    ) -> Result<f64, LedgerError> {
        let new_balance = self.account(id)?.balance + delta;

        if !limits.contains(new_balance) {
            return Err(LedgerError::LimitExceeded);
        }

        Ok(new_balance)
    }

    fn apply(&mut self, id: AccountId, new_balance: f64) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound)?;

        *account = account.with_balance(new_balance);

        Ok(())
    }
}

pub struct Ledger {
    limits: BalanceLimits,
    // A single lock spans validation and every write of an operation, so a
    // transfer is never observable half-applied.
    state: RwLock<LedgerState>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_limits(BalanceLimits::default())
    }
}

impl Ledger {
    pub fn new(min_balance: f64, max_balance: f64) -> Result<Self, LedgerError> {
        Ok(Self::with_limits(BalanceLimits::new(min_balance, max_balance)?))
    }

    pub fn with_limits(limits: BalanceLimits) -> Self {
        Ledger {
            limits,
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn limits(&self) -> BalanceLimits {
        self.limits
    }

    pub fn account_count(&self) -> Result<usize, LedgerError> {
        Ok(self.acquire_accounts_read_lock()?.accounts.len())
    }

    fn acquire_accounts_write_lock(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::FailedToAcquireAccountsWriteLock)
    }

    fn acquire_accounts_read_lock(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::FailedToAcquireAccountsReadLock)
    }

    fn change_balance(&self, id: AccountId, delta: f64) -> Result<(), LedgerError> {
        let mut state = self.acquire_accounts_write_lock()?;

        let new_balance = state.checked_balance(id, delta, &self.limits)?;
        state.apply(id, new_balance)?;

        debug!("Account {} balance is now {}", id, new_balance);

        Ok(())
    }

    fn move_funds(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: f64,
    ) -> Result<(), LedgerError> {
        if source_id == target_id {
            return Err(LedgerError::SameAccount);
        }

        ensure_positive(amount)?;

        let mut state = self.acquire_accounts_write_lock()?;

        // Both sides are validated before either is written.
        let source_balance = state.checked_balance(source_id, -amount, &self.limits)?;
        let target_balance = state.checked_balance(target_id, amount, &self.limits)?;

        state.apply(source_id, source_balance)?;
        state.apply(target_id, target_balance)?;

        debug!(
            "Transferred {} from account {} to account {}",
            amount, source_id, target_id
        );

        Ok(())
    }
}

/// NaN and infinities are not strictly positive amounts.
fn ensure_positive(amount: f64) -> Result<(), LedgerError> {
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount)
    }
}

impl LedgerInterface for Ledger {
    fn open_account(&self, owner_id: OwnerId) -> Result<Account, LedgerError> {
        let account = measure!(OPEN_ACCOUNT_TIME_SECONDS, {
            let mut state = self.acquire_accounts_write_lock()?;

            let id = state.next_account_id;
            state.next_account_id += 1;

            let account = Account::new(id, owner_id);
            state.accounts.insert(id, account.clone());
            account
        });

        ACCOUNTS_OPENED_TOTAL.inc();
        debug!("Opened account {} for owner {}", account.id, owner_id);

        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let state = self.acquire_accounts_read_lock()?;
        state.account(id).cloned()
    }

    fn deposit(&self, id: AccountId, amount: f64) -> Result<(), LedgerError> {
        measure!(DEPOSIT_TIME_SECONDS, {
            ensure_positive(amount)?;
            self.change_balance(id, amount)
        })
    }

    fn withdraw(&self, id: AccountId, amount: f64) -> Result<(), LedgerError> {
        measure!(WITHDRAW_TIME_SECONDS, {
            ensure_positive(amount)?;
            self.change_balance(id, -amount)
        })
    }

    fn transfer(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: f64,
    ) -> Result<(), LedgerError> {
        measure!(TRANSFER_TIME_SECONDS, {
            self.move_funds(source_id, target_id, amount)
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        proptest::prelude::*,
        std::{sync::Arc, thread},
    };

    const OWNER_ID: OwnerId = 123;

    fn ledger() -> Ledger {
        Ledger::new(0.0, 1_000_000.0).unwrap()
    }

    fn balance(ledger: &Ledger, id: AccountId) -> f64 {
        ledger.get_account(id).unwrap().balance
    }

    #[test]
    fn test_new_rejects_invalid_limits() {
        assert!(matches!(
            Ledger::new(10.0, 100.0),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            Ledger::new(0.0, 0.0),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_open_account() {
        let ledger = ledger();
        let account = ledger.open_account(OWNER_ID).unwrap();

        assert_eq!(account.owner_id, OWNER_ID);
        assert_eq!(account.balance, 0.0);
        assert_eq!(ledger.get_account(account.id).unwrap(), account);
        assert_eq!(ledger.account_count().unwrap(), 1);
    }

    #[test]
    fn test_open_account_assigns_sequential_ids() {
        let ledger = ledger();
        let ids: Vec<AccountId> = (0..5)
            .map(|_| ledger.open_account(OWNER_ID).unwrap().id)
            .collect();

        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_get_unknown_account() {
        let ledger = ledger();
        ledger.open_account(OWNER_ID).unwrap();

        assert_eq!(ledger.get_account(42), Err(LedgerError::AccountNotFound));
        assert_eq!(ledger.get_account(-1), Err(LedgerError::AccountNotFound));
        assert_eq!(ledger.deposit(-1, 10.0), Err(LedgerError::AccountNotFound));
        assert_eq!(ledger.transfer(-1, -1, 10.0), Err(LedgerError::SameAccount));
    }

    #[test]
    fn test_returned_snapshot_does_not_alias_ledger() {
        let ledger = ledger();
        let mut account = ledger.open_account(OWNER_ID).unwrap();
        account.balance = 500.0;

        assert_eq!(balance(&ledger, account.id), 0.0);
    }

    #[test]
    fn test_deposits_accumulate() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;

        ledger.deposit(id, 1000.0).unwrap();
        ledger.deposit(id, 2000.0).unwrap();

        assert_eq!(balance(&ledger, id), 3000.0);
    }

    #[test]
    fn test_deposit_rejects_non_positive_amounts() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(id, 10.0).unwrap();

        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(ledger.deposit(id, amount), Err(LedgerError::InvalidAmount));
        }
        assert_eq!(balance(&ledger, id), 10.0);
    }

    #[test]
    fn test_deposit_above_max_balance() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;

        ledger.deposit(id, 1_000_000.0).unwrap();
        assert_eq!(ledger.deposit(id, 0.01), Err(LedgerError::LimitExceeded));
        assert_eq!(balance(&ledger, id), 1_000_000.0);
    }

    #[test]
    fn test_deposit_into_unknown_account() {
        let ledger = ledger();
        assert_eq!(ledger.deposit(3, 10.0), Err(LedgerError::AccountNotFound));
    }

    #[test]
    fn test_withdraw() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;

        ledger.deposit(id, 1000.0).unwrap();
        ledger.withdraw(id, 200.0).unwrap();

        assert_eq!(balance(&ledger, id), 800.0);
    }

    #[test]
    fn test_withdraw_below_min_balance() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(id, 50.0).unwrap();

        assert_eq!(ledger.withdraw(id, 50.5), Err(LedgerError::LimitExceeded));
        assert_eq!(balance(&ledger, id), 50.0);

        ledger.withdraw(id, 50.0).unwrap();
        assert_eq!(balance(&ledger, id), 0.0);
    }

    #[test]
    fn test_withdraw_into_overdraft() {
        let ledger = Ledger::new(-100.0, 1000.0).unwrap();
        let id = ledger.open_account(OWNER_ID).unwrap().id;

        ledger.withdraw(id, 100.0).unwrap();
        assert_eq!(balance(&ledger, id), -100.0);
        assert_eq!(ledger.withdraw(id, 1.0), Err(LedgerError::LimitExceeded));
    }

    #[test]
    fn test_withdraw_rejects_non_positive_amounts() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(id, 10.0).unwrap();

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert_eq!(ledger.withdraw(id, amount), Err(LedgerError::InvalidAmount));
        }
        assert_eq!(balance(&ledger, id), 10.0);
    }

    #[test]
    fn test_transfer() {
        let ledger = ledger();
        let first = ledger.open_account(1).unwrap().id;
        let second = ledger.open_account(1).unwrap().id;

        ledger.deposit(first, 100.0).unwrap();
        ledger.deposit(second, 200.0).unwrap();
        ledger.transfer(first, second, 20.0).unwrap();

        assert_eq!(balance(&ledger, first), 80.0);
        assert_eq!(balance(&ledger, second), 220.0);
    }

    #[test]
    fn test_transfer_to_same_account() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(id, 100.0).unwrap();

        assert_eq!(ledger.transfer(id, id, 10.0), Err(LedgerError::SameAccount));
        assert_eq!(ledger.transfer(id, id, -10.0), Err(LedgerError::SameAccount));
        assert_eq!(ledger.transfer(99, 99, 10.0), Err(LedgerError::SameAccount));
        assert_eq!(balance(&ledger, id), 100.0);
    }

    #[test]
    fn test_transfer_rejects_non_positive_amounts() {
        let ledger = ledger();
        let first = ledger.open_account(OWNER_ID).unwrap().id;
        let second = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(second, 100.0).unwrap();

        assert_eq!(ledger.transfer(first, second, -10.0), Err(LedgerError::InvalidAmount));
        assert_eq!(ledger.transfer(first, second, 0.0), Err(LedgerError::InvalidAmount));
        assert_eq!(balance(&ledger, first), 0.0);
        assert_eq!(balance(&ledger, second), 100.0);
    }

    #[test]
    fn test_transfer_exceeding_target_max_balance() {
        let ledger = ledger();
        let first = ledger.open_account(1).unwrap().id;
        let second = ledger.open_account(1).unwrap().id;

        ledger.deposit(first, 10.0).unwrap();
        ledger.deposit(second, 1_000_000.0).unwrap();

        assert_eq!(ledger.transfer(first, second, 10.0), Err(LedgerError::LimitExceeded));
        assert_eq!(balance(&ledger, first), 10.0);
        assert_eq!(balance(&ledger, second), 1_000_000.0);
    }

    #[test]
    fn test_transfer_exceeding_source_min_balance() {
        let ledger = ledger();
        let first = ledger.open_account(1).unwrap().id;
        let second = ledger.open_account(1).unwrap().id;

        ledger.deposit(first, 10.0).unwrap();

        assert_eq!(ledger.transfer(first, second, 10.5), Err(LedgerError::LimitExceeded));
        assert_eq!(balance(&ledger, first), 10.0);
        assert_eq!(balance(&ledger, second), 0.0);
    }

    #[test]
    fn test_transfer_with_unknown_account_leaves_other_side_untouched() {
        let ledger = ledger();
        let id = ledger.open_account(OWNER_ID).unwrap().id;
        ledger.deposit(id, 50.0).unwrap();

        assert_eq!(ledger.transfer(id, 77, 10.0), Err(LedgerError::AccountNotFound));
        assert_eq!(ledger.transfer(77, id, 10.0), Err(LedgerError::AccountNotFound));
        assert_eq!(balance(&ledger, id), 50.0);
    }

    #[test]
    fn test_concurrent_deposits_are_not_lost() {
        let ledger = Arc::new(ledger());
        let id = ledger.open_account(OWNER_ID).unwrap().id;

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.deposit(id, 1.0).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(balance(&ledger, id), 6400.0);
    }

    #[test]
    fn test_concurrent_open_account_ids_are_unique() {
        let ledger = Arc::new(ledger());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    (0..250)
                        .map(|_| ledger.open_account(OWNER_ID).unwrap().id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<AccountId> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 2000);
        assert_eq!(ids.last(), Some(&1999));
    }

    #[test]
    fn test_concurrent_transfers_conserve_total() {
        let ledger = Arc::new(ledger());
        let first = ledger.open_account(1).unwrap().id;
        let second = ledger.open_account(2).unwrap().id;
        ledger.deposit(first, 500.0).unwrap();
        ledger.deposit(second, 500.0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                let (source, target) = if worker % 2 == 0 {
                    (first, second)
                } else {
                    (second, first)
                };
                thread::spawn(move || {
                    for _ in 0..200 {
                        // Rejections at the limits are expected here.
                        let _ = ledger.transfer(source, target, 3.0);
                        let source_balance = ledger.get_account(source).unwrap().balance;
                        assert!((0.0..=1_000_000.0).contains(&source_balance));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(balance(&ledger, first) + balance(&ledger, second), 1000.0);
    }

    proptest! {
        #[test]
        fn prop_ids_strictly_increase(count in 1usize..50) {
            let ledger = ledger();
            let ids: Vec<AccountId> = (0..count)
                .map(|_| ledger.open_account(OWNER_ID).unwrap().id)
                .collect();

            prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn prop_balance_stays_within_limits(
            operations in proptest::collection::vec((any::<bool>(), 1u32..400_000), 1..40)
        ) {
            let ledger = ledger();
            let id = ledger.open_account(OWNER_ID).unwrap().id;

            for (is_deposit, tenths) in operations {
                let amount = f64::from(tenths) / 10.0;
                let before = balance(&ledger, id);
                let result = if is_deposit {
                    ledger.deposit(id, amount)
                } else {
                    ledger.withdraw(id, amount)
                };
                let after = balance(&ledger, id);

                match result {
                    Ok(()) => prop_assert_ne!(before, after),
                    Err(error) => {
                        prop_assert_eq!(error, LedgerError::LimitExceeded);
                        prop_assert_eq!(before, after);
                    }
                }
                prop_assert!(ledger.limits().contains(after));
            }
        }
    }
}
