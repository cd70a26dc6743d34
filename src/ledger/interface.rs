use crate::{
    ledger::error::LedgerError,
    models::{Account, AccountId, OwnerId},
};

pub trait LedgerInterface {
    /// Opens an empty account for the given owner and returns a snapshot of it.
    fn open_account(&self, owner_id: OwnerId) -> Result<Account, LedgerError>;

    /// Gets a snapshot of an account by its id.
    fn get_account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Adds a strictly positive amount to an account, within the max balance.
    fn deposit(&self, id: AccountId, amount: f64) -> Result<(), LedgerError>;

    /// Removes a strictly positive amount from an account, within the min balance.
    fn withdraw(&self, id: AccountId, amount: f64) -> Result<(), LedgerError>;

    /// Atomically moves an amount between two distinct accounts.
    /// Either both balances change or neither does.
    fn transfer(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: f64,
    ) -> Result<(), LedgerError>;
}
