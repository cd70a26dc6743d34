use prometheus::{Counter, Histogram};

use crate::metrics::handler::{counter, histogram_fast_ops, histogram_slow_ops};
pub mod handler;
lazy_static::lazy_static!(
    pub static ref ACCOUNTS_OPENED_TOTAL: Counter =
        counter("accounts_opened_total", "Total number of opened accounts");

    pub static ref OPERATIONS_SUCCEEDED_TOTAL: Counter =
        counter("operations_succeeded_total", "Total number of successful ledger operations");

    pub static ref OPERATIONS_REJECTED_TOTAL: Counter =
        counter("operations_rejected_total", "Total number of ledger operations rejected by validation");


    pub static ref OPEN_ACCOUNT_TIME_SECONDS: Histogram =
        histogram_fast_ops("open_account_time_seconds", "Total time spent opening accounts in seconds");

    pub static ref DEPOSIT_TIME_SECONDS: Histogram =
        histogram_fast_ops("deposit_time_seconds", "Total time spent depositing funds in seconds");

    pub static ref WITHDRAW_TIME_SECONDS: Histogram =
        histogram_fast_ops("withdraw_time_seconds", "Total time spent withdrawing funds in seconds");

    pub static ref TRANSFER_TIME_SECONDS: Histogram =
        histogram_fast_ops("transfer_time_seconds", "Total time spent transferring funds in seconds");

    pub static ref REQUEST_TIME_SECONDS: Histogram =
        histogram_slow_ops("request_time_seconds", "Total time spent serving HTTP requests in seconds");
);
