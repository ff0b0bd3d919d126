//! Withdrawal module: members request payouts of their earned balance
//! through Telebirr or CBE.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WithdrawError, WithdrawResult};
pub use manager::{MIN_WITHDRAWAL, WithdrawManager};
pub use models::{
    NewWithdrawRequest, WithdrawId, WithdrawMethod, WithdrawOutcome, WithdrawRequest,
    WithdrawStatus,
};
