use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ERR_BANK_DETAILS_REQUIRED, ERR_INSUFFICIENT_BALANCE, ERR_ONE_WITHDRAWAL_PER_DAY,
};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A payout request. The amount leaves the balance when the request is made
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub user_id: u64,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    /// Unix timestamp
    pub created_at: i64,
}

impl WithdrawalRecord {
    pub fn new(user_id: u64, amount: Decimal, now: i64) -> Self {
        Self {
            user_id,
            amount,
            status: WithdrawalStatus::Pending,
            created_at: now,
        }
    }

    /// Move a pending request to its final status
    pub fn settle(&mut self, status: WithdrawalStatus) -> Result<()> {
        if self.status != WithdrawalStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Withdrawal has already been {}",
                match self.status {
                    WithdrawalStatus::Approved => "approved",
                    _ => "rejected",
                }
            )));
        }
        self.status = status;
        Ok(())
    }
}

/// Withdrawal model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    pub id: u64,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub created_at: String,
}

impl Withdrawal {
    pub fn from_record(id: u64, record: &WithdrawalRecord) -> Self {
        Self {
            id,
            amount: record.amount,
            status: record.status,
            created_at: crate::routes::timestamp_to_rfc3339(record.created_at),
        }
    }
}

/// Rules a withdrawal request must pass
#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    pub min_amount: Decimal,
    /// First local time of day at which requests are accepted
    pub opens_at: NaiveTime,
    /// Last local time of day at which requests are accepted (inclusive)
    pub closes_at: NaiveTime,
}

/// The requester's situation at the moment of the request
#[derive(Debug, Clone)]
pub struct WithdrawalContext {
    pub local_time: NaiveTime,
    pub has_bank_details: bool,
    pub has_withdrawn_today: bool,
    pub available_balance: Decimal,
}

impl WithdrawalPolicy {
    /// Check a request; the first failing rule decides the message
    pub fn check(&self, amount: Decimal, ctx: &WithdrawalContext) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Amount must be greater than zero".to_string(),
            ));
        }

        if !ctx.has_bank_details {
            return Err(AppError::Rejected(ERR_BANK_DETAILS_REQUIRED.to_string()));
        }

        if ctx.local_time < self.opens_at || ctx.local_time > self.closes_at {
            return Err(AppError::Rejected(format!(
                "Withdrawals are only allowed between {} and {}.",
                self.opens_at.format("%H:%M"),
                self.closes_at.format("%H:%M")
            )));
        }

        if ctx.has_withdrawn_today {
            return Err(AppError::Rejected(ERR_ONE_WITHDRAWAL_PER_DAY.to_string()));
        }

        if amount < self.min_amount {
            return Err(AppError::Rejected(format!(
                "The minimum withdrawal amount is {} Kz.",
                self.min_amount
            )));
        }

        if ctx.available_balance < amount {
            return Err(AppError::Rejected(ERR_INSUFFICIENT_BALANCE.to_string()));
        }

        Ok(())
    }
}
