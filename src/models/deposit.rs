use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's declaration of a bank transfer, awaiting staff approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    pub user_id: u64,
    pub amount: Decimal,
    /// Path of the uploaded receipt inside the file storage
    pub proof_of_payment: String,
    pub is_approved: bool,
    /// Unix timestamp
    pub created_at: i64,
}

impl DepositRecord {
    pub fn new(user_id: u64, amount: Decimal, proof_of_payment: String, now: i64) -> Self {
        Self {
            user_id,
            amount,
            proof_of_payment,
            is_approved: false,
            created_at: now,
        }
    }

    /// Mark the deposit approved
    ///
    /// Returns `true` only on the transition, so the caller credits the
    /// depositor exactly once however many times approval is requested.
    pub fn approve(&mut self) -> bool {
        if self.is_approved {
            return false;
        }
        self.is_approved = true;
        true
    }
}

/// Deposit model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Deposit {
    pub id: u64,
    pub user_id: u64,
    pub amount: Decimal,
    pub proof_url: String,
    pub is_approved: bool,
    pub created_at: String,
}

impl Deposit {
    pub fn from_record(id: u64, record: &DepositRecord, proof_url: String) -> Self {
        Self {
            id,
            user_id: record.user_id,
            amount: record.amount,
            proof_url,
            is_approved: record.is_approved,
            created_at: crate::routes::timestamp_to_rfc3339(record.created_at),
        }
    }
}
