use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_REWARD_CODE_LEN;

/// Code published by staff that users redeem for a daily bonus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRewardCodeRecord {
    pub code: String,
    pub reward_amount: Decimal,
    pub is_active: bool,
    /// Local date on which the code can be redeemed
    pub valid_on: NaiveDate,
}

impl DailyRewardCodeRecord {
    pub fn redeemable_on(&self, day: NaiveDate) -> bool {
        self.is_active && self.valid_on == day
    }

    pub fn validate_code(code: &str) -> bool {
        !code.is_empty()
            && code.chars().count() <= MAX_REWARD_CODE_LEN
            && !code.chars().any(char::is_whitespace)
    }
}

/// A user's redemption, stored under (user id, claim date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaimRecord {
    pub reward_code_id: u64,
    pub code: String,
    pub reward_amount: Decimal,
    pub claim_date: NaiveDate,
    /// Unix timestamp
    pub claimed_at: i64,
}

/// Claim model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct RewardClaim {
    pub code: String,
    pub reward_amount: Decimal,
    pub claim_date: NaiveDate,
    pub claimed_at: String,
}

impl From<&RewardClaimRecord> for RewardClaim {
    fn from(record: &RewardClaimRecord) -> Self {
        Self {
            code: record.code.clone(),
            reward_amount: record.reward_amount,
            claim_date: record.claim_date,
            claimed_at: crate::routes::timestamp_to_rfc3339(record.claimed_at),
        }
    }
}

/// Key component used for a claim date in the claims table
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
