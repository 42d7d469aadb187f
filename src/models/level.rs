use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_LEVEL_NAME_LEN;

/// A purchasable earnings tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRecord {
    pub name: String,
    /// Price of the level
    pub deposit_value: Decimal,
    /// Credited once per completed daily task
    pub daily_gain: Decimal,
    pub monthly_gain: Decimal,
    pub cycle_days: u32,
    /// Path of the level image inside the file storage
    pub image: String,
}

/// Record of a user buying a level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLevelRecord {
    pub user_id: u64,
    pub level_id: u64,
    /// Unix timestamp
    pub purchased_at: i64,
    pub is_active: bool,
}

/// Level model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Level {
    pub id: u64,
    pub name: String,
    pub deposit_value: Decimal,
    pub daily_gain: Decimal,
    pub monthly_gain: Decimal,
    pub cycle_days: u32,
    pub image_url: String,
}

impl Level {
    pub fn from_record(id: u64, record: &LevelRecord, image_url: String) -> Self {
        Self {
            id,
            name: record.name.clone(),
            deposit_value: record.deposit_value,
            daily_gain: record.daily_gain,
            monthly_gain: record.monthly_gain,
            cycle_days: record.cycle_days,
            image_url,
        }
    }

    pub fn validate_name(name: &str) -> bool {
        !name.trim().is_empty() && name.chars().count() <= MAX_LEVEL_NAME_LEN
    }
}

/// Order levels the way every listing shows them: cheapest first
pub fn sort_by_price(levels: &mut [(u64, LevelRecord)]) {
    levels.sort_by(|(a_id, a), (b_id, b)| {
        a.deposit_value
            .cmp(&b.deposit_value)
            .then_with(|| a_id.cmp(b_id))
    });
}

/// The user's first active purchase (lowest id), if any
pub fn first_active(user_levels: &[(u64, UserLevelRecord)]) -> Option<&(u64, UserLevelRecord)> {
    user_levels
        .iter()
        .filter(|(_, ul)| ul.is_active)
        .min_by_key(|(id, _)| *id)
}

/// Subsidy owed to an inviter when their invitee buys a first level
///
/// `percent` is a whole percentage (15 means 15%); the result is rounded
/// half-up to cents.
pub fn referral_subsidy(deposit_value: Decimal, percent: Decimal) -> Decimal {
    (deposit_value * percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
