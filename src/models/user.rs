use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_INSUFFICIENT_BALANCE, MAX_PHONE_LEN, MIN_PASSWORD_LEN};
use crate::error::{AppError, Result};

/// User record stored in redb
/// Uses Unix timestamps for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub phone_number: String,
    pub full_name: Option<String>,
    /// Argon2 PHC string
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    /// When the user registered (Unix timestamp)
    pub date_joined: i64,
    pub invite_code: String,
    pub invited_by: Option<u64>,
    pub available_balance: Decimal,
    /// Running total of subsidies received (referrals, roulette, daily codes)
    pub subsidy_balance: Decimal,
    pub level_active: bool,
    pub roulette_spins: u32,
    /// Set once this user's inviter has been paid the first-level subsidy
    pub first_level_subsidy_paid: bool,
}

impl UserRecord {
    pub fn new(
        phone_number: String,
        full_name: Option<String>,
        password_hash: String,
        invite_code: String,
        invited_by: Option<u64>,
        now: i64,
    ) -> Self {
        Self {
            phone_number,
            full_name,
            password_hash,
            is_staff: false,
            is_active: true,
            date_joined: now,
            invite_code,
            invited_by,
            available_balance: Decimal::ZERO,
            subsidy_balance: Decimal::ZERO,
            level_active: false,
            roulette_spins: 0,
            first_level_subsidy_paid: false,
        }
    }

    /// Add to the spendable balance
    pub fn credit(&mut self, amount: Decimal) {
        self.available_balance += amount;
    }

    /// Add a subsidy: counted in the subsidy total and spendable at once
    pub fn credit_subsidy(&mut self, amount: Decimal) {
        self.subsidy_balance += amount;
        self.available_balance += amount;
    }

    /// Take from the spendable balance, refusing to go negative
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        if self.available_balance < amount {
            return Err(AppError::Rejected(ERR_INSUFFICIENT_BALANCE.to_string()));
        }
        self.available_balance -= amount;
        Ok(())
    }
}

/// User model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub phone_number: String,
    pub full_name: Option<String>,
    pub is_staff: bool,
    pub date_joined: String,
    pub invite_code: String,
    pub available_balance: Decimal,
    pub subsidy_balance: Decimal,
    pub level_active: bool,
    pub roulette_spins: u32,
}

impl User {
    pub fn from_record(id: u64, record: &UserRecord) -> Self {
        Self {
            id,
            phone_number: record.phone_number.clone(),
            full_name: record.full_name.clone(),
            is_staff: record.is_staff,
            date_joined: crate::routes::timestamp_to_rfc3339(record.date_joined),
            invite_code: record.invite_code.clone(),
            available_balance: record.available_balance,
            subsidy_balance: record.subsidy_balance,
            level_active: record.level_active,
            roulette_spins: record.roulette_spins,
        }
    }

    /// Phone numbers are digits with an optional leading '+'
    pub fn validate_phone(phone: &str) -> bool {
        let digits = phone.strip_prefix('+').unwrap_or(phone);
        !digits.is_empty()
            && phone.len() <= MAX_PHONE_LEN
            && digits.chars().all(|c| c.is_ascii_digit())
    }

    /// Check a new password against the platform's password policy
    pub fn validate_password(password: &str, phone: &str) -> std::result::Result<(), String> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must contain at least {} characters",
                MIN_PASSWORD_LEN
            ));
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            return Err("Password cannot be entirely numeric".to_string());
        }
        if password == phone {
            return Err("Password is too similar to the phone number".to_string());
        }
        Ok(())
    }
}
