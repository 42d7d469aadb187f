use serde::{Deserialize, Serialize};

/// Bank account coordinates, used both for users (payout target) and for
/// the platform's receiving accounts shown on the deposit page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetailsRecord {
    pub bank_name: String,
    pub iban: String,
    pub account_holder_name: String,
}

impl BankDetailsRecord {
    /// Trim every field; all of them must be present
    pub fn normalized(
        bank_name: &str,
        iban: &str,
        account_holder_name: &str,
    ) -> Result<Self, String> {
        let record = Self {
            bank_name: bank_name.trim().to_string(),
            iban: iban.trim().to_uppercase(),
            account_holder_name: account_holder_name.trim().to_string(),
        };

        if record.bank_name.is_empty() || record.bank_name.chars().count() > 100 {
            return Err("Bank name is required (max 100 characters)".to_string());
        }
        if record.iban.is_empty() || record.iban.chars().count() > 50 {
            return Err("IBAN is required (max 50 characters)".to_string());
        }
        if record.account_holder_name.is_empty()
            || record.account_holder_name.chars().count() > 100
        {
            return Err("Account holder name is required (max 100 characters)".to_string());
        }

        Ok(record)
    }
}
