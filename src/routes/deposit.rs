use axum::{
    extract::{Multipart, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{self, all_records, get_setting, next_id, put_record, tables};
use crate::error::Result;
use crate::models::{BankDetailsRecord, Deposit, DepositRecord, LevelRecord, PlatformSettings};
use crate::routes::extract::AuthUser;
use crate::routes::upload::{store_image, UploadForm};
use crate::routes::validation::parse_amount;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PlatformBankAccount {
    pub id: u64,
    #[serde(flatten)]
    pub details: BankDetailsRecord,
}

#[derive(Debug, Serialize)]
pub struct DepositPageResponse {
    pub bank_accounts: Vec<PlatformBankAccount>,
    pub deposit_instruction: String,
    /// Distinct level prices, ascending, offered as quick amounts
    pub level_values: Vec<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct SubmitDepositResponse {
    pub success: bool,
    pub message: String,
    pub deposit: Deposit,
}

/// Where to transfer money and which amounts map to a level
pub async fn deposit_page(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<DepositPageResponse>> {
    let (accounts, settings, levels) = db::read(&state.db, |read_txn| {
        let accounts = all_records::<BankDetailsRecord, _>(
            &read_txn.open_table(tables::PLATFORM_BANK_ACCOUNTS)?,
        )?;
        let settings = get_setting::<PlatformSettings, _>(
            &read_txn.open_table(tables::SETTINGS)?,
            tables::SETTINGS_PLATFORM,
        )?
        .unwrap_or_default();
        let levels = all_records::<LevelRecord, _>(&read_txn.open_table(tables::LEVELS)?)?;
        Ok((accounts, settings, levels))
    })
    .await?;

    let mut level_values: Vec<Decimal> = levels.iter().map(|(_, l)| l.deposit_value).collect();
    level_values.sort();
    level_values.dedup();

    Ok(Json(DepositPageResponse {
        bank_accounts: accounts
            .into_iter()
            .map(|(id, details)| PlatformBankAccount { id, details })
            .collect(),
        deposit_instruction: settings.deposit_instruction(),
        level_values,
    }))
}

/// Declare a deposit with its payment receipt
///
/// Multipart fields: `amount` and the `proof` image. The deposit waits for
/// staff approval; the balance is untouched until then.
pub async fn submit_deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<SubmitDepositResponse>> {
    let form = UploadForm::read(multipart, "proof", state.config.max_upload_bytes).await?;
    let amount = parse_amount(form.text("amount")?)?;

    let proof = store_image(state.storage.as_ref(), "deposit_proofs", form.file).await?;

    let record = DepositRecord::new(auth.id, amount, proof.clone(), state.clock.timestamp());
    let to_insert = record.clone();
    let created = db::write(&state.db, move |write_txn| {
        let deposit_id = next_id(write_txn, tables::SEQ_DEPOSITS)?;
        let mut deposits = write_txn.open_table(tables::DEPOSITS)?;
        put_record(&mut deposits, deposit_id, &to_insert)?;
        let mut index = write_txn.open_multimap_table(tables::USER_DEPOSITS)?;
        index.insert(to_insert.user_id, deposit_id)?;
        Ok(deposit_id)
    })
    .await;

    let deposit_id = match created {
        Ok(id) => id,
        Err(e) => {
            state.storage.delete(&proof).await?;
            return Err(e);
        }
    };

    tracing::info!(
        "Deposit {} of {} submitted by user {}",
        deposit_id,
        amount,
        auth.id
    );

    Ok(Json(SubmitDepositResponse {
        success: true,
        message: "Deposit submitted successfully. Await approval.".to_string(),
        deposit: Deposit::from_record(deposit_id, &record, state.storage.url(&proof)),
    }))
}
