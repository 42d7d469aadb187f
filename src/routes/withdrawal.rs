use axum::{extract::State, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{
    self, get_record, get_setting, next_id, put_record,
    queries::{is_on_day, owned_records, require_user},
    tables,
};
use crate::error::Result;
use crate::models::withdrawal::WithdrawalContext;
use crate::models::{
    BankDetailsRecord, PlatformSettings, Withdrawal, WithdrawalPolicy, WithdrawalRecord,
};
use crate::routes::extract::AuthUser;
use crate::routes::validation::{deserialize_amount, validate_amount};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalPageResponse {
    pub withdrawal_instruction: String,
    pub withdrawals: Vec<Withdrawal>,
    pub has_bank_details: bool,
    pub has_withdrawn_today: bool,
    pub min_amount: Decimal,
    pub opens_at: String,
    pub closes_at: String,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    pub success: bool,
    pub message: String,
    pub withdrawal: Withdrawal,
    pub available_balance: Decimal,
}

fn policy(state: &AppState) -> WithdrawalPolicy {
    let (opens_at, closes_at) = state.config.withdrawal_window();
    WithdrawalPolicy {
        min_amount: state.config.min_withdrawal,
        opens_at,
        closes_at,
    }
}

/// The caller's withdrawals (newest first) and what the form needs to know
pub async fn withdrawal_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<WithdrawalPageResponse>> {
    let offset = state.config.local_offset();
    let today: NaiveDate = state.clock.local_now(offset).date_naive();
    let user_id = auth.id;

    let (mut withdrawals, has_bank_details, settings) = db::read(&state.db, move |read_txn| {
        let withdrawals: Vec<(u64, WithdrawalRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_WITHDRAWALS)?,
            &read_txn.open_table(tables::WITHDRAWALS)?,
            user_id,
        )?;
        let has_bank_details = get_record::<BankDetailsRecord, _>(
            &read_txn.open_table(tables::BANK_DETAILS)?,
            user_id,
        )?
        .is_some();
        let settings = get_setting::<PlatformSettings, _>(
            &read_txn.open_table(tables::SETTINGS)?,
            tables::SETTINGS_PLATFORM,
        )?
        .unwrap_or_default();
        Ok((withdrawals, has_bank_details, settings))
    })
    .await?;

    let has_withdrawn_today = withdrawals
        .iter()
        .any(|(_, w)| is_on_day(w.created_at, today, offset));
    withdrawals.sort_by(|(a_id, a), (b_id, b)| {
        b.created_at.cmp(&a.created_at).then_with(|| b_id.cmp(a_id))
    });

    let policy = policy(&state);
    Ok(Json(WithdrawalPageResponse {
        withdrawal_instruction: settings.withdrawal_instruction(),
        withdrawals: withdrawals
            .iter()
            .map(|(id, w)| Withdrawal::from_record(*id, w))
            .collect(),
        has_bank_details,
        has_withdrawn_today,
        min_amount: policy.min_amount,
        opens_at: policy.opens_at.format("%H:%M").to_string(),
        closes_at: policy.closes_at.format("%H:%M").to_string(),
    }))
}

/// Request a payout
///
/// Rules are checked in order: bank details on file, local time inside the
/// withdrawal window, no earlier request today, minimum amount, and
/// sufficient balance. The amount leaves the balance immediately and comes
/// back only if staff reject the request.
pub async fn request_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>> {
    let amount = validate_amount(payload.amount)?;
    let policy = policy(&state);
    let offset = state.config.local_offset();
    let local_now = state.clock.local_now(offset);
    let today = local_now.date_naive();
    let now = state.clock.timestamp();
    let user_id = auth.id;

    let result = db::write(&state.db, move |write_txn| {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;

        let has_bank_details = get_record::<BankDetailsRecord, _>(
            &write_txn.open_table(tables::BANK_DETAILS)?,
            user_id,
        )?
        .is_some();

        let mut withdrawals = write_txn.open_table(tables::WITHDRAWALS)?;
        let mut index = write_txn.open_multimap_table(tables::USER_WITHDRAWALS)?;
        let existing: Vec<(u64, WithdrawalRecord)> = owned_records(&index, &withdrawals, user_id)?;
        let has_withdrawn_today = existing
            .iter()
            .any(|(_, w)| is_on_day(w.created_at, today, offset));

        let ctx = WithdrawalContext {
            local_time: local_now.time(),
            has_bank_details,
            has_withdrawn_today,
            available_balance: user.available_balance,
        };
        policy.check(amount, &ctx)?;

        user.debit(amount)?;
        let withdrawal_id = next_id(write_txn, tables::SEQ_WITHDRAWALS)?;
        let record = WithdrawalRecord::new(user_id, amount, now);
        put_record(&mut withdrawals, withdrawal_id, &record)?;
        index.insert(user_id, withdrawal_id)?;
        put_record(&mut users, user_id, &user)?;

        Ok((withdrawal_id, record, user.available_balance))
    })
    .await;

    let (withdrawal_id, record, balance) = result.inspect_err(|e| {
        tracing::warn!("Withdrawal by user {} refused: {}", user_id, e);
    })?;

    tracing::info!(
        "Withdrawal {} of {} requested by user {}",
        withdrawal_id,
        amount,
        user_id
    );

    Ok(Json(WithdrawalResponse {
        success: true,
        message: "Withdrawal requested successfully. Await approval.".to_string(),
        withdrawal: Withdrawal::from_record(withdrawal_id, &record),
        available_balance: balance,
    }))
}
