use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use redb::ReadableTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_ALREADY_CLAIMED, ERR_INVALID_REWARD_CODE, REWARD_HISTORY_LIMIT};
use crate::db::{
    self, all_records, decode, encode, get_record, next_id, put_record,
    queries::require_user,
    tables,
};
use crate::error::{AppError, Result};
use crate::models::reward::day_key;
use crate::models::{DailyRewardCodeRecord, RewardClaim, RewardClaimRecord};
use crate::routes::extract::{AuthUser, StaffUser};
use crate::routes::validation::deserialize_amount;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub reward_code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRewardCodeRequest {
    pub code: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub reward_amount: Decimal,
    /// Defaults to today (local)
    pub valid_on: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct RewardsPageResponse {
    pub subsidy_balance: Decimal,
    pub has_code_today: bool,
    pub today_reward_amount: Option<Decimal>,
    pub has_claimed_today: bool,
    pub claims: Vec<RewardClaim>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub message: String,
    pub reward_amount: Decimal,
    pub subsidy_balance: Decimal,
    pub available_balance: Decimal,
}

/// Reward code as seen by staff
#[derive(Debug, Serialize)]
pub struct RewardCodeResponse {
    pub id: u64,
    pub code: String,
    pub reward_amount: Decimal,
    pub is_active: bool,
    pub valid_on: NaiveDate,
}

impl RewardCodeResponse {
    fn from_record(id: u64, record: &DailyRewardCodeRecord) -> Self {
        Self {
            id,
            code: record.code.clone(),
            reward_amount: record.reward_amount,
            is_active: record.is_active,
            valid_on: record.valid_on,
        }
    }
}

/// Today's code availability (never the code itself) and claim history
pub async fn rewards_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<RewardsPageResponse>> {
    let today = state.clock.local_now(state.config.local_offset()).date_naive();
    let today_key = day_key(today);
    let user_id = auth.id;

    let (user, todays_code, has_claimed_today, mut claims) =
        db::read(&state.db, move |read_txn| {
            let user = require_user(&read_txn.open_table(tables::USERS)?, user_id)?;

            let codes = all_records::<DailyRewardCodeRecord, _>(
                &read_txn.open_table(tables::REWARD_CODES)?,
            )?;
            let todays_code = codes
                .into_iter()
                .map(|(_, code)| code)
                .find(|code| code.redeemable_on(today));

            let claims_table = read_txn.open_table(tables::REWARD_CLAIMS)?;
            let has_claimed_today = claims_table.get((user_id, today_key.as_str()))?.is_some();

            let mut claims = Vec::new();
            for entry in claims_table.range((user_id, "")..(user_id + 1, ""))? {
                let (_, bytes) = entry?;
                claims.push(decode::<RewardClaimRecord>(bytes.value())?);
            }

            Ok((user, todays_code, has_claimed_today, claims))
        })
        .await?;

    claims.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at));
    claims.truncate(REWARD_HISTORY_LIMIT);

    Ok(Json(RewardsPageResponse {
        subsidy_balance: user.subsidy_balance,
        has_code_today: todays_code.is_some(),
        today_reward_amount: todays_code.map(|code| code.reward_amount),
        has_claimed_today,
        claims: claims.iter().map(RewardClaim::from).collect(),
    }))
}

/// Redeem today's reward code
///
/// One claim per user per local day; the (user, day) key of the claims
/// table rejects a second claim even under concurrent requests.
pub async fn claim_reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>> {
    let code = payload.reward_code.trim().to_string();
    let today = state.clock.local_now(state.config.local_offset()).date_naive();
    let now = state.clock.timestamp();
    let user_id = auth.id;

    let (amount, user) = db::write(&state.db, move |write_txn| {
        let today_key = day_key(today);
        let mut claims = write_txn.open_table(tables::REWARD_CLAIMS)?;
        if claims.get((user_id, today_key.as_str()))?.is_some() {
            return Err(AppError::Conflict(ERR_ALREADY_CLAIMED.to_string()));
        }

        let code_id = write_txn
            .open_table(tables::REWARD_CODE_NAMES)?
            .get(code.as_str())?
            .map(|id| id.value());
        let reward_code = match code_id {
            Some(id) => get_record::<DailyRewardCodeRecord, _>(
                &write_txn.open_table(tables::REWARD_CODES)?,
                id,
            )?
            .map(|record| (id, record)),
            None => None,
        };
        let (code_id, reward_code) = reward_code
            .filter(|(_, record)| record.redeemable_on(today))
            .ok_or_else(|| AppError::Rejected(ERR_INVALID_REWARD_CODE.to_string()))?;

        let claim = RewardClaimRecord {
            reward_code_id: code_id,
            code: reward_code.code.clone(),
            reward_amount: reward_code.reward_amount,
            claim_date: today,
            claimed_at: now,
        };
        let bytes = encode(&claim)?;
        claims.insert((user_id, today_key.as_str()), bytes.as_slice())?;

        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;
        user.credit_subsidy(reward_code.reward_amount);
        put_record(&mut users, user_id, &user)?;

        Ok((reward_code.reward_amount, user))
    })
    .await
    .inspect_err(|e| tracing::warn!("Reward claim refused for user {}: {}", user_id, e))?;

    tracing::info!("User {} claimed a daily reward of {}", user_id, amount);

    Ok(Json(ClaimResponse {
        success: true,
        message: format!("Reward of {} Kz claimed successfully!", amount),
        reward_amount: amount,
        subsidy_balance: user.subsidy_balance,
        available_balance: user.available_balance,
    }))
}

/// Publish a reward code (staff)
///
/// Codes are unique, and only one active code may exist per date.
pub async fn create_reward_code(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(payload): Json<CreateRewardCodeRequest>,
) -> Result<Json<RewardCodeResponse>> {
    let code = payload.code.trim().to_string();
    if !DailyRewardCodeRecord::validate_code(&code) {
        return Err(AppError::InvalidInput(
            "Reward code must be 1-20 characters without spaces".to_string(),
        ));
    }
    let reward_amount = crate::routes::validation::validate_amount(payload.reward_amount)?;
    let valid_on = payload
        .valid_on
        .unwrap_or_else(|| state.clock.local_now(state.config.local_offset()).date_naive());

    let record = DailyRewardCodeRecord {
        code,
        reward_amount,
        is_active: payload.is_active,
        valid_on,
    };

    let to_insert = record.clone();
    let code_id = db::write(&state.db, move |write_txn| {
        let mut names = write_txn.open_table(tables::REWARD_CODE_NAMES)?;
        if names.get(to_insert.code.as_str())?.is_some() {
            return Err(AppError::Conflict(format!(
                "Reward code {} already exists",
                to_insert.code
            )));
        }

        let mut codes = write_txn.open_table(tables::REWARD_CODES)?;
        if to_insert.is_active {
            ensure_no_active_code(&codes, to_insert.valid_on)?;
        }

        let code_id = next_id(write_txn, tables::SEQ_REWARD_CODES)?;
        put_record(&mut codes, code_id, &to_insert)?;
        names.insert(to_insert.code.as_str(), code_id)?;
        Ok(code_id)
    })
    .await?;

    tracing::info!(
        "Staff user {} published reward code {} for {}",
        staff.id,
        code_id,
        record.valid_on
    );

    Ok(Json(RewardCodeResponse::from_record(code_id, &record)))
}

/// Withdraw a reward code (staff)
pub async fn deactivate_reward_code(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(code_id): Path<u64>,
) -> Result<Json<RewardCodeResponse>> {
    let record = db::write(&state.db, move |write_txn| {
        let mut codes = write_txn.open_table(tables::REWARD_CODES)?;
        let mut record: DailyRewardCodeRecord =
            get_record(&codes, code_id)?.ok_or(AppError::NotFound("Reward code"))?;
        record.is_active = false;
        put_record(&mut codes, code_id, &record)?;
        Ok(record)
    })
    .await?;

    tracing::info!("Staff user {} deactivated reward code {}", staff.id, code_id);

    Ok(Json(RewardCodeResponse::from_record(code_id, &record)))
}

fn ensure_no_active_code<T>(codes: &T, valid_on: NaiveDate) -> Result<()>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    let clash = all_records::<DailyRewardCodeRecord, _>(codes)?
        .into_iter()
        .any(|(_, code)| code.redeemable_on(valid_on));
    if clash {
        return Err(AppError::Conflict(format!(
            "An active reward code already exists for {}",
            valid_on
        )));
    }
    Ok(())
}
