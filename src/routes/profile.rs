use axum::{extract::State, Json};
use redb::ReadableTableMetadata;
use serde::{Deserialize, Serialize};

use crate::db::{
    self, decode, get_record, put_record,
    queries::{owned_records, require_user},
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{BankDetailsRecord, Level, LevelRecord, SessionRecord, User, UserLevelRecord};
use crate::routes::extract::AuthUser;
use crate::security::{hash_password, verify_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BankDetailsRequest {
    pub bank_name: String,
    pub iban: String,
    pub account_holder_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    /// Empty fields when the user never saved bank details
    pub bank_details: BankDetailsRecord,
    pub active_levels: Vec<Level>,
}

#[derive(Debug, Serialize)]
pub struct BankDetailsResponse {
    pub success: bool,
    pub message: String,
    pub bank_details: BankDetailsRecord,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub success: bool,
    pub message: String,
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>> {
    let user_id = auth.id;

    let (user, bank_details, levels) = db::read(&state.db, move |read_txn| {
        let user = require_user(&read_txn.open_table(tables::USERS)?, user_id)?;
        let bank_details = get_record::<BankDetailsRecord, _>(
            &read_txn.open_table(tables::BANK_DETAILS)?,
            user_id,
        )?
        .unwrap_or_default();

        let purchases: Vec<(u64, UserLevelRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
            &read_txn.open_table(tables::USER_LEVELS)?,
            user_id,
        )?;
        let levels_table = read_txn.open_table(tables::LEVELS)?;
        let mut levels = Vec::new();
        for (_, purchase) in purchases.iter().filter(|(_, p)| p.is_active) {
            if let Some(level) = get_record::<LevelRecord, _>(&levels_table, purchase.level_id)? {
                levels.push((purchase.level_id, level));
            }
        }

        Ok((user, bank_details, levels))
    })
    .await?;

    Ok(Json(ProfileResponse {
        user: User::from_record(user_id, &user),
        bank_details,
        active_levels: levels
            .iter()
            .map(|(id, level)| Level::from_record(*id, level, state.storage.url(&level.image)))
            .collect(),
    }))
}

/// Save the account withdrawals are paid to
pub async fn update_bank_details(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BankDetailsRequest>,
) -> Result<Json<BankDetailsResponse>> {
    let details = BankDetailsRecord::normalized(
        &payload.bank_name,
        &payload.iban,
        &payload.account_holder_name,
    )
    .map_err(AppError::InvalidInput)?;

    let user_id = auth.id;
    let to_store = details.clone();
    db::write(&state.db, move |write_txn| {
        let mut table = write_txn.open_table(tables::BANK_DETAILS)?;
        put_record(&mut table, user_id, &to_store)
    })
    .await?;

    tracing::info!("User {} updated bank details", user_id);

    Ok(Json(BankDetailsResponse {
        success: true,
        message: "Bank details updated successfully.".to_string(),
        bank_details: details,
    }))
}

/// Change the password and sign out every other session
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    let user_id = auth.id;
    let user = db::read(&state.db, move |read_txn| {
        require_user(&read_txn.open_table(tables::USERS)?, user_id)
    })
    .await?;

    User::validate_password(&payload.new_password, &user.phone_number)
        .map_err(AppError::InvalidInput)?;

    let old_password = payload.old_password;
    let new_password = payload.new_password;
    let stored_hash = user.password_hash;
    let new_hash = tokio::task::spawn_blocking(move || {
        if !verify_password(&old_password, &stored_hash) {
            return Err(AppError::Rejected(
                "Your current password is incorrect.".to_string(),
            ));
        }
        hash_password(&new_password)
    })
    .await??;

    let keep_session = auth.session_key;
    let revoked = db::write(&state.db, move |write_txn| {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;
        user.password_hash = new_hash;
        put_record(&mut users, user_id, &user)?;

        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        let before = sessions.len()?;
        sessions.retain(|key, bytes| {
            key == keep_session
                || decode::<SessionRecord>(bytes)
                    .map(|s| s.user_id != user_id)
                    .unwrap_or(false)
        })?;
        Ok(before - sessions.len()?)
    })
    .await?;

    tracing::info!(
        "User {} changed password; {} other session(s) revoked",
        user_id,
        revoked
    );

    Ok(Json(ChangePasswordResponse {
        success: true,
        message: "Your password was changed successfully.".to_string(),
    }))
}
