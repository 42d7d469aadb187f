use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use redb::ReadableTable;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{
    self, all_records, get_record, next_id, put_record,
    queries::{active_level_ids, require_user, ActiveLevelRow},
    tables,
};
use crate::error::{AppError, Result};
use crate::models::level::{referral_subsidy, sort_by_price};
use crate::models::{Level, LevelRecord, UserLevelRecord, UserRecord};
use crate::routes::extract::{AuthUser, StaffUser};
use crate::routes::upload::{store_image, UploadForm};
use crate::routes::validation::parse_amount;
use crate::storage::FileStorage;
use crate::AppState;

/// A user's active level as shown on the menu, task and income pages
#[derive(Debug, Serialize)]
pub struct ActiveLevel {
    pub user_level_id: u64,
    pub purchased_at: String,
    pub level: Level,
}

impl ActiveLevel {
    pub fn from_row(row: &ActiveLevelRow, storage: &dyn FileStorage) -> Self {
        Self {
            user_level_id: row.user_level_id,
            purchased_at: crate::routes::timestamp_to_rfc3339(row.purchase.purchased_at),
            level: Level::from_record(row.level_id, &row.level, storage.url(&row.level.image)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LevelsResponse {
    pub levels: Vec<Level>,
    pub active_level_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub message: String,
    pub level: Level,
    pub available_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CreateLevelResponse {
    pub success: bool,
    pub level: Level,
}

/// All levels, cheapest first, as API views
pub fn level_views(mut levels: Vec<(u64, LevelRecord)>, storage: &dyn FileStorage) -> Vec<Level> {
    sort_by_price(&mut levels);
    levels
        .iter()
        .map(|(id, record)| Level::from_record(*id, record, storage.url(&record.image)))
        .collect()
}

/// List levels with the ids the caller already holds
pub async fn list_levels(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<LevelsResponse>> {
    let (levels, active_ids) = db::read(&state.db, move |read_txn| {
        let levels = all_records::<LevelRecord, _>(&read_txn.open_table(tables::LEVELS)?)?;
        let active_ids = active_level_ids(
            &read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
            &read_txn.open_table(tables::USER_LEVELS)?,
            auth.id,
        )?;
        Ok((levels, active_ids))
    })
    .await?;

    Ok(Json(LevelsResponse {
        levels: level_views(levels, state.storage.as_ref()),
        active_level_ids: active_ids,
    }))
}

/// Buy a level with the available balance
///
/// The price is deducted and an active purchase recorded. On the buyer's
/// first purchase ever, the inviter (if any) is credited the referral
/// subsidy; the buyer's `first_level_subsidy_paid` flag makes that payment
/// happen at most once.
///
/// POST /api/levels/:id/purchase
pub async fn purchase_level(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(level_id): Path<u64>,
) -> Result<Json<PurchaseResponse>> {
    let subsidy_percent = state.config.invite_subsidy_percent;
    let now = state.clock.timestamp();
    let user_id = auth.id;

    let (level, balance, subsidy) = db::write(&state.db, move |write_txn| {
        let levels = write_txn.open_table(tables::LEVELS)?;
        let level: LevelRecord =
            get_record(&levels, level_id)?.ok_or(AppError::NotFound("Level"))?;

        let mut user_levels = write_txn.open_table(tables::USER_LEVELS)?;
        let mut level_index = write_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?;
        if active_level_ids(&level_index, &user_levels, user_id)?.contains(&level_id) {
            return Err(AppError::Conflict(format!(
                "You already have the level {} active.",
                level.name
            )));
        }

        let mut users = write_txn.open_table(tables::USERS)?;
        let mut buyer = require_user(&users, user_id)?;
        buyer.debit(level.deposit_value).map_err(|_| {
            AppError::Rejected("Insufficient balance. Please make a deposit.".to_string())
        })?;

        let user_level_id = next_id(write_txn, tables::SEQ_USER_LEVELS)?;
        let purchase = UserLevelRecord {
            user_id,
            level_id,
            purchased_at: now,
            is_active: true,
        };
        put_record(&mut user_levels, user_level_id, &purchase)?;
        level_index.insert(user_id, user_level_id)?;
        buyer.level_active = true;

        let mut subsidy = None;
        if let Some(inviter_id) = buyer.invited_by
            && !buyer.first_level_subsidy_paid
        {
            match get_record::<UserRecord, _>(&users, inviter_id)? {
                Some(mut inviter) => {
                    let amount = referral_subsidy(level.deposit_value, subsidy_percent);
                    inviter.credit_subsidy(amount);
                    put_record(&mut users, inviter_id, &inviter)?;
                    buyer.first_level_subsidy_paid = true;
                    subsidy = Some((inviter_id, amount));
                }
                None => tracing::warn!(
                    "Inviter {} of user {} no longer exists; no subsidy paid",
                    inviter_id,
                    user_id
                ),
            }
        }

        put_record(&mut users, user_id, &buyer)?;
        Ok((level, buyer.available_balance, subsidy))
    })
    .await?;

    tracing::info!("User {} purchased level {}", user_id, level_id);
    if let Some((inviter_id, amount)) = subsidy {
        tracing::info!(
            "Referral subsidy of {} paid to user {} for invitee {}",
            amount,
            inviter_id,
            user_id
        );
    }

    Ok(Json(PurchaseResponse {
        success: true,
        message: format!("Level {} purchased successfully.", level.name),
        level: Level::from_record(level_id, &level, state.storage.url(&level.image)),
        available_balance: balance,
    }))
}

/// Create a level (staff)
///
/// Multipart fields: name, deposit_value, daily_gain, monthly_gain,
/// cycle_days and the `image` file.
pub async fn create_level(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    multipart: Multipart,
) -> Result<Json<CreateLevelResponse>> {
    let form = UploadForm::read(multipart, "image", state.config.max_upload_bytes).await?;

    let name = form.text("name")?.to_string();
    if !Level::validate_name(&name) {
        return Err(AppError::InvalidInput(
            "Level name must be 1-50 characters".to_string(),
        ));
    }
    let deposit_value = parse_amount(form.text("deposit_value")?)?;
    let daily_gain = parse_amount(form.text("daily_gain")?)?;
    let monthly_gain = parse_amount(form.text("monthly_gain")?)?;
    let cycle_days: u32 = form
        .text("cycle_days")?
        .parse()
        .ok()
        .filter(|days| *days > 0)
        .ok_or_else(|| AppError::InvalidInput("cycle_days must be a positive integer".to_string()))?;

    let image = store_image(state.storage.as_ref(), "level_images", form.file).await?;

    let record = LevelRecord {
        name,
        deposit_value,
        daily_gain,
        monthly_gain,
        cycle_days,
        image: image.clone(),
    };

    let to_insert = record.clone();
    let created = db::write(&state.db, move |write_txn| {
        let mut names = write_txn.open_table(tables::LEVEL_NAMES)?;
        if names.get(to_insert.name.as_str())?.is_some() {
            return Err(AppError::Conflict(format!(
                "A level named {} already exists",
                to_insert.name
            )));
        }

        let level_id = next_id(write_txn, tables::SEQ_LEVELS)?;
        let mut levels = write_txn.open_table(tables::LEVELS)?;
        put_record(&mut levels, level_id, &to_insert)?;
        names.insert(to_insert.name.as_str(), level_id)?;
        Ok(level_id)
    })
    .await;

    let level_id = match created {
        Ok(id) => id,
        Err(e) => {
            state.storage.delete(&image).await?;
            return Err(e);
        }
    };

    tracing::info!("Staff user {} created level {} ({})", staff.id, level_id, record.name);

    Ok(Json(CreateLevelResponse {
        success: true,
        level: Level::from_record(level_id, &record, state.storage.url(&record.image)),
    }))
}
