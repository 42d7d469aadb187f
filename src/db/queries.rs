//! Lookups shared by several handlers. Each takes already-open tables so it
//! runs unchanged inside read and write transactions.

use chrono::{FixedOffset, NaiveDate};
use redb::{ReadableMultimapTable, ReadableTable};
use serde::de::DeserializeOwned;

use super::{get_record, index_ids, load_records};
use crate::clock::local_day;
use crate::error::{AppError, Result};
use crate::models::{LevelRecord, UserLevelRecord, UserRecord};

/// A user's active purchase together with the level it refers to
#[derive(Debug, Clone)]
pub struct ActiveLevelRow {
    pub user_level_id: u64,
    pub purchase: UserLevelRecord,
    pub level_id: u64,
    pub level: LevelRecord,
}

/// Load a user or fail with 404
pub fn require_user<T>(users: &T, user_id: u64) -> Result<UserRecord>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    get_record(users, user_id)?.ok_or(AppError::NotFound("User"))
}

/// Every record filed under `user_id` in `index`, ascending by id
pub fn owned_records<R, I, T>(index: &I, table: &T, user_id: u64) -> Result<Vec<(u64, R)>>
where
    R: DeserializeOwned,
    I: ReadableMultimapTable<u64, u64>,
    T: ReadableTable<u64, &'static [u8]>,
{
    let ids = index_ids(index, user_id)?;
    load_records(table, &ids)
}

/// Ids of the levels the user currently holds
pub fn active_level_ids<I, U>(index: &I, user_levels: &U, user_id: u64) -> Result<Vec<u64>>
where
    I: ReadableMultimapTable<u64, u64>,
    U: ReadableTable<u64, &'static [u8]>,
{
    let purchases: Vec<(u64, UserLevelRecord)> = owned_records(index, user_levels, user_id)?;
    Ok(purchases
        .into_iter()
        .filter(|(_, p)| p.is_active)
        .map(|(_, p)| p.level_id)
        .collect())
}

/// The user's first active purchase and its level
pub fn active_level<I, U, L>(
    index: &I,
    user_levels: &U,
    levels: &L,
    user_id: u64,
) -> Result<Option<ActiveLevelRow>>
where
    I: ReadableMultimapTable<u64, u64>,
    U: ReadableTable<u64, &'static [u8]>,
    L: ReadableTable<u64, &'static [u8]>,
{
    let purchases: Vec<(u64, UserLevelRecord)> = owned_records(index, user_levels, user_id)?;
    let Some((user_level_id, purchase)) = crate::models::level::first_active(&purchases).cloned()
    else {
        return Ok(None);
    };

    let Some(level) = get_record::<LevelRecord, _>(levels, purchase.level_id)? else {
        tracing::warn!(
            "User level {} points at missing level {}",
            user_level_id,
            purchase.level_id
        );
        return Ok(None);
    };

    Ok(Some(ActiveLevelRow {
        user_level_id,
        level_id: purchase.level_id,
        purchase,
        level,
    }))
}

/// Whether a Unix timestamp falls on the given local day
pub fn is_on_day(timestamp: i64, day: NaiveDate, offset: FixedOffset) -> bool {
    local_day(timestamp, offset) == day
}
