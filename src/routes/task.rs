use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{
    self, next_id, put_record,
    queries::{active_level, is_on_day, owned_records, require_user},
    tables,
};
use crate::error::Result;
use crate::models::task::check_task_quota;
use crate::models::TaskRecord;
use crate::routes::extract::AuthUser;
use crate::routes::level::ActiveLevel;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TaskPageResponse {
    pub has_active_level: bool,
    pub active_level: Option<ActiveLevel>,
    pub tasks_completed_today: u32,
    pub max_tasks: u32,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub success: bool,
    pub daily_gain: Decimal,
    pub available_balance: Decimal,
}

fn count_today(tasks: &[(u64, TaskRecord)], today: chrono::NaiveDate, offset: chrono::FixedOffset) -> u32 {
    tasks
        .iter()
        .filter(|(_, t)| is_on_day(t.completed_at, today, offset))
        .count() as u32
}

pub async fn task_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TaskPageResponse>> {
    let offset = state.config.local_offset();
    let today = state.clock.local_now(offset).date_naive();
    let user_id = auth.id;

    let (active, tasks) = db::read(&state.db, move |read_txn| {
        let active = active_level(
            &read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
            &read_txn.open_table(tables::USER_LEVELS)?,
            &read_txn.open_table(tables::LEVELS)?,
            user_id,
        )?;
        let tasks: Vec<(u64, TaskRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_TASKS)?,
            &read_txn.open_table(tables::TASKS)?,
            user_id,
        )?;
        Ok((active, tasks))
    })
    .await?;

    Ok(Json(TaskPageResponse {
        has_active_level: active.is_some(),
        active_level: active
            .as_ref()
            .map(|row| ActiveLevel::from_row(row, state.storage.as_ref())),
        tasks_completed_today: count_today(&tasks, today, offset),
        max_tasks: state.config.tasks_per_day,
    }))
}

/// Complete today's task and earn the active level's daily gain
pub async fn complete_task(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CompleteTaskResponse>> {
    let offset = state.config.local_offset();
    let today = state.clock.local_now(offset).date_naive();
    let now = state.clock.timestamp();
    let max_tasks = state.config.tasks_per_day;
    let user_id = auth.id;

    let (earnings, balance) = db::write(&state.db, move |write_txn| {
        let active = active_level(
            &write_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
            &write_txn.open_table(tables::USER_LEVELS)?,
            &write_txn.open_table(tables::LEVELS)?,
            user_id,
        )?;

        let mut tasks = write_txn.open_table(tables::TASKS)?;
        let mut index = write_txn.open_multimap_table(tables::USER_TASKS)?;
        let done: Vec<(u64, TaskRecord)> = owned_records(&index, &tasks, user_id)?;
        check_task_quota(active.is_some(), count_today(&done, today, offset), max_tasks)?;

        let earnings = active
            .map(|row| row.level.daily_gain)
            .unwrap_or_default();

        let task_id = next_id(write_txn, tables::SEQ_TASKS)?;
        put_record(
            &mut tasks,
            task_id,
            &TaskRecord {
                user_id,
                earnings,
                completed_at: now,
            },
        )?;
        index.insert(user_id, task_id)?;

        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;
        user.credit(earnings);
        put_record(&mut users, user_id, &user)?;

        Ok((earnings, user.available_balance))
    })
    .await
    .inspect_err(|e| tracing::warn!("Task refused for user {}: {}", user_id, e))?;

    tracing::info!("User {} completed a task and earned {}", user_id, earnings);

    Ok(Json(CompleteTaskResponse {
        success: true,
        daily_gain: earnings,
        available_balance: balance,
    }))
}
