use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{
    self,
    queries::{active_level, is_on_day, owned_records, require_user},
    tables,
};
use crate::error::Result;
use crate::models::{DepositRecord, TaskRecord, WithdrawalRecord, WithdrawalStatus};
use crate::routes::extract::AuthUser;
use crate::routes::level::ActiveLevel;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IncomeResponse {
    pub active_level: Option<ActiveLevel>,
    pub total_deposits: Decimal,
    pub today_income: Decimal,
    pub total_withdrawals: Decimal,
    /// Every task earning plus every subsidy received
    pub total_income: Decimal,
    pub available_balance: Decimal,
    pub subsidy_balance: Decimal,
}

/// Earnings summary: approved deposits, today's task income, approved
/// withdrawals and lifetime income
pub async fn income(State(state): State<AppState>, auth: AuthUser) -> Result<Json<IncomeResponse>> {
    let offset = state.config.local_offset();
    let today = state.clock.local_now(offset).date_naive();
    let user_id = auth.id;

    let (user, active, deposits, tasks, withdrawals) = db::read(&state.db, move |read_txn| {
        let user = require_user(&read_txn.open_table(tables::USERS)?, user_id)?;
        let active = active_level(
            &read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
            &read_txn.open_table(tables::USER_LEVELS)?,
            &read_txn.open_table(tables::LEVELS)?,
            user_id,
        )?;
        let deposits: Vec<(u64, DepositRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_DEPOSITS)?,
            &read_txn.open_table(tables::DEPOSITS)?,
            user_id,
        )?;
        let tasks: Vec<(u64, TaskRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_TASKS)?,
            &read_txn.open_table(tables::TASKS)?,
            user_id,
        )?;
        let withdrawals: Vec<(u64, WithdrawalRecord)> = owned_records(
            &read_txn.open_multimap_table(tables::USER_WITHDRAWALS)?,
            &read_txn.open_table(tables::WITHDRAWALS)?,
            user_id,
        )?;
        Ok((user, active, deposits, tasks, withdrawals))
    })
    .await?;

    let total_deposits: Decimal = deposits
        .iter()
        .filter(|(_, d)| d.is_approved)
        .map(|(_, d)| d.amount)
        .sum();
    let today_income: Decimal = tasks
        .iter()
        .filter(|(_, t)| is_on_day(t.completed_at, today, offset))
        .map(|(_, t)| t.earnings)
        .sum();
    let task_income: Decimal = tasks.iter().map(|(_, t)| t.earnings).sum();
    let total_withdrawals: Decimal = withdrawals
        .iter()
        .filter(|(_, w)| w.status == WithdrawalStatus::Approved)
        .map(|(_, w)| w.amount)
        .sum();

    Ok(Json(IncomeResponse {
        active_level: active
            .as_ref()
            .map(|row| ActiveLevel::from_row(row, state.storage.as_ref())),
        total_deposits,
        today_income,
        total_withdrawals,
        total_income: task_income + user.subsidy_balance,
        available_balance: user.available_balance,
        subsidy_balance: user.subsidy_balance,
    }))
}
