use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::constants::ERR_NO_SPINS;
use crate::db::{
    self, get_setting, next_id, put_record,
    queries::require_user,
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{PrizeTable, RouletteSettings, SpinRecord};
use crate::routes::extract::AuthUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RoulettePageResponse {
    pub roulette_spins: u32,
}

#[derive(Debug, Serialize)]
pub struct SpinResponse {
    pub success: bool,
    pub prize: Decimal,
    pub roulette_spins: u32,
    pub message: String,
}

pub async fn roulette_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<RoulettePageResponse>> {
    let user = db::read(&state.db, move |read_txn| {
        require_user(&read_txn.open_table(tables::USERS)?, auth.id)
    })
    .await?;

    Ok(Json(RoulettePageResponse {
        roulette_spins: user.roulette_spins,
    }))
}

/// Spend one spin and credit the drawn prize as a subsidy
pub async fn spin(State(state): State<AppState>, auth: AuthUser) -> Result<Json<SpinResponse>> {
    let now = state.clock.timestamp();
    let user_id = auth.id;

    let (prize, spins_left) = db::write(&state.db, move |write_txn| {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;
        if user.roulette_spins == 0 {
            return Err(AppError::Rejected(ERR_NO_SPINS.to_string()));
        }

        let settings = get_setting::<RouletteSettings, _>(
            &write_txn.open_table(tables::SETTINGS)?,
            tables::SETTINGS_ROULETTE,
        )?
        .unwrap_or_default();
        let table = PrizeTable::from_settings(settings.prizes.as_deref());
        let prize = Decimal::from(table.draw(&mut rand::thread_rng()));

        user.roulette_spins -= 1;
        user.credit_subsidy(prize);
        put_record(&mut users, user_id, &user)?;

        let spin_id = next_id(write_txn, tables::SEQ_SPINS)?;
        let mut spins = write_txn.open_table(tables::ROULETTE_SPINS)?;
        put_record(
            &mut spins,
            spin_id,
            &SpinRecord {
                user_id,
                prize,
                spun_at: now,
                is_approved: true,
            },
        )?;
        let mut index = write_txn.open_multimap_table(tables::USER_SPINS)?;
        index.insert(user_id, spin_id)?;

        Ok((prize, user.roulette_spins))
    })
    .await
    .inspect_err(|e| tracing::warn!("Spin refused for user {}: {}", user_id, e))?;

    tracing::info!("User {} won {} on the roulette", user_id, prize);

    Ok(Json(SpinResponse {
        success: true,
        prize,
        roulette_spins: spins_left,
        message: format!("Congratulations! You won {} Kz.", prize),
    }))
}
