use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::{self, all_records, get_setting, queries::active_level, tables};
use crate::error::Result;
use crate::models::{Level, LevelRecord, PlatformSettings, SupportLinks};
use crate::routes::extract::AuthUser;
use crate::routes::level::{level_views, ActiveLevel};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub levels: Vec<Level>,
    pub user_level: Option<ActiveLevel>,
    #[serde(flatten)]
    pub support: SupportLinks,
}

#[derive(Debug, Serialize)]
pub struct AboutResponse {
    pub history_text: String,
}

/// Landing page: the level catalogue, the caller's active level (when
/// signed in) and the support links
pub async fn menu(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
) -> Result<Json<MenuResponse>> {
    let user_id = auth.map(|a| a.id);

    let (levels, active, settings) = db::read(&state.db, move |read_txn| {
        let levels_table = read_txn.open_table(tables::LEVELS)?;
        let levels = all_records::<LevelRecord, _>(&levels_table)?;

        let active = match user_id {
            Some(id) => active_level(
                &read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?,
                &read_txn.open_table(tables::USER_LEVELS)?,
                &levels_table,
                id,
            )?,
            None => None,
        };

        let settings = get_setting::<PlatformSettings, _>(
            &read_txn.open_table(tables::SETTINGS)?,
            tables::SETTINGS_PLATFORM,
        )?
        .unwrap_or_default();

        Ok((levels, active, settings))
    })
    .await?;

    let storage = state.storage.as_ref();
    Ok(Json(MenuResponse {
        levels: level_views(levels, storage),
        user_level: active.as_ref().map(|row| ActiveLevel::from_row(row, storage)),
        support: SupportLinks::from(&settings),
    }))
}

/// Platform history text
pub async fn about(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<AboutResponse>> {
    let settings = db::read(&state.db, |read_txn| {
        let table = read_txn.open_table(tables::SETTINGS)?;
        get_setting::<PlatformSettings, _>(&table, tables::SETTINGS_PLATFORM)
    })
    .await?
    .unwrap_or_default();

    Ok(Json(AboutResponse {
        history_text: settings.history_text(),
    }))
}
