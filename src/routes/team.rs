use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::constants::MSG_NOT_INVESTED;
use crate::db::{
    self, index_ids, load_records,
    queries::{active_level, require_user},
    tables,
};
use crate::error::Result;
use crate::models::UserRecord;
use crate::routes::extract::AuthUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TeamMember {
    pub phone_number: String,
    pub date_joined: String,
    pub investment_level: String,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team_members: Vec<TeamMember>,
    pub team_count: usize,
    pub subsidy_balance: Decimal,
    pub invite_code: String,
    pub invite_link: String,
}

/// Users the caller invited directly, newest first
pub async fn team(State(state): State<AppState>, auth: AuthUser) -> Result<Json<TeamResponse>> {
    let user_id = auth.id;

    let (user, mut members) = db::read(&state.db, move |read_txn| {
        let users = read_txn.open_table(tables::USERS)?;
        let user = require_user(&users, user_id)?;

        let invitee_ids = index_ids(&read_txn.open_multimap_table(tables::USER_INVITEES)?, user_id)?;
        let invitees: Vec<(u64, UserRecord)> = load_records(&users, &invitee_ids)?;

        let level_index = read_txn.open_multimap_table(tables::USER_LEVEL_INDEX)?;
        let user_levels = read_txn.open_table(tables::USER_LEVELS)?;
        let levels = read_txn.open_table(tables::LEVELS)?;

        let mut members = Vec::with_capacity(invitees.len());
        for (invitee_id, invitee) in invitees {
            let level_name = active_level(&level_index, &user_levels, &levels, invitee_id)?
                .map(|row| row.level.name);
            members.push((invitee_id, invitee, level_name));
        }

        Ok((user, members))
    })
    .await?;

    members.sort_by(|(a_id, a, _), (b_id, b, _)| {
        b.date_joined.cmp(&a.date_joined).then_with(|| b_id.cmp(a_id))
    });

    let team_members: Vec<TeamMember> = members
        .into_iter()
        .map(|(_, member, level_name)| TeamMember {
            phone_number: member.phone_number,
            date_joined: crate::routes::timestamp_to_rfc3339(member.date_joined),
            investment_level: level_name.unwrap_or_else(|| MSG_NOT_INVESTED.to_string()),
        })
        .collect();

    Ok(Json(TeamResponse {
        team_count: team_members.len(),
        team_members,
        subsidy_balance: user.subsidy_balance,
        invite_link: format!(
            "{}/register?invite={}",
            state.config.public_base_url, user.invite_code
        ),
        invite_code: user.invite_code,
    }))
}
