use axum::{
    extract::{Path, Query, State},
    Json,
};
use redb::ReadableTableMetadata;
use serde::{Deserialize, Serialize};

use crate::db::{
    self, all_records, encode, get_record, next_id, put_record,
    queries::require_user,
    tables,
};
use crate::error::{AppError, Result};
use crate::models::{
    BankDetailsRecord, Deposit, DepositRecord, PlatformSettings, PrizeTable, RouletteSettings,
    Withdrawal, WithdrawalRecord, WithdrawalStatus,
};
use crate::routes::extract::StaffUser;
use crate::routes::validation::non_blank;
use crate::AppState;

/// Query parameters for staff listings
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only records still waiting for a decision
    #[serde(default)]
    pub pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct GrantSpinsRequest {
    pub spins: u32,
}

#[derive(Debug, Deserialize)]
pub struct RouletteSettingsRequest {
    pub prizes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BankAccountRequest {
    pub bank_name: String,
    pub iban: String,
    pub account_holder_name: String,
}

#[derive(Debug, Serialize)]
pub struct DepositDecisionResponse {
    pub success: bool,
    /// False when the deposit had already been approved
    pub credited: bool,
    pub deposit: Deposit,
}

/// Staff view of a withdrawal with its owner
#[derive(Debug, Serialize)]
pub struct AdminWithdrawal {
    pub user_id: u64,
    #[serde(flatten)]
    pub withdrawal: Withdrawal,
}

#[derive(Debug, Serialize)]
pub struct GrantSpinsResponse {
    pub success: bool,
    pub user_id: u64,
    pub roulette_spins: u32,
}

#[derive(Debug, Serialize)]
pub struct RouletteSettingsResponse {
    pub success: bool,
    pub prizes: Option<String>,
    /// Prizes with their draw weight as the parsed table sees them
    pub weights: Vec<(i64, usize)>,
}

#[derive(Debug, Serialize)]
pub struct BankAccountResponse {
    pub success: bool,
    pub id: u64,
    pub bank_account: BankDetailsRecord,
}

/// Database statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub user_count: u64,
    pub level_count: u64,
    pub pending_deposits: usize,
    pub pending_withdrawals: usize,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Deposits, newest first
///
/// GET /api/admin/deposits?pending=true
pub async fn list_deposits(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Deposit>>> {
    let deposits = db::read(&state.db, |read_txn| {
        all_records::<DepositRecord, _>(&read_txn.open_table(tables::DEPOSITS)?)
    })
    .await?;

    Ok(Json(
        deposits
            .iter()
            .rev()
            .filter(|(_, d)| !params.pending || !d.is_approved)
            .map(|(id, d)| Deposit::from_record(*id, d, state.storage.url(&d.proof_of_payment)))
            .collect(),
    ))
}

/// Approve a deposit and credit it to the depositor
///
/// Approving twice credits once.
pub async fn approve_deposit(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(deposit_id): Path<u64>,
) -> Result<Json<DepositDecisionResponse>> {
    let (record, credited) = db::write(&state.db, move |write_txn| {
        let mut deposits = write_txn.open_table(tables::DEPOSITS)?;
        let mut deposit: DepositRecord =
            get_record(&deposits, deposit_id)?.ok_or(AppError::NotFound("Deposit"))?;

        let credited = deposit.approve();
        if credited {
            let mut users = write_txn.open_table(tables::USERS)?;
            let mut user = require_user(&users, deposit.user_id)?;
            user.credit(deposit.amount);
            put_record(&mut users, deposit.user_id, &user)?;
            put_record(&mut deposits, deposit_id, &deposit)?;
        }

        Ok((deposit, credited))
    })
    .await?;

    if credited {
        tracing::info!(
            "Deposit {} approved by staff user {}: {} credited to user {}",
            deposit_id,
            staff.id,
            record.amount,
            record.user_id
        );
    } else {
        tracing::info!("Deposit {} was already approved", deposit_id);
    }

    Ok(Json(DepositDecisionResponse {
        success: true,
        credited,
        deposit: Deposit::from_record(
            deposit_id,
            &record,
            state.storage.url(&record.proof_of_payment),
        ),
    }))
}

/// Withdrawals, newest first
///
/// GET /api/admin/withdrawals?pending=true
pub async fn list_withdrawals(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<AdminWithdrawal>>> {
    let withdrawals = db::read(&state.db, |read_txn| {
        all_records::<WithdrawalRecord, _>(&read_txn.open_table(tables::WITHDRAWALS)?)
    })
    .await?;

    Ok(Json(
        withdrawals
            .iter()
            .rev()
            .filter(|(_, w)| !params.pending || w.status == WithdrawalStatus::Pending)
            .map(|(id, w)| AdminWithdrawal {
                user_id: w.user_id,
                withdrawal: Withdrawal::from_record(*id, w),
            })
            .collect(),
    ))
}

async fn settle_withdrawal(
    state: &AppState,
    staff_id: u64,
    withdrawal_id: u64,
    status: WithdrawalStatus,
) -> Result<Json<AdminWithdrawal>> {
    let record = db::write(&state.db, move |write_txn| {
        let mut withdrawals = write_txn.open_table(tables::WITHDRAWALS)?;
        let mut withdrawal: WithdrawalRecord =
            get_record(&withdrawals, withdrawal_id)?.ok_or(AppError::NotFound("Withdrawal"))?;
        withdrawal.settle(status)?;

        // The amount left the balance at request time
        if status == WithdrawalStatus::Rejected {
            let mut users = write_txn.open_table(tables::USERS)?;
            let mut user = require_user(&users, withdrawal.user_id)?;
            user.credit(withdrawal.amount);
            put_record(&mut users, withdrawal.user_id, &user)?;
        }

        put_record(&mut withdrawals, withdrawal_id, &withdrawal)?;
        Ok(withdrawal)
    })
    .await?;

    tracing::info!(
        "Withdrawal {} of user {} marked {:?} by staff user {}",
        withdrawal_id,
        record.user_id,
        status,
        staff_id
    );

    Ok(Json(AdminWithdrawal {
        user_id: record.user_id,
        withdrawal: Withdrawal::from_record(withdrawal_id, &record),
    }))
}

pub async fn approve_withdrawal(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(withdrawal_id): Path<u64>,
) -> Result<Json<AdminWithdrawal>> {
    settle_withdrawal(&state, staff.id, withdrawal_id, WithdrawalStatus::Approved).await
}

/// Reject a withdrawal and refund its amount
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(withdrawal_id): Path<u64>,
) -> Result<Json<AdminWithdrawal>> {
    settle_withdrawal(&state, staff.id, withdrawal_id, WithdrawalStatus::Rejected).await
}

/// Give a user extra roulette spins
pub async fn grant_spins(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(user_id): Path<u64>,
    Json(payload): Json<GrantSpinsRequest>,
) -> Result<Json<GrantSpinsResponse>> {
    if payload.spins == 0 {
        return Err(AppError::InvalidInput(
            "spins must be greater than zero".to_string(),
        ));
    }

    let spins = payload.spins;
    let total = db::write(&state.db, move |write_txn| {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut user = require_user(&users, user_id)?;
        user.roulette_spins = user.roulette_spins.saturating_add(spins);
        put_record(&mut users, user_id, &user)?;
        Ok(user.roulette_spins)
    })
    .await?;

    tracing::info!(
        "Staff user {} granted {} spin(s) to user {}",
        staff.id,
        spins,
        user_id
    );

    Ok(Json(GrantSpinsResponse {
        success: true,
        user_id,
        roulette_spins: total,
    }))
}

/// Replace the platform texts and support links
pub async fn update_settings(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(payload): Json<PlatformSettings>,
) -> Result<Json<PlatformSettings>> {
    let settings = PlatformSettings {
        whatsapp_link: non_blank(payload.whatsapp_link),
        telegram_link: non_blank(payload.telegram_link),
        history_text: non_blank(payload.history_text),
        deposit_instruction: non_blank(payload.deposit_instruction),
        withdrawal_instruction: non_blank(payload.withdrawal_instruction),
    };

    let to_store = settings.clone();
    db::write(&state.db, move |write_txn| {
        let mut table = write_txn.open_table(tables::SETTINGS)?;
        let bytes = encode(&to_store)?;
        table.insert(tables::SETTINGS_PLATFORM, bytes.as_slice())?;
        Ok(())
    })
    .await?;

    tracing::info!("Platform settings updated by staff user {}", staff.id);
    Ok(Json(settings))
}

/// Replace the roulette prize list
pub async fn update_roulette_settings(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(payload): Json<RouletteSettingsRequest>,
) -> Result<Json<RouletteSettingsResponse>> {
    let settings = RouletteSettings {
        prizes: non_blank(payload.prizes),
    };

    let to_store = settings.clone();
    db::write(&state.db, move |write_txn| {
        let mut table = write_txn.open_table(tables::SETTINGS)?;
        let bytes = encode(&to_store)?;
        table.insert(tables::SETTINGS_ROULETTE, bytes.as_slice())?;
        Ok(())
    })
    .await?;

    let table = PrizeTable::from_settings(settings.prizes.as_deref());
    let mut weights: Vec<(i64, usize)> = table
        .prizes()
        .into_iter()
        .map(|prize| (prize, table.weight_of(prize)))
        .collect();
    weights.sort();

    tracing::info!(
        "Roulette prizes set to {:?} by staff user {}",
        settings.prizes,
        staff.id
    );

    Ok(Json(RouletteSettingsResponse {
        success: true,
        prizes: settings.prizes,
        weights,
    }))
}

/// Add a receiving account shown on the deposit page
pub async fn add_bank_account(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(payload): Json<BankAccountRequest>,
) -> Result<Json<BankAccountResponse>> {
    let account = BankDetailsRecord::normalized(
        &payload.bank_name,
        &payload.iban,
        &payload.account_holder_name,
    )
    .map_err(AppError::InvalidInput)?;

    let to_store = account.clone();
    let id = db::write(&state.db, move |write_txn| {
        let id = next_id(write_txn, tables::SEQ_BANK_ACCOUNTS)?;
        let mut table = write_txn.open_table(tables::PLATFORM_BANK_ACCOUNTS)?;
        put_record(&mut table, id, &to_store)?;
        Ok(id)
    })
    .await?;

    tracing::info!("Staff user {} added platform bank account {}", staff.id, id);

    Ok(Json(BankAccountResponse {
        success: true,
        id,
        bank_account: account,
    }))
}

/// Admin stats endpoint
///
/// Returns record counts and the database file size for monitoring.
///
/// GET /api/admin/stats
pub async fn admin_stats(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
) -> Result<Json<AdminStatsResponse>> {
    // Get database file size
    let db_path = state.config.database_path.clone();
    let database_size_bytes = tokio::fs::metadata(&db_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    let (user_count, level_count, pending_deposits, pending_withdrawals) =
        db::read(&state.db, |read_txn| {
            let user_count = read_txn.open_table(tables::USERS)?.len()?;
            let level_count = read_txn.open_table(tables::LEVELS)?.len()?;

            let pending_deposits =
                all_records::<DepositRecord, _>(&read_txn.open_table(tables::DEPOSITS)?)?
                    .iter()
                    .filter(|(_, d)| !d.is_approved)
                    .count();
            let pending_withdrawals =
                all_records::<WithdrawalRecord, _>(&read_txn.open_table(tables::WITHDRAWALS)?)?
                    .iter()
                    .filter(|(_, w)| w.status == WithdrawalStatus::Pending)
                    .count();

            Ok((user_count, level_count, pending_deposits, pending_withdrawals))
        })
        .await?;

    tracing::info!(
        "Admin stats requested by staff user {}: {} users, {} database",
        staff.id,
        user_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        user_count,
        level_count,
        pending_deposits,
        pending_withdrawals,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
    }))
}
