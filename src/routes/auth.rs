use axum::{
    extract::{Query, State},
    Json,
};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::constants::ERR_INVALID_INVITE_CODE;
use crate::db::{self, decode, encode, get_record, get_setting, next_id, put_record, tables, Db};
use crate::error::{AppError, Result};
use crate::models::{PlatformSettings, SessionRecord, SupportLinks, User, UserRecord};
use crate::routes::extract::AuthUser;
use crate::routes::validation::non_blank;
use crate::security::{
    generate_invite_code, generate_session_token, hash_password, session_digest, verify_password,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone_number: String,
    pub password: String,
    pub full_name: Option<String>,
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInfoQuery {
    pub invite: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterInfoResponse {
    pub invite_code: Option<String>,
    #[serde(flatten)]
    pub support: SupportLinks,
}

/// Returned by both register and login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Fields of an account about to be created
pub struct NewAccount {
    pub phone_number: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub invited_by: Option<u64>,
    pub opening_balance: rust_decimal::Decimal,
    pub is_staff: bool,
}

/// Insert a user with a fresh invite code and all its index entries
pub fn create_user(
    write_txn: &WriteTransaction,
    account: NewAccount,
    now: i64,
) -> Result<(u64, UserRecord)> {
    let mut phones = write_txn.open_table(tables::USER_PHONES)?;
    if phones.get(account.phone_number.as_str())?.is_some() {
        return Err(AppError::UserAlreadyExists);
    }

    // Retry until the random code is free
    let mut invite_codes = write_txn.open_table(tables::USER_INVITE_CODES)?;
    let invite_code = loop {
        let candidate = generate_invite_code();
        if invite_codes.get(candidate.as_str())?.is_none() {
            break candidate;
        }
    };

    let user_id = next_id(write_txn, tables::SEQ_USERS)?;
    let mut record = UserRecord::new(
        account.phone_number,
        account.full_name,
        account.password_hash,
        invite_code,
        account.invited_by,
        now,
    );
    record.is_staff = account.is_staff;
    record.credit(account.opening_balance);

    let mut users = write_txn.open_table(tables::USERS)?;
    put_record(&mut users, user_id, &record)?;
    phones.insert(record.phone_number.as_str(), user_id)?;
    invite_codes.insert(record.invite_code.as_str(), user_id)?;

    if let Some(inviter_id) = record.invited_by {
        let mut invitees = write_txn.open_multimap_table(tables::USER_INVITEES)?;
        invitees.insert(inviter_id, user_id)?;
    }

    Ok((user_id, record))
}

/// Store a new session for `user_id` and return its bearer token
fn open_session(
    write_txn: &WriteTransaction,
    session_key: &str,
    user_id: u64,
    now: i64,
    ttl_secs: i64,
) -> Result<()> {
    let mut sessions = write_txn.open_table(tables::SESSIONS)?;

    // Sweep expired sessions while the table is open for writing
    sessions.retain(|_, bytes| {
        decode::<SessionRecord>(bytes)
            .map(|s| !s.is_expired(now))
            .unwrap_or(false)
    })?;

    let record = SessionRecord::new(user_id, now, ttl_secs);
    let bytes = encode(&record)?;
    sessions.insert(session_key, bytes.as_slice())?;
    Ok(())
}

/// Registration page data: support links and the invite code from the link
///
/// GET /api/register?invite=<code>
pub async fn register_info(
    State(state): State<AppState>,
    Query(query): Query<RegisterInfoQuery>,
) -> Result<Json<RegisterInfoResponse>> {
    let settings = db::read(&state.db, |read_txn| {
        let table = read_txn.open_table(tables::SETTINGS)?;
        get_setting::<PlatformSettings, _>(&table, tables::SETTINGS_PLATFORM)
    })
    .await?
    .unwrap_or_default();

    Ok(Json(RegisterInfoResponse {
        invite_code: non_blank(query.invite),
        support: SupportLinks::from(&settings),
    }))
}

/// Register a new user
///
/// Validates the phone number and password, resolves the optional invite
/// code to the inviting user, and credits the welcome bonus. An invite code
/// that matches nobody aborts the registration. The new user is signed in
/// straight away.
///
/// Returns 409 Conflict if the phone number is already registered.
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    let phone_number = payload.phone_number.trim().to_string();
    if !User::validate_phone(&phone_number) {
        tracing::warn!("Invalid phone number format: {}", phone_number);
        return Err(AppError::InvalidInput(
            "Phone number must contain only digits and an optional leading '+'".to_string(),
        ));
    }
    User::validate_password(&payload.password, &phone_number).map_err(AppError::InvalidInput)?;

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let token = generate_session_token();
    let session_key = session_digest(&token, &state.config.session_secret)?;
    let invite_code = non_blank(payload.invite_code);
    let full_name = non_blank(payload.full_name);
    let welcome_bonus = state.config.welcome_bonus;
    let ttl = state.config.session_ttl_secs;
    let now = state.clock.timestamp();

    let (user_id, record) = db::write(&state.db, move |write_txn| {
        let invited_by = match invite_code {
            Some(code) => {
                let codes = write_txn.open_table(tables::USER_INVITE_CODES)?;
                let inviter = codes.get(code.as_str())?.map(|id| id.value());
                match inviter {
                    Some(id) => Some(id),
                    None => {
                        tracing::warn!("Registration with unknown invite code: {}", code);
                        return Err(AppError::Rejected(ERR_INVALID_INVITE_CODE.to_string()));
                    }
                }
            }
            None => None,
        };

        let account = NewAccount {
            phone_number,
            full_name,
            password_hash,
            invited_by,
            opening_balance: welcome_bonus,
            is_staff: false,
        };
        let (user_id, record) = create_user(write_txn, account, now)?;
        open_session(write_txn, &session_key, user_id, now, ttl)?;
        Ok((user_id, record))
    })
    .await?;

    tracing::info!(
        "New user {} registered (invited by {:?})",
        user_id,
        record.invited_by
    );

    Ok(Json(SessionResponse {
        success: true,
        token,
        user: User::from_record(user_id, &record),
        message: format!(
            "Account created. You received a welcome bonus of {} Kz.",
            welcome_bonus
        ),
    }))
}

/// Sign in with phone number and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let phone_number = payload.phone_number.trim().to_string();

    let found = db::read(&state.db, move |read_txn| {
        let phones = read_txn.open_table(tables::USER_PHONES)?;
        let Some(user_id) = phones.get(phone_number.as_str())?.map(|id| id.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(tables::USERS)?;
        Ok(get_record::<UserRecord, _>(&users, user_id)?.map(|record| (user_id, record)))
    })
    .await?;

    let Some((user_id, record)) = found else {
        tracing::warn!("Login attempt for unknown phone number");
        return Err(AppError::InvalidCredentials);
    };

    let password = payload.password;
    let stored_hash = record.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await?;
    if !matches || !record.is_active {
        tracing::warn!("Failed login for user {}", user_id);
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_session_token();
    let session_key = session_digest(&token, &state.config.session_secret)?;
    let ttl = state.config.session_ttl_secs;
    let now = state.clock.timestamp();

    db::write(&state.db, move |write_txn| {
        open_session(write_txn, &session_key, user_id, now, ttl)
    })
    .await?;

    tracing::info!("User {} signed in", user_id);

    Ok(Json(SessionResponse {
        success: true,
        token,
        user: User::from_record(user_id, &record),
        message: "Signed in successfully.".to_string(),
    }))
}

/// End the current session
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<Json<LogoutResponse>> {
    let session_key = auth.session_key;
    db::write(&state.db, move |write_txn| {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        sessions.remove(session_key.as_str())?;
        Ok(())
    })
    .await?;

    tracing::info!("User {} signed out", auth.id);
    Ok(Json(LogoutResponse { success: true }))
}

/// Create the configured staff account on startup if the phone is free
///
/// Returns the id of the created account, or `None` when the phone number
/// is already registered.
pub async fn ensure_staff_user(db: &Db, phone_number: &str, password: &str, now: i64) -> Result<Option<u64>> {
    let phone_number = phone_number.trim().to_string();
    if !User::validate_phone(&phone_number) {
        return Err(AppError::InvalidInput(format!(
            "Invalid ADMIN_PHONE: {}",
            phone_number
        )));
    }

    let password = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    db::write(db, move |write_txn| {
        let account = NewAccount {
            phone_number,
            full_name: None,
            password_hash,
            invited_by: None,
            opening_balance: rust_decimal::Decimal::ZERO,
            is_staff: true,
        };
        match create_user(write_txn, account, now) {
            Ok((user_id, _)) => Ok(Some(user_id)),
            Err(AppError::UserAlreadyExists) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await
}
