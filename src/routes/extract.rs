use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::{self, decode, get_record, tables};
use crate::error::{AppError, Result};
use crate::models::{SessionRecord, UserRecord};
use crate::security::{parse_bearer, session_digest};
use crate::AppState;

/// The signed-in user behind a request's bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: u64,
    pub is_staff: bool,
    /// Digest the session is stored under
    pub session_key: String,
}

/// A signed-in user with staff rights
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .ok_or(AppError::Unauthorized)?;

        let session_key = session_digest(token, &state.config.session_secret)?;
        let now = state.clock.timestamp();

        let key = session_key.clone();
        let (id, is_staff) = db::read(&state.db, move |read_txn| {
            let sessions = read_txn.open_table(tables::SESSIONS)?;
            let session: SessionRecord = match sessions.get(key.as_str())? {
                Some(bytes) => decode(bytes.value())?,
                None => return Err(AppError::Unauthorized),
            };
            if session.is_expired(now) {
                tracing::debug!("Expired session for user {}", session.user_id);
                return Err(AppError::Unauthorized);
            }

            let users = read_txn.open_table(tables::USERS)?;
            let user: UserRecord =
                get_record(&users, session.user_id)?.ok_or(AppError::Unauthorized)?;
            if !user.is_active {
                return Err(AppError::Unauthorized);
            }

            Ok((session.user_id, user.is_staff))
        })
        .await?;

        Ok(AuthUser {
            id,
            is_staff,
            session_key,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::warn!("User {} tried a staff-only action", user.id);
            return Err(AppError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}
