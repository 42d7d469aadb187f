//! Tier Rewards Server Library
//!
//! Accounts with invite codes, deposits approved by staff, purchasable
//! earning levels, withdrawals, daily tasks, the roulette and daily reward
//! codes, served as a JSON API over an embedded redb database.

pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod security;
pub mod storage;

pub use clock::Clock;
pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use routes::*;
use storage::{FileStorage, LocalFileStorage};

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub storage: Arc<dyn FileStorage>,
    pub clock: Clock,
}

impl AppState {
    /// Create a new AppState storing uploads under the configured media root
    pub fn new(db: Db, config: Config) -> Self {
        let storage = LocalFileStorage::new(
            config.media_root.clone(),
            format!("{}/media", config.public_base_url),
        );
        Self {
            db,
            config,
            storage: Arc::new(storage),
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storage = storage;
        self
    }
}

/// Build the application router
///
/// CORS is left to the caller so tests can drive the router directly.
pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_root);
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_check))
        // Accounts
        .route("/api/register", get(register_info).post(register_user))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        // Pages
        .route("/api/menu", get(menu))
        .route("/api/about", get(about))
        .route("/api/deposit", get(deposit_page).post(submit_deposit))
        .route("/api/withdrawal", get(withdrawal_page).post(request_withdrawal))
        .route("/api/levels", get(list_levels))
        .route("/api/levels/:id/purchase", post(purchase_level))
        .route("/api/tasks", get(task_page))
        .route("/api/tasks/complete", post(complete_task))
        .route("/api/team", get(team))
        .route("/api/roulette", get(roulette_page))
        .route("/api/roulette/spin", post(spin))
        .route("/api/rewards", get(rewards_page))
        .route("/api/rewards/claim", post(claim_reward))
        .route("/api/profile", get(profile))
        .route("/api/profile/bank-details", put(update_bank_details))
        .route("/api/profile/password", post(change_password))
        .route("/api/income", get(income))
        // Staff
        .route("/api/admin/stats", get(admin_stats))
        .route("/api/admin/deposits", get(list_deposits))
        .route("/api/admin/deposits/:id/approve", post(approve_deposit))
        .route("/api/admin/withdrawals", get(list_withdrawals))
        .route("/api/admin/withdrawals/:id/approve", post(approve_withdrawal))
        .route("/api/admin/withdrawals/:id/reject", post(reject_withdrawal))
        .route("/api/admin/levels", post(create_level))
        .route("/api/admin/reward-codes", post(create_reward_code))
        .route(
            "/api/admin/reward-codes/:id/deactivate",
            post(deactivate_reward_code),
        )
        .route("/api/admin/users/:id/spins", post(grant_spins))
        .route("/api/admin/settings", put(update_settings))
        .route("/api/admin/roulette-settings", put(update_roulette_settings))
        .route("/api/admin/bank-accounts", post(add_bank_account))
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
