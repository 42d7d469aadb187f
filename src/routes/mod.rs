pub mod admin;
pub mod auth;
pub mod deposit;
pub mod extract;
pub mod health;
pub mod income;
pub mod level;
pub mod menu;
pub mod profile;
pub mod reward;
pub mod roulette;
pub mod task;
pub mod team;
pub mod upload;
pub mod validation;
pub mod withdrawal;

pub use admin::{
    add_bank_account, admin_stats, approve_deposit, approve_withdrawal, grant_spins,
    list_deposits, list_withdrawals, reject_withdrawal, update_roulette_settings,
    update_settings,
};
pub use auth::{ensure_staff_user, login, logout, register_info, register_user};
pub use deposit::{deposit_page, submit_deposit};
pub use extract::{AuthUser, StaffUser};
pub use health::health_check;
pub use income::income;
pub use level::{create_level, list_levels, purchase_level};
pub use menu::{about, menu};
pub use profile::{change_password, profile, update_bank_details};
pub use reward::{claim_reward, create_reward_code, deactivate_reward_code, rewards_page};
pub use roulette::{roulette_page, spin};
pub use task::{complete_task, task_page};
pub use team::team;
pub use validation::timestamp_to_rfc3339;
pub use withdrawal::{request_withdrawal, withdrawal_page};
