use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_NO_ACTIVE_LEVEL, ERR_TASKS_DONE};
use crate::error::{AppError, Result};

/// A completed daily task and what it paid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub user_id: u64,
    pub earnings: Decimal,
    /// Unix timestamp
    pub completed_at: i64,
}

/// Decide whether one more task may be completed today
pub fn check_task_quota(has_active_level: bool, completed_today: u32, max_per_day: u32) -> Result<()> {
    if !has_active_level {
        return Err(AppError::Rejected(ERR_NO_ACTIVE_LEVEL.to_string()));
    }
    if completed_today >= max_per_day {
        return Err(AppError::Rejected(ERR_TASKS_DONE.to_string()));
    }
    Ok(())
}
