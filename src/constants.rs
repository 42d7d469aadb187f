/// Credit given to every new account on registration (Kz)
pub const DEFAULT_WELCOME_BONUS: i64 = 750;

/// Smallest amount a user may withdraw in one request (Kz)
pub const DEFAULT_MIN_WITHDRAWAL: i64 = 3000;

/// Withdrawals are accepted from this local hour...
pub const DEFAULT_WITHDRAWAL_OPEN_HOUR: u32 = 9;

/// ...up to and including this local hour, on the dot
pub const DEFAULT_WITHDRAWAL_CLOSE_HOUR: u32 = 17;

/// Share of the invitee's first level price paid to the inviter
pub const DEFAULT_INVITE_SUBSIDY_PERCENT: i64 = 15;

/// Daily tasks a user with an active level may complete
pub const DEFAULT_TASKS_PER_DAY: u32 = 1;

/// Africa/Luanda (WAT, no daylight saving)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 60;

/// Session lifetime (14 days)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 1_209_600;

/// Maximum upload size in bytes (5MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5_242_880;

/// Prizes used when the roulette has no usable configuration
pub const DEFAULT_ROULETTE_PRIZES: [i64; 6] = [100, 200, 300, 500, 1000, 2000];

/// Prizes up to this value are three times as likely to be drawn
pub const ROULETTE_HEAVY_WEIGHT_CEILING: i64 = 1000;

pub const ROULETTE_HEAVY_WEIGHT: usize = 3;

/// Number of past reward claims shown on the rewards page
pub const REWARD_HISTORY_LIMIT: usize = 10;

pub const INVITE_CODE_LEN: usize = 8;

pub const MAX_PHONE_LEN: usize = 20;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MAX_LEVEL_NAME_LEN: usize = 50;

pub const MAX_REWARD_CODE_LEN: usize = 20;

/// Link shown when no support group is configured
pub const FALLBACK_SUPPORT_LINK: &str = "#";

// =============================================================================
// Messages
// =============================================================================

pub const MSG_DEPOSIT_INSTRUCTION_MISSING: &str = "Deposit instructions are not available.";

pub const MSG_WITHDRAWAL_INSTRUCTION_MISSING: &str = "Withdrawal instructions are not available.";

pub const MSG_HISTORY_MISSING: &str = "Platform history is not available.";

pub const MSG_NOT_INVESTED: &str = "Not invested";

pub const ERR_INVALID_INVITE_CODE: &str = "Invalid invite code.";

pub const ERR_INSUFFICIENT_BALANCE: &str = "Insufficient balance.";

pub const ERR_BANK_DETAILS_REQUIRED: &str =
    "Please add your bank details to your profile before requesting a withdrawal.";

pub const ERR_ONE_WITHDRAWAL_PER_DAY: &str = "You can only make 1 withdrawal per day.";

pub const ERR_NO_ACTIVE_LEVEL: &str = "You do not have an active level to perform tasks.";

pub const ERR_TASKS_DONE: &str = "You have already completed all daily tasks.";

pub const ERR_NO_SPINS: &str = "You have no roulette spins available.";

pub const ERR_ALREADY_CLAIMED: &str = "You have already claimed your daily reward today.";

pub const ERR_INVALID_REWARD_CODE: &str =
    "Invalid, expired or inactive reward code. Check today's code.";
