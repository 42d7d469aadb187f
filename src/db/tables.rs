use redb::{MultimapTableDefinition, TableDefinition};

/// Auto-increment counters: table name -> last issued id
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub const SEQ_USERS: &str = "users";
pub const SEQ_LEVELS: &str = "levels";
pub const SEQ_USER_LEVELS: &str = "user_levels";
pub const SEQ_DEPOSITS: &str = "deposits";
pub const SEQ_WITHDRAWALS: &str = "withdrawals";
pub const SEQ_TASKS: &str = "tasks";
pub const SEQ_SPINS: &str = "roulette_spins";
pub const SEQ_REWARD_CODES: &str = "reward_codes";
pub const SEQ_BANK_ACCOUNTS: &str = "platform_bank_accounts";

/// Users table: user id -> UserRecord (serialized)
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Unique index: phone number -> user id
pub const USER_PHONES: TableDefinition<&str, u64> = TableDefinition::new("user_phones");

/// Unique index: invite code -> user id
pub const USER_INVITE_CODES: TableDefinition<&str, u64> =
    TableDefinition::new("user_invite_codes");

/// Inviter id -> ids of the users they invited
pub const USER_INVITEES: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_invitees");

/// Sessions table: token digest -> SessionRecord (serialized)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Levels table: level id -> LevelRecord (serialized)
pub const LEVELS: TableDefinition<u64, &[u8]> = TableDefinition::new("levels");

/// Unique index: level name -> level id
pub const LEVEL_NAMES: TableDefinition<&str, u64> = TableDefinition::new("level_names");

/// Purchased levels: user level id -> UserLevelRecord (serialized)
pub const USER_LEVELS: TableDefinition<u64, &[u8]> = TableDefinition::new("user_levels");

/// User id -> user level ids
pub const USER_LEVEL_INDEX: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_level_index");

/// Deposits table: deposit id -> DepositRecord (serialized)
pub const DEPOSITS: TableDefinition<u64, &[u8]> = TableDefinition::new("deposits");

/// User id -> deposit ids
pub const USER_DEPOSITS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_deposits");

/// Withdrawals table: withdrawal id -> WithdrawalRecord (serialized)
pub const WITHDRAWALS: TableDefinition<u64, &[u8]> = TableDefinition::new("withdrawals");

/// User id -> withdrawal ids
pub const USER_WITHDRAWALS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_withdrawals");

/// Completed tasks: task id -> TaskRecord (serialized)
pub const TASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tasks");

/// User id -> task ids
pub const USER_TASKS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_tasks");

/// Roulette spin log: spin id -> SpinRecord (serialized)
pub const ROULETTE_SPINS: TableDefinition<u64, &[u8]> = TableDefinition::new("roulette_spins");

/// User id -> spin ids
pub const USER_SPINS: MultimapTableDefinition<u64, u64> =
    MultimapTableDefinition::new("user_spins");

/// Daily reward codes: code id -> DailyRewardCodeRecord (serialized)
pub const REWARD_CODES: TableDefinition<u64, &[u8]> = TableDefinition::new("reward_codes");

/// Unique index: reward code text -> code id
pub const REWARD_CODE_NAMES: TableDefinition<&str, u64> =
    TableDefinition::new("reward_code_names");

/// Reward claims: (user id, claim date as YYYY-MM-DD) -> RewardClaimRecord (serialized)
/// The composite key enforces one claim per user per day
pub const REWARD_CLAIMS: TableDefinition<(u64, &str), &[u8]> =
    TableDefinition::new("reward_claims");

/// User bank details: user id -> BankDetailsRecord (serialized)
pub const BANK_DETAILS: TableDefinition<u64, &[u8]> = TableDefinition::new("bank_details");

/// Platform receiving accounts: account id -> BankDetailsRecord (serialized)
pub const PLATFORM_BANK_ACCOUNTS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("platform_bank_accounts");

/// Singleton settings: settings key -> settings record (serialized)
pub const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

pub const SETTINGS_PLATFORM: &str = "platform";

pub const SETTINGS_ROULETTE: &str = "roulette";
