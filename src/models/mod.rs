pub mod bank;
pub mod deposit;
pub mod level;
pub mod reward;
pub mod roulette;
pub mod session;
pub mod settings;
pub mod task;
pub mod user;
pub mod withdrawal;

pub use bank::BankDetailsRecord;
pub use deposit::{Deposit, DepositRecord};
pub use level::{Level, LevelRecord, UserLevelRecord};
pub use reward::{DailyRewardCodeRecord, RewardClaim, RewardClaimRecord};
pub use roulette::{PrizeTable, RouletteSettings, SpinRecord};
pub use session::SessionRecord;
pub use settings::{PlatformSettings, SupportLinks};
pub use task::TaskRecord;
pub use user::{User, UserRecord};
pub use withdrawal::{Withdrawal, WithdrawalPolicy, WithdrawalRecord, WithdrawalStatus};
