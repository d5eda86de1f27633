//! 基础设施层（Infrastructure）
//!
//! 持有进程级资源，只暴露能力：等待、mock 任务表、按键加锁、外部存储契约

pub mod clock;
pub mod keyed_lock;
pub mod mock_task_store;
pub mod store;

pub use clock::{InstantSleeper, Sleeper, TokioSleeper};
pub use keyed_lock::KeyedLocks;
pub use mock_task_store::{fixture_page, MockTaskRecord, MockTaskStore};
pub use store::{InMemoryScoreStore, InMemorySubmissionStore, ScoreStore, SubmissionStore};
