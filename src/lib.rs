pub mod accumulator;
pub mod api;
pub mod campaign;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ingest;

pub use accumulator::{Accumulator, AccumulatorError, InMemoryAccumulator, RedisAccumulator};
pub use campaign::{CampaignError, CampaignService, SettlementRunner, SettlementState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{init_db, Repository, TaskStore};
pub use domain::{Address, LeaderboardEntry, Task, TaskHistory, TaskName, TaskStatus};
pub use error::AppError;
pub use ingest::{SwapEvent, SwapIngestor};
