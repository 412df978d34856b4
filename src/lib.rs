pub mod achievement;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod notify;
pub mod page;
pub mod reference;
pub mod service;
pub mod stats;
pub mod store;
pub mod utils;

pub use http::{AppState, create_app};
pub use service::{AchievementService, AchievementView};
pub use stats::{AchievementStatistics, StatisticsAggregator};
