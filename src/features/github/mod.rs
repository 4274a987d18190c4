pub mod client;
pub mod models;
pub mod rank;
pub mod service;

pub use client::GitHubClient;
pub use models::{GitHubStats, Rank};
pub use service::{GitHubStatsService, StatsFetcher, stats_cache_key};
