#![forbid(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod model;
pub mod time;

pub use cache::{CacheEntry, LEARNED_TTL, POSITION_TTL};
pub use time::Clock;
