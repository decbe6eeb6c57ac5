mod engine;
pub mod freshness;

pub use engine::{AccountData, SyncEngine};
