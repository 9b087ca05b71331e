//! Runtime configuration: engine tuning (TOML) and judge provider (JSON).

pub mod engine;
pub mod judge;

pub use engine::EngineConfig;
pub use judge::{build_judge, JudgeConfig};
