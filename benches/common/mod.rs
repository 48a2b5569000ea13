pub mod config;
pub mod fixtures;

pub use config::BenchConfig;
pub use fixtures::{BenchError, BenchUser, FakeApi, KeyGenerator, nested_value};
