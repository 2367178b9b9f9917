pub mod adapter;
pub mod bench;
pub mod conf;
pub mod core;
pub mod progress;
pub mod runner;

#[cfg(feature = "testutil")]
pub mod testutil;
