// ABOUTME: Library root for vs - exposes the lifecycle engine for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod machine;
pub mod output;
pub mod provider;
pub mod remote;
pub mod types;
