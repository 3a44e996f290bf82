pub mod backend;
pub mod config;
pub mod employee;
pub mod metrics;
pub mod output;
pub mod server;
pub mod telemetry;
pub mod types;
pub mod view;
