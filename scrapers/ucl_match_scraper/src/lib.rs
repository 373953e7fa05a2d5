pub mod canonical;
pub mod chrome;
pub mod config;
pub mod error;
pub mod extract;
pub mod inputs;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod snapshot;
pub mod types;
pub mod writer;
