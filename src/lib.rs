pub mod app;
pub mod classifier;
pub mod config;
pub mod error;
pub mod organizer;
pub mod pipeline;
pub mod queue;
pub mod scan;
pub mod shutdown;
pub mod types;
pub mod watch;
