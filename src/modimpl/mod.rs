pub mod app;
pub mod config;
pub mod error;
pub mod healthstatus;
pub mod logger;
pub mod processor;
