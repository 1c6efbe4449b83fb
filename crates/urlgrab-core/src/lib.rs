pub mod config;
pub mod logging;

pub mod attributes;
pub mod checksum;
pub mod error;
pub mod fetcher;
pub mod operation;
pub mod reconcile;
pub mod report;
pub mod request;
