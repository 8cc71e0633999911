pub mod alert;
pub mod config;
pub mod console;
pub mod db;
pub mod deadline;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod subscription;

pub use service::{MonitorHandle, PriceMonitor, PriceStatus};
