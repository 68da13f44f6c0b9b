//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod file_lock;
pub mod json_state_adapter;
pub mod log_notifier;
pub mod paper_exchange;
pub mod text_report_adapter;
#[cfg(feature = "webhook")]
pub mod webhook_notifier;
