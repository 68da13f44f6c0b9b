//! Port traits for external collaborators.

pub mod config_port;
pub mod data_port;
pub mod exchange_port;
pub mod notify_port;
pub mod report_port;
pub mod state_port;
pub mod trade_log_port;
pub mod venue_port;
