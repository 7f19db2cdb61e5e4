//! Notification parsing

mod parser;

pub use parser::{ServerNotification, parse_notification};
