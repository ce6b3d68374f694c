pub mod generator;

pub use generator::{NotificationService, NOTIFICATIONS_TABLE};
