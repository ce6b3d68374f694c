pub mod chairs;
pub mod ledger;
pub mod scheduler;

pub use chairs::ChairPool;
pub use ledger::{AppointmentLedger, StatusChange};
pub use scheduler::{NotificationSink, SchedulerService};
