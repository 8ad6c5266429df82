pub mod expiry;

pub use expiry::{DailySchedule, ExpiryJob};
