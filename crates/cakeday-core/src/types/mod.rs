//! Shared data types.

pub mod birthday;
pub mod notification;

pub use birthday::{BirthdayRecord, LastNotified, LedgerUpdate, NewBirthday, NotifyCategory};
pub use notification::{PushMessage, REMINDER_TITLE, SendOutcome, reminder_body};
