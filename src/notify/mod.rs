//! Delivery of match events to the external game system

pub mod dispatcher;
pub mod http;
pub mod notifier;

pub use dispatcher::NotificationDispatcher;
pub use http::{HttpMatchNotifier, SECRET_HEADER};
pub use notifier::{LogOnlyNotifier, MatchNotifier};
