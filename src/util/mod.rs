pub mod notifier;

pub use notifier::{DispatchError, LogDispatcher, NotificationDispatcher, WebhookDispatcher};
