pub mod notifications;
pub mod subscriptions;
