pub mod notification_badge;

pub use notification_badge::NotificationBadge;
