mod cache;
pub mod send_due_notifications;
