//! Request handlers for the gateway API

pub mod admin;
pub mod chat;
pub mod health;

pub use admin::admin_router;
pub use chat::chat_router;
pub use health::health_router;
