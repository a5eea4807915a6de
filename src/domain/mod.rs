pub mod auth;
pub mod conversation;
pub mod message;
pub mod table;
