pub mod auth_service;
pub mod conversation_service;
pub mod crud_service;
pub mod gateway;
pub mod push;
