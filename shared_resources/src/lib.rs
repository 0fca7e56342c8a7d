pub mod config;
pub mod direction;
pub mod elevator_status;
pub mod event;
pub mod request;
