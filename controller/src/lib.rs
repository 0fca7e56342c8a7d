//! Fleet controller for the elevator bank: dispatch of requests onto elevators,
//! fleet-wide emergency handling, and the collaborators around it (TCP command
//! server, backup writer, console and demo driver).

pub mod controller;
pub mod modules;
pub mod utilities;

pub use controller::{Controller, RequestError};
