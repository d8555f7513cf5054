// Session management module for the activity monitor
// Shared between the library API and the terminal host binary

pub mod config;
pub mod controller;
pub mod fetch;
pub mod listener;
pub mod notify;
pub mod protocol;
pub mod throttle;
