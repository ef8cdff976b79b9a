// Library exports for the uptimemon event listener

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod supervisor;
pub mod timespec;
pub mod watchdog;
