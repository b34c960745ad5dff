pub mod classes;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod interface;
pub mod junk_drawer;
pub mod pipeline;
pub mod preprocessing;
pub mod state;
pub mod uploads;
