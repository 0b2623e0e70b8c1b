//! dropwatch: rotates an external drops miner across live Twitch channels

pub mod cli;
pub mod config;
pub mod discovery;
pub mod miner;
pub mod rotation;
pub mod twitch;
