pub mod batch;
pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod export;
pub mod logging;
pub mod matcher;
pub mod progress;
pub mod scanner;
pub mod score;
pub mod table;
