pub mod cli;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod supervisor;
pub mod ui;
