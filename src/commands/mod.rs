pub mod contexts;
pub mod init;
pub mod services;
pub mod start;
pub mod validate;
