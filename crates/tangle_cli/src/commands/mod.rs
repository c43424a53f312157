//! CLI commands.

pub mod apply;
pub mod init;
pub mod resolve;
