// stockaudit/src/commands/mod.rs

pub mod init;
pub mod validate;
