//! Subcommands of the `filedock` CLI

pub mod delete;
pub mod download;
pub mod list;
pub mod upload;
pub mod watch;
