//! FileDock Core - Domain types and service boundaries
//!
//! This crate contains the pieces every other FileDock crate agrees on:
//! - **Domain types** - `FileName`, `FileDescriptor`, content-type lookup, `StorageError`
//! - **Port definitions** - the `IFileStorage` trait implemented by storage adapters
//! - **Wire types** - JSON bodies exchanged between the server and its clients
//! - **Configuration** - the YAML-backed `Config` shared by the daemon and tools
//!
//! # Architecture
//!
//! Like the rest of the workspace this crate follows the ports & adapters
//! layout. The domain module is pure and has no I/O. Ports define the
//! trait interfaces that adapter crates (`filedock-storage`) implement, and
//! the HTTP layer (`filedock-server`) only ever talks to the ports.

pub mod api;
pub mod config;
pub mod domain;
pub mod ports;
