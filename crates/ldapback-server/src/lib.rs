//! ldapback server library.
//!
//! This crate wires stores and the synthesizer from `ldapback-core` into
//! pluggable handlers, provides the reference bind/search coordinator, and
//! backs the `ldapback` command-line tool.

pub mod config;
pub mod error;
pub mod handler;
pub mod ops;

pub use config::{Args, BackendConfig, Command, ConfigArgs, Datastore};
pub use error::{Error, Result};
pub use handler::{open_handler, ConnectionInfo, Handler, HandlerContext, StoreHandler, StubHandler};
pub use ops::{password_hash, DefaultOps, LdapOps};
