//! Modbus TCP slave engine.
//!
//! The [`DataBank`] holds the four addressable spaces, a [`Dispatch`]
//! implementation turns decoded requests into responses, and [`Server`]
//! accepts connections and runs one handler task per socket. [`Master`] is
//! the matching single-connection client used by the tools and tests.

#![forbid(unsafe_code)]

pub mod connection;
pub mod dispatch;
pub mod master;
pub mod server;
pub mod store;

pub use dispatch::{BankDispatcher, Dispatch};
pub use master::{Master, MasterConfig, MasterError};
pub use server::{Server, ServerConfig, ServerHandle};
pub use store::{BankSizes, BitSpace, DataBank, StoreError, WordSpace};

use thiserror::Error;

/// Connection-fatal faults. These end one connection (or the accept loop),
/// never the data bank.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] mbslave_proto::FrameError),
}
