//! Modbus TCP wire format: MBAP framing plus request/response PDUs.
//!
//! The frame layer and the PDU layer fail differently on purpose: a
//! [`FrameError`] means the byte stream itself is broken and the connection
//! must be dropped, while a [`PduError`] describes a well-framed but invalid
//! request and is answered with an exception response.

#![forbid(unsafe_code)]

mod bits;
mod cursor;

pub mod error;
pub mod exception;
pub mod frame;
pub mod function;
pub mod request;
pub mod response;

pub use error::{FrameError, PduError};
pub use exception::ExceptionCode;
pub use frame::{Frame, MAX_PDU_LEN, MBAP_HEADER_LEN};
pub use function::Function;
pub use request::Request;
pub use response::Response;
