use thiserror::Error;

/// Faults in the MBAP byte stream. Any of these terminates the connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("protocol id must be zero, got {0:#06x}")]
    ProtocolId(u16),
    #[error("declared length {0} outside 2..=254")]
    LengthField(u16),
    #[error("pdu of {0} bytes exceeds the 253-byte maximum")]
    PduTooLarge(usize),
    #[error("frame carries no pdu")]
    EmptyPdu,
}

/// Faults inside a well-framed PDU. The connection survives; the request is
/// answered with an exception response chosen from this error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PduError {
    #[error("function code {0:#04x} is not supported")]
    UnsupportedFunction(u8),
    #[error("pdu ends before its declared content")]
    Truncated,
    #[error("trailing bytes after pdu body")]
    TrailingBytes,
    #[error("quantity {got} outside 1..={max}")]
    QuantityRange { got: u16, max: u16 },
    #[error("byte count {got} does not match declared quantity (expected {expected})")]
    ByteCountMismatch { got: usize, expected: usize },
    #[error("register payload byte count {0} is not even")]
    OddByteCount(usize),
    #[error("coil value must be 0xFF00 or 0x0000, got {0:#06x}")]
    CoilValue(u16),
    #[error("payload of {0} bytes cannot fit a response pdu")]
    ResponseTooLarge(usize),
}
