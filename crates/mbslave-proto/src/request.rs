use crate::cursor::ByteReader;
use crate::function::Function;
use crate::{bits, PduError};

pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_WORDS: u16 = 125;
pub const MAX_WRITE_BITS: u16 = 1968;
pub const MAX_WRITE_WORDS: u16 = 123;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

fn check_quantity(got: u16, max: u16) -> Result<(), PduError> {
    if got == 0 || got > max {
        return Err(PduError::QuantityRange { got, max });
    }
    Ok(())
}

/// A decoded request PDU. Quantity ranges and byte counts are validated
/// during decode, so a constructed value is always well-formed on the wire
/// side; address validation against the data bank happens at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { start: u16, quantity: u16 },
    ReadDiscreteInputs { start: u16, quantity: u16 },
    ReadHoldingRegisters { start: u16, quantity: u16 },
    ReadInputRegisters { start: u16, quantity: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { start: u16, values: Vec<bool> },
    WriteMultipleRegisters { start: u16, values: Vec<u16> },
}

impl Request {
    pub fn function(&self) -> Function {
        match self {
            Self::ReadCoils { .. } => Function::ReadCoils,
            Self::ReadDiscreteInputs { .. } => Function::ReadDiscreteInputs,
            Self::ReadHoldingRegisters { .. } => Function::ReadHoldingRegisters,
            Self::ReadInputRegisters { .. } => Function::ReadInputRegisters,
            Self::WriteSingleCoil { .. } => Function::WriteSingleCoil,
            Self::WriteSingleRegister { .. } => Function::WriteSingleRegister,
            Self::WriteMultipleCoils { .. } => Function::WriteMultipleCoils,
            Self::WriteMultipleRegisters { .. } => Function::WriteMultipleRegisters,
        }
    }

    pub fn decode(pdu: &[u8]) -> Result<Self, PduError> {
        let mut r = ByteReader::new(pdu);
        let code = r.take_u8()?;
        let function = Function::from_code(code).ok_or(PduError::UnsupportedFunction(code))?;

        let request = match function {
            Function::ReadCoils => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_READ_BITS)?;
                Self::ReadCoils { start, quantity }
            }
            Function::ReadDiscreteInputs => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_READ_BITS)?;
                Self::ReadDiscreteInputs { start, quantity }
            }
            Function::ReadHoldingRegisters => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_READ_WORDS)?;
                Self::ReadHoldingRegisters { start, quantity }
            }
            Function::ReadInputRegisters => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_READ_WORDS)?;
                Self::ReadInputRegisters { start, quantity }
            }
            Function::WriteSingleCoil => {
                let address = r.take_u16()?;
                let raw = r.take_u16()?;
                let value = match raw {
                    COIL_ON => true,
                    COIL_OFF => false,
                    other => return Err(PduError::CoilValue(other)),
                };
                Self::WriteSingleCoil { address, value }
            }
            Function::WriteSingleRegister => Self::WriteSingleRegister {
                address: r.take_u16()?,
                value: r.take_u16()?,
            },
            Function::WriteMultipleCoils => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_WRITE_BITS)?;
                let byte_count = usize::from(r.take_u8()?);
                let expected = usize::from(quantity).div_ceil(8);
                if byte_count != expected {
                    return Err(PduError::ByteCountMismatch {
                        got: byte_count,
                        expected,
                    });
                }
                let packed = r.take_n(byte_count)?;
                Self::WriteMultipleCoils {
                    start,
                    values: bits::unpack(packed, usize::from(quantity)),
                }
            }
            Function::WriteMultipleRegisters => {
                let start = r.take_u16()?;
                let quantity = r.take_u16()?;
                check_quantity(quantity, MAX_WRITE_WORDS)?;
                let byte_count = usize::from(r.take_u8()?);
                let expected = usize::from(quantity) * 2;
                if byte_count != expected {
                    return Err(PduError::ByteCountMismatch {
                        got: byte_count,
                        expected,
                    });
                }
                let mut values = Vec::with_capacity(usize::from(quantity));
                for _ in 0..quantity {
                    values.push(r.take_u16()?);
                }
                Self::WriteMultipleRegisters { start, values }
            }
        };

        if !r.is_empty() {
            return Err(PduError::TrailingBytes);
        }
        Ok(request)
    }

    /// Append the request PDU to `out`. Used by the master side.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), PduError> {
        out.push(self.function().code());
        match self {
            Self::ReadCoils { start, quantity } | Self::ReadDiscreteInputs { start, quantity } => {
                check_quantity(*quantity, MAX_READ_BITS)?;
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
            }
            Self::ReadHoldingRegisters { start, quantity }
            | Self::ReadInputRegisters { start, quantity } => {
                check_quantity(*quantity, MAX_READ_WORDS)?;
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
            }
            Self::WriteSingleCoil { address, value } => {
                out.extend_from_slice(&address.to_be_bytes());
                let raw = if *value { COIL_ON } else { COIL_OFF };
                out.extend_from_slice(&raw.to_be_bytes());
            }
            Self::WriteSingleRegister { address, value } => {
                out.extend_from_slice(&address.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Self::WriteMultipleCoils { start, values } => {
                let quantity =
                    u16::try_from(values.len()).map_err(|_| PduError::QuantityRange {
                        got: u16::MAX,
                        max: MAX_WRITE_BITS,
                    })?;
                check_quantity(quantity, MAX_WRITE_BITS)?;
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
                let packed = bits::pack(values);
                out.push(packed.len() as u8);
                out.extend_from_slice(&packed);
            }
            Self::WriteMultipleRegisters { start, values } => {
                let quantity =
                    u16::try_from(values.len()).map_err(|_| PduError::QuantityRange {
                        got: u16::MAX,
                        max: MAX_WRITE_WORDS,
                    })?;
                check_quantity(quantity, MAX_WRITE_WORDS)?;
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
                out.push((values.len() * 2) as u8);
                for value in values {
                    out.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
        Ok(())
    }
}
