use crate::cursor::ByteReader;
use crate::exception::ExceptionCode;
use crate::function::Function;
use crate::{bits, PduError};

/// A response PDU. Exactly one is produced per request PDU; protocol faults
/// become the `Exception` variant instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadCoils { values: Vec<bool> },
    ReadDiscreteInputs { values: Vec<bool> },
    ReadHoldingRegisters { values: Vec<u16> },
    ReadInputRegisters { values: Vec<u16> },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { start: u16, quantity: u16 },
    WriteMultipleRegisters { start: u16, quantity: u16 },
    Exception { function: u8, code: ExceptionCode },
}

fn bit_payload(values: &[bool], out: &mut Vec<u8>) -> Result<(), PduError> {
    let packed = bits::pack(values);
    let byte_count =
        u8::try_from(packed.len()).map_err(|_| PduError::ResponseTooLarge(packed.len()))?;
    out.push(byte_count);
    out.extend_from_slice(&packed);
    Ok(())
}

fn word_payload(values: &[u16], out: &mut Vec<u8>) -> Result<(), PduError> {
    let byte_count =
        u8::try_from(values.len() * 2).map_err(|_| PduError::ResponseTooLarge(values.len() * 2))?;
    out.push(byte_count);
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(())
}

impl Response {
    pub fn exception(function: u8, code: ExceptionCode) -> Self {
        Self::Exception { function, code }
    }

    /// Append the response PDU to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), PduError> {
        match self {
            Self::ReadCoils { values } => {
                out.push(Function::ReadCoils.code());
                bit_payload(values, out)?;
            }
            Self::ReadDiscreteInputs { values } => {
                out.push(Function::ReadDiscreteInputs.code());
                bit_payload(values, out)?;
            }
            Self::ReadHoldingRegisters { values } => {
                out.push(Function::ReadHoldingRegisters.code());
                word_payload(values, out)?;
            }
            Self::ReadInputRegisters { values } => {
                out.push(Function::ReadInputRegisters.code());
                word_payload(values, out)?;
            }
            Self::WriteSingleCoil { address, value } => {
                out.push(Function::WriteSingleCoil.code());
                out.extend_from_slice(&address.to_be_bytes());
                let raw: u16 = if *value { 0xFF00 } else { 0x0000 };
                out.extend_from_slice(&raw.to_be_bytes());
            }
            Self::WriteSingleRegister { address, value } => {
                out.push(Function::WriteSingleRegister.code());
                out.extend_from_slice(&address.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Self::WriteMultipleCoils { start, quantity } => {
                out.push(Function::WriteMultipleCoils.code());
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
            }
            Self::WriteMultipleRegisters { start, quantity } => {
                out.push(Function::WriteMultipleRegisters.code());
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
            }
            Self::Exception { function, code } => {
                out.push(function | 0x80);
                out.push(code.code());
            }
        }
        Ok(())
    }

    /// Decode a response PDU. Used by the master side.
    pub fn decode(pdu: &[u8]) -> Result<Self, PduError> {
        let mut r = ByteReader::new(pdu);
        let code = r.take_u8()?;

        if Function::is_exception(code) {
            let response = Self::Exception {
                function: code & 0x7F,
                code: ExceptionCode::from_code(r.take_u8()?),
            };
            if !r.is_empty() {
                return Err(PduError::TrailingBytes);
            }
            return Ok(response);
        }

        let function = Function::from_code(code).ok_or(PduError::UnsupportedFunction(code))?;
        let response = match function {
            Function::ReadCoils | Function::ReadDiscreteInputs => {
                let byte_count = usize::from(r.take_u8()?);
                if byte_count == 0 {
                    return Err(PduError::ByteCountMismatch {
                        got: 0,
                        expected: 1,
                    });
                }
                let values = bits::unpack(r.take_n(byte_count)?, byte_count * 8);
                if function == Function::ReadCoils {
                    Self::ReadCoils { values }
                } else {
                    Self::ReadDiscreteInputs { values }
                }
            }
            Function::ReadHoldingRegisters | Function::ReadInputRegisters => {
                let byte_count = usize::from(r.take_u8()?);
                if byte_count == 0 || byte_count % 2 != 0 {
                    return Err(PduError::OddByteCount(byte_count));
                }
                let data = r.take_n(byte_count)?;
                let values = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                if function == Function::ReadHoldingRegisters {
                    Self::ReadHoldingRegisters { values }
                } else {
                    Self::ReadInputRegisters { values }
                }
            }
            Function::WriteSingleCoil => {
                let address = r.take_u16()?;
                let value = match r.take_u16()? {
                    0xFF00 => true,
                    0x0000 => false,
                    other => return Err(PduError::CoilValue(other)),
                };
                Self::WriteSingleCoil { address, value }
            }
            Function::WriteSingleRegister => Self::WriteSingleRegister {
                address: r.take_u16()?,
                value: r.take_u16()?,
            },
            Function::WriteMultipleCoils => Self::WriteMultipleCoils {
                start: r.take_u16()?,
                quantity: r.take_u16()?,
            },
            Function::WriteMultipleRegisters => Self::WriteMultipleRegisters {
                start: r.take_u16()?,
                quantity: r.take_u16()?,
            },
        };

        if !r.is_empty() {
            return Err(PduError::TrailingBytes);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::Response;
    use crate::{ExceptionCode, PduError};

    #[test]
    fn encodes_register_payload_big_endian() {
        let response = Response::ReadHoldingRegisters {
            values: vec![0x022B, 0x0000, 0x0064],
        };
        let mut pdu = Vec::new();
        response.encode(&mut pdu).unwrap();
        assert_eq!(pdu, vec![0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64]);
    }

    #[test]
    fn encodes_exception() {
        let response = Response::exception(0x03, ExceptionCode::IllegalDataAddress);
        let mut pdu = Vec::new();
        response.encode(&mut pdu).unwrap();
        assert_eq!(pdu, vec![0x83, 0x02]);
    }

    #[test]
    fn decode_inverts_encode_for_exceptions() {
        let original = Response::exception(0x10, ExceptionCode::IllegalFunction);
        let mut pdu = Vec::new();
        original.encode(&mut pdu).unwrap();
        assert_eq!(pdu, vec![0x90, 0x01]);
        assert_eq!(Response::decode(&pdu).unwrap(), original);
    }

    #[test]
    fn decode_preserves_foreign_exception_codes() {
        match Response::decode(&[0x83, 0x0B]).unwrap() {
            Response::Exception { function, code } => {
                assert_eq!(function, 0x03);
                assert_eq!(code, ExceptionCode::Other(0x0B));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn decodes_coil_payload() {
        match Response::decode(&[0x01, 0x01, 0b0001_1111]).unwrap() {
            Response::ReadCoils { values } => {
                assert_eq!(values.len(), 8);
                assert!(values[..5].iter().all(|v| *v));
                assert!(!values[5]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_odd_register_byte_count() {
        assert_eq!(
            Response::decode(&[0x03, 0x03, 0x00, 0x01, 0x02]).unwrap_err(),
            PduError::OddByteCount(3)
        );
    }

    #[test]
    fn write_echo_roundtrips() {
        let responses = [
            Response::WriteSingleCoil {
                address: 7,
                value: true,
            },
            Response::WriteSingleRegister {
                address: 1,
                value: 0x1234,
            },
            Response::WriteMultipleCoils {
                start: 0,
                quantity: 5,
            },
            Response::WriteMultipleRegisters {
                start: 6000,
                quantity: 5,
            },
        ];
        for original in responses {
            let mut pdu = Vec::new();
            original.encode(&mut pdu).unwrap();
            assert_eq!(Response::decode(&pdu).unwrap(), original);
        }
    }

    #[test]
    fn oversized_bit_payload_is_rejected() {
        let response = Response::ReadCoils {
            values: vec![true; 2100],
        };
        let mut pdu = Vec::new();
        assert_eq!(
            response.encode(&mut pdu).unwrap_err(),
            PduError::ResponseTooLarge(263)
        );
    }
}
