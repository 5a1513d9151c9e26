use crate::store::{BitSpace, DataBank, StoreError, WordSpace};
use mbslave_proto::{ExceptionCode, PduError, Request, Response};
use std::sync::Arc;
use tracing::warn;

/// Maps one decoded request to exactly one response. Implementations must
/// not fail: protocol and internal faults are expressed as
/// [`Response::Exception`].
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, unit_id: u8, request: Request) -> Response;
}

impl<T> Dispatch for Arc<T>
where
    T: Dispatch + ?Sized,
{
    fn dispatch(&self, unit_id: u8, request: Request) -> Response {
        (**self).dispatch(unit_id, request)
    }
}

/// Turns a raw request PDU into a response, routing decode failures to the
/// matching exception code. The connection handler calls nothing else.
pub fn respond<D: Dispatch + ?Sized>(dispatch: &D, unit_id: u8, pdu: &[u8]) -> Response {
    let function = pdu.first().copied().unwrap_or(0) & 0x7F;
    match Request::decode(pdu) {
        Ok(request) => dispatch.dispatch(unit_id, request),
        Err(err) => Response::exception(function, exception_for(&err)),
    }
}

fn exception_for(err: &PduError) -> ExceptionCode {
    match err {
        PduError::UnsupportedFunction(_) => ExceptionCode::IllegalFunction,
        PduError::ResponseTooLarge(_) => ExceptionCode::ServerDeviceFailure,
        _ => ExceptionCode::IllegalDataValue,
    }
}

/// Dispatcher backed by a shared [`DataBank`]. Serves every unit id and
/// echoes the requested one back.
#[derive(Debug)]
pub struct BankDispatcher {
    bank: Arc<DataBank>,
}

impl BankDispatcher {
    pub fn new(bank: Arc<DataBank>) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &Arc<DataBank> {
        &self.bank
    }

    fn execute(&self, request: &Request) -> Result<Response, StoreError> {
        let response = match request {
            Request::ReadCoils { start, quantity } => Response::ReadCoils {
                values: self.bank.read_bits(BitSpace::Coils, *start, *quantity)?,
            },
            Request::ReadDiscreteInputs { start, quantity } => Response::ReadDiscreteInputs {
                values: self
                    .bank
                    .read_bits(BitSpace::DiscreteInputs, *start, *quantity)?,
            },
            Request::ReadHoldingRegisters { start, quantity } => Response::ReadHoldingRegisters {
                values: self.bank.read_words(WordSpace::Holding, *start, *quantity)?,
            },
            Request::ReadInputRegisters { start, quantity } => Response::ReadInputRegisters {
                values: self.bank.read_words(WordSpace::Input, *start, *quantity)?,
            },
            Request::WriteSingleCoil { address, value } => {
                self.bank.set_bit(BitSpace::Coils, *address, *value)?;
                Response::WriteSingleCoil {
                    address: *address,
                    value: *value,
                }
            }
            Request::WriteSingleRegister { address, value } => {
                self.bank.set_word(WordSpace::Holding, *address, *value)?;
                Response::WriteSingleRegister {
                    address: *address,
                    value: *value,
                }
            }
            Request::WriteMultipleCoils { start, values } => {
                self.bank.write_bits(BitSpace::Coils, *start, values)?;
                Response::WriteMultipleCoils {
                    start: *start,
                    quantity: values.len() as u16,
                }
            }
            Request::WriteMultipleRegisters { start, values } => {
                self.bank.write_words(WordSpace::Holding, *start, values)?;
                Response::WriteMultipleRegisters {
                    start: *start,
                    quantity: values.len() as u16,
                }
            }
        };
        Ok(response)
    }
}

impl Dispatch for BankDispatcher {
    fn dispatch(&self, _unit_id: u8, request: Request) -> Response {
        let function = request.function().code();
        match self.execute(&request) {
            Ok(response) => response,
            Err(StoreError::IllegalAddress) => {
                Response::exception(function, ExceptionCode::IllegalDataAddress)
            }
            Err(err) => {
                warn!(function, error = %err, "data bank fault during dispatch");
                Response::exception(function, ExceptionCode::ServerDeviceFailure)
            }
        }
    }
}
