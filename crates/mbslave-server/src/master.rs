use bytes::{Buf, BytesMut};
use mbslave_proto::{ExceptionCode, Frame, FrameError, PduError, Request, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::trace;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("pdu error: {0}")]
    Pdu(#[from] PduError),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("server closed the connection")]
    ConnectionClosed,
    #[error("transaction id mismatch: sent {sent}, got {got}")]
    TransactionMismatch { sent: u16, got: u16 },
    #[error("server exception {code:?} for function {function:#04x}")]
    Exception { function: u8, code: ExceptionCode },
    #[error("response does not match the request function")]
    UnexpectedResponse,
}

#[derive(Debug, Clone, Copy)]
pub struct MasterConfig {
    pub response_timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
        }
    }
}

impl MasterConfig {
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }
}

/// Single-connection Modbus TCP master with one outstanding request at a
/// time, enforced by `&mut self`. Used by the tools and integration tests.
#[derive(Debug)]
pub struct Master {
    stream: TcpStream,
    buf: BytesMut,
    next_transaction: u16,
    config: MasterConfig,
}

impl Master {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, MasterError> {
        Self::connect_with_config(addr, MasterConfig::default()).await
    }

    pub async fn connect_with_config<A: ToSocketAddrs>(
        addr: A,
        config: MasterConfig,
    ) -> Result<Self, MasterError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(512),
            next_transaction: 1,
            config,
        })
    }

    /// Send one request and await its response. A server exception is
    /// surfaced as [`MasterError::Exception`].
    pub async fn request(
        &mut self,
        unit_id: u8,
        request: &Request,
    ) -> Result<Response, MasterError> {
        let transaction_id = self.next_transaction;
        self.next_transaction = self.next_transaction.wrapping_add(1);

        let mut pdu = Vec::new();
        request.encode(&mut pdu)?;
        let mut wire = Vec::new();
        Frame::new(transaction_id, unit_id, pdu).encode(&mut wire)?;

        trace!(
            transaction_id,
            unit_id,
            function = request.function().code(),
            "sending request frame"
        );
        self.stream.write_all(&wire).await?;

        let reply = timeout(self.config.response_timeout, self.read_frame())
            .await
            .map_err(|_| MasterError::Timeout(self.config.response_timeout))??;
        if reply.transaction_id != transaction_id {
            return Err(MasterError::TransactionMismatch {
                sent: transaction_id,
                got: reply.transaction_id,
            });
        }

        match Response::decode(&reply.pdu)? {
            Response::Exception { function, code } => {
                Err(MasterError::Exception { function, code })
            }
            response => Ok(response),
        }
    }

    async fn read_frame(&mut self) -> Result<Frame, MasterError> {
        loop {
            if let Some((frame, consumed)) = Frame::decode(&self.buf)? {
                self.buf.advance(consumed);
                return Ok(frame);
            }
            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Err(MasterError::ConnectionClosed);
            }
        }
    }

    pub async fn read_coils(
        &mut self,
        unit_id: u8,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, MasterError> {
        match self
            .request(unit_id, &Request::ReadCoils { start, quantity })
            .await?
        {
            Response::ReadCoils { mut values } if values.len() >= usize::from(quantity) => {
                values.truncate(usize::from(quantity));
                Ok(values)
            }
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn read_discrete_inputs(
        &mut self,
        unit_id: u8,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<bool>, MasterError> {
        match self
            .request(unit_id, &Request::ReadDiscreteInputs { start, quantity })
            .await?
        {
            Response::ReadDiscreteInputs { mut values } if values.len() >= usize::from(quantity) => {
                values.truncate(usize::from(quantity));
                Ok(values)
            }
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, MasterError> {
        match self
            .request(unit_id, &Request::ReadHoldingRegisters { start, quantity })
            .await?
        {
            Response::ReadHoldingRegisters { values } if values.len() == usize::from(quantity) => {
                Ok(values)
            }
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn read_input_registers(
        &mut self,
        unit_id: u8,
        start: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, MasterError> {
        match self
            .request(unit_id, &Request::ReadInputRegisters { start, quantity })
            .await?
        {
            Response::ReadInputRegisters { values } if values.len() == usize::from(quantity) => {
                Ok(values)
            }
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn write_single_coil(
        &mut self,
        unit_id: u8,
        address: u16,
        value: bool,
    ) -> Result<(), MasterError> {
        match self
            .request(unit_id, &Request::WriteSingleCoil { address, value })
            .await?
        {
            Response::WriteSingleCoil {
                address: echo_address,
                value: echo_value,
            } if echo_address == address && echo_value == value => Ok(()),
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn write_single_register(
        &mut self,
        unit_id: u8,
        address: u16,
        value: u16,
    ) -> Result<(), MasterError> {
        match self
            .request(unit_id, &Request::WriteSingleRegister { address, value })
            .await?
        {
            Response::WriteSingleRegister {
                address: echo_address,
                value: echo_value,
            } if echo_address == address && echo_value == value => Ok(()),
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn write_multiple_coils(
        &mut self,
        unit_id: u8,
        start: u16,
        values: &[bool],
    ) -> Result<(), MasterError> {
        let quantity = values.len() as u16;
        match self
            .request(
                unit_id,
                &Request::WriteMultipleCoils {
                    start,
                    values: values.to_vec(),
                },
            )
            .await?
        {
            Response::WriteMultipleCoils {
                start: echo_start,
                quantity: echo_quantity,
            } if echo_start == start && echo_quantity == quantity => Ok(()),
            _ => Err(MasterError::UnexpectedResponse),
        }
    }

    pub async fn write_multiple_registers(
        &mut self,
        unit_id: u8,
        start: u16,
        values: &[u16],
    ) -> Result<(), MasterError> {
        let quantity = values.len() as u16;
        match self
            .request(
                unit_id,
                &Request::WriteMultipleRegisters {
                    start,
                    values: values.to_vec(),
                },
            )
            .await?
        {
            Response::WriteMultipleRegisters {
                start: echo_start,
                quantity: echo_quantity,
            } if echo_start == start && echo_quantity == quantity => Ok(()),
            _ => Err(MasterError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Master, MasterConfig, MasterError};
    use mbslave_proto::Frame;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn scripted_server(responses: Vec<Vec<u8>>) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            for pdu in responses {
                let mut header = [0u8; 7];
                socket.read_exact(&mut header).await.unwrap();
                let declared = usize::from(u16::from_be_bytes([header[4], header[5]])) - 1;
                let mut body = vec![0u8; declared];
                socket.read_exact(&mut body).await.unwrap();

                let transaction_id = u16::from_be_bytes([header[0], header[1]]);
                let mut wire = Vec::new();
                Frame::new(transaction_id, header[6], pdu).encode(&mut wire).unwrap();
                socket.write_all(&wire).await.unwrap();
            }
        });
        (addr, task)
    }

    #[tokio::test]
    async fn read_holding_registers_roundtrip() {
        let (addr, task) =
            scripted_server(vec![vec![0x03, 0x04, 0x12, 0x34, 0xAB, 0xCD]]).await;
        let mut master = Master::connect(addr).await.unwrap();

        let values = master.read_holding_registers(1, 0, 2).await.unwrap();
        assert_eq!(values, vec![0x1234, 0xABCD]);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn exception_is_surfaced_as_error() {
        let (addr, task) = scripted_server(vec![vec![0x83, 0x02]]).await;
        let mut master = Master::connect(addr).await.unwrap();

        let err = master.read_holding_registers(1, 0, 1).await.unwrap_err();
        assert!(matches!(err, MasterError::Exception { function: 0x03, .. }));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn coil_payload_is_truncated_to_requested_quantity() {
        let (addr, task) = scripted_server(vec![vec![0x01, 0x02, 0xFF, 0x01]]).await;
        let mut master = Master::connect(addr).await.unwrap();

        let values = master.read_coils(1, 0, 9).await.unwrap();
        assert_eq!(values.len(), 9);
        assert!(values.iter().all(|v| *v));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = MasterConfig::default().with_response_timeout(Duration::from_millis(50));
        let mut master = Master::connect_with_config(addr, config).await.unwrap();
        let err = master.read_holding_registers(1, 0, 1).await.unwrap_err();
        assert!(matches!(err, MasterError::Timeout(_)));
        hold.abort();
    }
}
