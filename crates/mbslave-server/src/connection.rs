use crate::dispatch::{respond, Dispatch};
use crate::ServerError;
use bytes::{Buf, BytesMut};
use mbslave_proto::{ExceptionCode, Frame, MBAP_HEADER_LEN};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, trace};

const READ_BUF_CAPACITY: usize = 512;

/// One accepted socket: buffers bytes, answers every complete frame in
/// receipt order, and closes on frame fault, idle timeout, or shutdown.
pub struct Connection<D> {
    socket: TcpStream,
    peer: SocketAddr,
    dispatch: Arc<D>,
    idle_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<D: Dispatch> Connection<D> {
    pub fn new(
        socket: TcpStream,
        peer: SocketAddr,
        dispatch: Arc<D>,
        idle_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            socket,
            peer,
            dispatch,
            idle_timeout,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut buf = BytesMut::with_capacity(READ_BUF_CAPACITY);

        loop {
            // Answer everything already buffered before reading again, so
            // pipelined requests get their responses in receipt order.
            while let Some((frame, consumed)) = Frame::decode(&buf)? {
                buf.advance(consumed);
                self.answer(frame).await?;
            }

            tokio::select! {
                _ = self.shutdown.changed() => {
                    debug!(peer = %self.peer, "closing connection on server shutdown");
                    return Ok(());
                }
                read = timeout(self.idle_timeout, self.socket.read_buf(&mut buf)) => {
                    match read {
                        Err(_) => {
                            debug!(peer = %self.peer, timeout = ?self.idle_timeout, "closing idle connection");
                            return Ok(());
                        }
                        Ok(Ok(0)) => {
                            trace!(peer = %self.peer, "peer closed connection");
                            return Ok(());
                        }
                        Ok(Ok(_)) => {}
                        Ok(Err(err)) => return Err(ServerError::Io(err)),
                    }
                }
            }
        }
    }

    async fn answer(&mut self, frame: Frame) -> Result<(), ServerError> {
        let response = respond(self.dispatch.as_ref(), frame.unit_id, &frame.pdu);

        let mut pdu = Vec::with_capacity(8);
        if response.encode(&mut pdu).is_err() {
            // A response that cannot fit a PDU is an internal fault, not a
            // reason to drop the connection.
            pdu.clear();
            pdu.push((frame.pdu.first().copied().unwrap_or(0) & 0x7F) | 0x80);
            pdu.push(ExceptionCode::ServerDeviceFailure.code());
        }

        let reply = Frame::new(frame.transaction_id, frame.unit_id, pdu);
        let mut wire = Vec::with_capacity(MBAP_HEADER_LEN + reply.pdu.len());
        reply.encode(&mut wire)?;

        trace!(
            peer = %self.peer,
            transaction_id = frame.transaction_id,
            unit_id = frame.unit_id,
            pdu_len = reply.pdu.len(),
            "sending response frame"
        );
        self.socket.write_all(&wire).await?;
        Ok(())
    }
}
