use crate::FrameError;

/// MBAP header: transaction id, protocol id, length, unit id.
pub const MBAP_HEADER_LEN: usize = 7;

/// Largest PDU the protocol allows on TCP.
pub const MAX_PDU_LEN: usize = 253;

/// One MBAP frame with its PDU. The protocol id is validated during decode
/// and the length field is recomputed during encode, so neither is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub transaction_id: u16,
    pub unit_id: u8,
    pub pdu: Vec<u8>,
}

impl Frame {
    pub fn new(transaction_id: u16, unit_id: u8, pdu: Vec<u8>) -> Self {
        Self {
            transaction_id,
            unit_id,
            pdu,
        }
    }

    /// Try to decode one frame from the front of `buf`.
    ///
    /// `Ok(None)` means the buffer does not yet hold a complete frame and the
    /// caller should await more bytes. On success the frame is returned
    /// together with the number of buffer bytes it consumed.
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, FrameError> {
        if buf.len() < MBAP_HEADER_LEN {
            return Ok(None);
        }

        let transaction_id = u16::from_be_bytes([buf[0], buf[1]]);
        let protocol_id = u16::from_be_bytes([buf[2], buf[3]]);
        let length = u16::from_be_bytes([buf[4], buf[5]]);
        let unit_id = buf[6];

        if protocol_id != 0 {
            return Err(FrameError::ProtocolId(protocol_id));
        }
        // Length counts the unit id byte plus the PDU, so 2..=254.
        if !(2..=MAX_PDU_LEN as u16 + 1).contains(&length) {
            return Err(FrameError::LengthField(length));
        }

        let total = MBAP_HEADER_LEN + usize::from(length) - 1;
        if buf.len() < total {
            return Ok(None);
        }

        let frame = Self {
            transaction_id,
            unit_id,
            pdu: buf[MBAP_HEADER_LEN..total].to_vec(),
        };
        Ok(Some((frame, total)))
    }

    /// Append the encoded frame to `out`, recomputing the length field.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), FrameError> {
        if self.pdu.is_empty() {
            return Err(FrameError::EmptyPdu);
        }
        if self.pdu.len() > MAX_PDU_LEN {
            return Err(FrameError::PduTooLarge(self.pdu.len()));
        }

        out.extend_from_slice(&self.transaction_id.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.pdu.len() as u16 + 1).to_be_bytes());
        out.push(self.unit_id);
        out.extend_from_slice(&self.pdu);
        Ok(())
    }
}
