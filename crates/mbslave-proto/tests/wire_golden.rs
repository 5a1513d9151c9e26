use mbslave_proto::{ExceptionCode, Frame, FrameError, Request, Response};

const READ_HOLDING_PDU: &[u8] = &[0x03, 0x00, 0x6B, 0x00, 0x03];
const TCP_READ_HOLDING: &[u8] = &[
    0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x6B, 0x00, 0x03,
];

#[test]
fn fc03_frame_golden_encode() {
    let frame = Frame::new(1, 1, READ_HOLDING_PDU.to_vec());
    let mut wire = Vec::new();
    frame.encode(&mut wire).unwrap();
    assert_eq!(wire, TCP_READ_HOLDING);
}

#[test]
fn fc03_frame_golden_decode() {
    let (frame, consumed) = Frame::decode(TCP_READ_HOLDING).unwrap().unwrap();
    assert_eq!(consumed, TCP_READ_HOLDING.len());
    assert_eq!(frame.transaction_id, 1);
    assert_eq!(frame.unit_id, 1);
    assert_eq!(frame.pdu, READ_HOLDING_PDU);

    let request = Request::decode(&frame.pdu).unwrap();
    assert_eq!(
        request,
        Request::ReadHoldingRegisters {
            start: 0x006B,
            quantity: 3
        }
    );
}

#[test]
fn fc0f_request_golden_encode() {
    let request = Request::WriteMultipleCoils {
        start: 0x0013,
        values: vec![true, false, true, true, false, false, true, false, true],
    };
    let mut pdu = Vec::new();
    request.encode(&mut pdu).unwrap();
    assert_eq!(
        pdu,
        vec![0x0F, 0x00, 0x13, 0x00, 0x09, 0x02, 0b0100_1101, 0b0000_0001]
    );
}

#[test]
fn exception_pdu_golden() {
    let mut pdu = Vec::new();
    Response::exception(0x2A, ExceptionCode::IllegalFunction)
        .encode(&mut pdu)
        .unwrap();
    assert_eq!(pdu, vec![0xAA, 0x01]);
}

#[test]
fn truncated_stream_never_yields_a_frame() {
    for cut in 0..TCP_READ_HOLDING.len() {
        assert_eq!(Frame::decode(&TCP_READ_HOLDING[..cut]).unwrap(), None);
    }
}

#[test]
fn protocol_id_violation_is_terminal() {
    let mut wire = TCP_READ_HOLDING.to_vec();
    wire[3] = 0x01;
    assert_eq!(
        Frame::decode(&wire).unwrap_err(),
        FrameError::ProtocolId(0x0001)
    );
}
