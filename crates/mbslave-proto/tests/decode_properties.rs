use mbslave_proto::{Frame, Request, Response};
use proptest::prelude::*;

proptest! {
    #[test]
    fn random_bytes_never_panic_request_decode(pdu in proptest::collection::vec(any::<u8>(), 0..260)) {
        let _ = Request::decode(&pdu);
    }

    #[test]
    fn random_bytes_never_panic_response_decode(pdu in proptest::collection::vec(any::<u8>(), 0..260)) {
        let _ = Response::decode(&pdu);
    }

    #[test]
    fn random_bytes_never_panic_frame_decode(wire in proptest::collection::vec(any::<u8>(), 0..600)) {
        let _ = Frame::decode(&wire);
    }

    #[test]
    fn frame_roundtrip_is_byte_exact(
        transaction_id in any::<u16>(),
        unit_id in any::<u8>(),
        pdu in proptest::collection::vec(any::<u8>(), 1..=253),
    ) {
        let frame = Frame::new(transaction_id, unit_id, pdu);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();

        let (decoded, consumed) = Frame::decode(&wire).unwrap().unwrap();
        prop_assert_eq!(consumed, wire.len());
        prop_assert_eq!(&decoded, &frame);

        let mut rewire = Vec::new();
        decoded.encode(&mut rewire).unwrap();
        prop_assert_eq!(rewire, wire);
    }

    #[test]
    fn register_response_roundtrip(values in proptest::collection::vec(any::<u16>(), 1..=125)) {
        let response = Response::ReadHoldingRegisters { values };
        let mut pdu = Vec::new();
        response.encode(&mut pdu).unwrap();
        prop_assert_eq!(Response::decode(&pdu).unwrap(), response);
    }
}
