//! Integration tests for the control-channel exchange between the
//! activation utility and the driver.

use bytes::BytesMut;
use ifdnfc_core::{ConnString, Error};
use ifdnfc_protocol::{ControlClientCodec, ControlCodec, ControlRequest, ControlResponse};
use rstest::rstest;
use tokio_util::codec::{Decoder, Encoder};

/// Wire form of SET_ACTIVE for `usb:001:002`.
const SET_ACTIVE_USB: &[u8] = b"\x01\x0c\x00usb:001:002\x00";

fn usb_conn() -> ConnString {
    ConnString::new("usb:001:002").unwrap()
}

#[test]
fn test_set_active_exchange() {
    let request = ControlRequest::decode(SET_ACTIVE_USB).unwrap();
    assert_eq!(request, ControlRequest::SetActive(Some(usb_conn())));

    let response = ControlResponse::Active(usb_conn()).to_bytes();
    assert_eq!(response.len(), 15);
    assert_eq!(&response[..3], &[0x01, 0x0c, 0x00]);
    assert_eq!(&response[3..], &SET_ACTIVE_USB[3..]);
}

#[test]
fn test_utility_to_driver_over_stream() {
    let mut client = ControlClientCodec::new();
    let mut driver = ControlCodec::new();
    let mut pipe = BytesMut::new();

    client
        .encode(ControlRequest::SetActive(Some(usb_conn())), &mut pipe)
        .unwrap();
    client.encode(ControlRequest::GetStatus, &mut pipe).unwrap();
    client.encode(ControlRequest::SetInactive, &mut pipe).unwrap();
    assert_eq!(&pipe[..SET_ACTIVE_USB.len()], SET_ACTIVE_USB);

    let mut requests = Vec::new();
    while let Some(request) = driver.decode(&mut pipe).unwrap() {
        requests.push(request);
    }
    assert_eq!(
        requests,
        vec![
            ControlRequest::SetActive(Some(usb_conn())),
            ControlRequest::GetStatus,
            ControlRequest::SetInactive,
        ]
    );

    let mut back = BytesMut::new();
    driver
        .encode(ControlResponse::Active(usb_conn()), &mut back)
        .unwrap();
    driver.encode(ControlResponse::Inactive, &mut back).unwrap();

    assert_eq!(
        client.decode(&mut back).unwrap(),
        Some(ControlResponse::Active(usb_conn()))
    );
    assert_eq!(client.decode(&mut back).unwrap(), Some(ControlResponse::Inactive));
    assert_eq!(client.decode(&mut back).unwrap(), None);
}

#[rstest]
#[case::declared_longer(b"\x01\x0d\x00usb:001:002\x00")]
#[case::declared_shorter(b"\x01\x0b\x00usb:001:002\x00")]
#[case::status_with_payload(b"\x03\x01")]
#[case::inactive_with_payload(b"\x00\x00\x00")]
fn test_length_mismatch_is_rejected(#[case] bytes: &[u8]) {
    let err = ControlRequest::decode(bytes).unwrap_err();
    assert!(matches!(err, Error::MalformedMessage(_)));
    assert_eq!(err.response_code().as_u32(), 612);
}

#[test]
fn test_set_active_any_reader() {
    let request = ControlRequest::decode(&[0x01, 0x00, 0x00]).unwrap();
    assert_eq!(request, ControlRequest::SetActive(None));
}
