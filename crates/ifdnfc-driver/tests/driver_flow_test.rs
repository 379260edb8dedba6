//! End-to-end tests of the host entry points against a mock reader.

mod common;

use common::*;
use ifdnfc_core::constants::*;
use ifdnfc_core::{Error, ResponseCode};
use ifdnfc_driver::{HandlerConfig, response_code};
use ifdnfc_hardware::mock::MockOp;
use ifdnfc_slot::SlotState;
use rstest::{fixture, rstest};

#[fixture]
fn host() -> Host {
    Host::new(HandlerConfig::default())
}

/// Activated handler with card A powered.
#[fixture]
fn powered(host: Host) -> Host {
    let mut host = host;
    host.reader.place_target(card_a());
    host.activate();
    host.handler.power_icc(IFD_POWER_UP, ATR_CAPACITY).unwrap();
    assert_eq!(host.handler.state(), SlotState::PresentPowered);
    host
}

// ============================================================================
// Capabilities
// ============================================================================

#[rstest]
#[case::slots(TAG_IFD_SLOTS_NUMBER, vec![1])]
#[case::simultaneous(TAG_IFD_SIMULTANEOUS_ACCESS, vec![1])]
#[case::thread_safe(TAG_IFD_THREAD_SAFE, vec![0])]
#[case::slot_thread_safe(TAG_IFD_SLOT_THREAD_SAFE, vec![0])]
fn test_static_capabilities(mut host: Host, #[case] tag: u32, #[case] expected: Vec<u8>) {
    assert_eq!(host.handler.get_capabilities(tag, 4).unwrap(), expected);

    let err = host.handler.get_capabilities(tag, 0).unwrap_err();
    assert_eq!(err.response_code(), ResponseCode::CommunicationError);
}

#[rstest]
fn test_unknown_capability(mut host: Host) {
    let result = host.handler.get_capabilities(0x0FFF, 64);
    assert_eq!(response_code(&result).as_u32(), IFD_ERROR_TAG);
}

#[rstest]
#[case(TAG_IFD_ATR)]
#[case(SCARD_ATTR_ATR_STRING)]
fn test_atr_capability(mut powered: Host, #[case] tag: u32) {
    let atr = powered.handler.get_capabilities(tag, ATR_CAPACITY).unwrap();
    assert_eq!(atr, CARD_A_ATR);
}

#[rstest]
fn test_atr_capability_too_small(mut powered: Host) {
    let result = powered.handler.get_capabilities(TAG_IFD_ATR, 6);
    assert!(matches!(
        result,
        Err(Error::BufferTooSmall { needed: 7, capacity: 6 })
    ));
    assert_eq!(response_code(&result).as_u32(), IFD_COMMUNICATION_ERROR);
    assert_eq!(powered.handler.state(), SlotState::PresentPowered);
}

#[rstest]
fn test_atr_capability_discovers(mut host: Host) {
    host.activate();
    host.reader.place_target(card_b());

    let atr = host.handler.get_capabilities(TAG_IFD_ATR, ATR_CAPACITY).unwrap();
    assert_eq!(atr.len(), 14);
    assert_eq!(host.handler.state(), SlotState::PresentPowered);
}

#[rstest]
fn test_set_capabilities_read_only(mut host: Host) {
    let result = host.handler.set_capabilities(TAG_IFD_ATR, &[0x3B]);
    assert_eq!(response_code(&result).as_u32(), IFD_ERROR_VALUE_READ_ONLY);
}

#[rstest]
#[case(SCARD_PROTOCOL_T1, IFD_SUCCESS)]
#[case(SCARD_PROTOCOL_T0, IFD_PROTOCOL_NOT_SUPPORTED)]
#[case(SCARD_PROTOCOL_T0 | SCARD_PROTOCOL_T1, IFD_PROTOCOL_NOT_SUPPORTED)]
fn test_protocol_selection(mut host: Host, #[case] protocol: u32, #[case] code: u32) {
    let result = host.handler.set_protocol_parameters(protocol);
    assert_eq!(response_code(&result).as_u32(), code);
}

// ============================================================================
// Power
// ============================================================================

#[rstest]
fn test_power_up_returns_atr(mut host: Host) {
    host.reader.place_target(card_a());
    host.activate();

    let atr = host.handler.power_icc(IFD_POWER_UP, ATR_CAPACITY).unwrap();
    assert_eq!(atr, CARD_A_ATR);
}

#[rstest]
fn test_power_up_without_card(mut host: Host) {
    host.activate();
    let result = host.handler.power_icc(IFD_POWER_UP, ATR_CAPACITY);
    assert_eq!(response_code(&result).as_u32(), IFD_ICC_NOT_PRESENT);
    assert_eq!(host.handler.state(), SlotState::NoTarget);
}

#[rstest]
fn test_power_action_not_supported(mut powered: Host) {
    let result = powered.handler.power_icc(503, ATR_CAPACITY);
    assert_eq!(response_code(&result).as_u32(), IFD_ERROR_NOT_SUPPORTED);
    assert_eq!(powered.handler.state(), SlotState::PresentPowered);
}

#[rstest]
fn test_power_down_failure(mut powered: Host) {
    powered.reader.fail(MockOp::Idle);
    let result = powered.handler.power_icc(IFD_POWER_DOWN, ATR_CAPACITY);
    assert_eq!(response_code(&result).as_u32(), IFD_ERROR_POWER_ACTION);
}

#[rstest]
fn test_reset_returns_same_atr(mut powered: Host) {
    let atr = powered.handler.power_icc(IFD_RESET, ATR_CAPACITY).unwrap();
    assert_eq!(atr, CARD_A_ATR);
}

#[rstest]
fn test_reset_after_removal(mut powered: Host) {
    powered.reader.remove_target(&card_a());
    let result = powered.handler.power_icc(IFD_RESET, ATR_CAPACITY);
    assert_eq!(response_code(&result).as_u32(), IFD_ERROR_POWER_ACTION);
    assert_eq!(powered.handler.state(), SlotState::NoTarget);
}

/// PowerDown keeps the ATR; a failed presence check drops the target and the
/// next ATR query reports the card missing.
#[rstest]
fn test_power_down_then_card_removed(mut powered: Host) {
    assert!(powered.handler.power_icc(IFD_POWER_DOWN, ATR_CAPACITY).unwrap().is_empty());
    assert_eq!(powered.handler.state(), SlotState::PresentUnpowered);
    assert!(!powered.reader.field_on());
    assert_eq!(powered.handler.machine().slot().atr().as_bytes(), &CARD_A_ATR);

    powered.reader.remove_target(&card_a());
    let presence = powered.handler.icc_presence();
    assert_eq!(response_code(&presence).as_u32(), IFD_ICC_NOT_PRESENT);
    assert_eq!(powered.handler.state(), SlotState::NoTarget);

    let atr = powered.handler.get_capabilities(TAG_IFD_ATR, ATR_CAPACITY);
    assert!(matches!(atr, Err(Error::CardAbsent)));
}

#[rstest]
fn test_power_cycle_with_card_kept(mut powered: Host) {
    powered.handler.power_icc(IFD_POWER_DOWN, ATR_CAPACITY).unwrap();
    powered.handler.icc_presence().unwrap();
    assert_eq!(powered.handler.state(), SlotState::PresentUnpowered);

    let atr = powered.handler.power_icc(IFD_POWER_UP, ATR_CAPACITY).unwrap();
    assert_eq!(atr, CARD_A_ATR);
    assert_eq!(powered.handler.state(), SlotState::PresentPowered);
}

// ============================================================================
// Transmit
// ============================================================================

#[rstest]
fn test_transmit(mut powered: Host) {
    powered
        .reader
        .set_responder(|tx| [tx, &[0x90, 0x00][..]].concat());

    let response = powered.handler.transmit_to_icc(&[0x80, 0xCA], 258).unwrap();
    assert_eq!(response.data, vec![0x80, 0xCA, 0x90, 0x00]);
    assert_eq!(response.protocol, SCARD_PROTOCOL_T1);
    assert_eq!(powered.reader.transmitted(), vec![vec![0x80, 0xCA]]);
}

#[rstest]
fn test_transmit_card_gone(mut powered: Host) {
    powered.reader.remove_target(&card_a());

    let result = powered.handler.transmit_to_icc(&[0x00], 258);
    assert_eq!(response_code(&result).as_u32(), IFD_COMMUNICATION_ERROR);

    let result = powered.handler.transmit_to_icc(&[0x00], 258);
    assert_eq!(response_code(&result).as_u32(), IFD_ICC_NOT_PRESENT);
}

#[rstest]
fn test_transmit_response_too_large(mut powered: Host) {
    powered.reader.set_responder(|_| vec![0; 300]);
    let result = powered.handler.transmit_to_icc(&[0x00], 258);
    assert_eq!(response_code(&result).as_u32(), IFD_COMMUNICATION_ERROR);
    assert_eq!(powered.handler.state(), SlotState::PresentPowered);
}

// ============================================================================
// Channel lifecycle
// ============================================================================

#[rstest]
fn test_close_channel(mut powered: Host) {
    powered.handler.close_channel();
    assert_eq!(powered.handler.state(), SlotState::Disconnected);
    assert!(!powered.reader.is_open());
    assert!(!powered.handler.is_active());
}

#[rstest]
fn test_close_channel_twice(mut host: Host) {
    host.handler.close_channel();
    host.handler.close_channel();
    assert_eq!(host.handler.state(), SlotState::Disconnected);
}

#[test]
fn test_auto_activate_opens_bound_reader() {
    let mut host = Host::new(HandlerConfig::default().with_auto_activate(true));
    host.second.place_target(card_a());
    host.handler.create_channel_by_name("/dev/bus/usb/001/003");

    let atr = host.handler.power_icc(IFD_POWER_UP, ATR_CAPACITY).unwrap();
    assert_eq!(atr, CARD_A_ATR);
    assert!(host.second.is_open());
    assert!(!host.reader.is_open());
}

#[test]
fn test_auto_activate_presence() {
    let mut host = Host::new(HandlerConfig::default().with_auto_activate(true));
    host.reader.place_target(card_a());

    host.handler.icc_presence().unwrap();
    assert_eq!(host.handler.state(), SlotState::PresentPowered);
    assert!(host.reader.is_open());
}

#[test]
fn test_recreating_channel_closes_session() {
    let mut host = Host::new(HandlerConfig::default());
    host.activate();
    assert!(host.reader.is_open());

    host.handler.create_channel(1);
    assert!(!host.handler.is_active());
    assert!(!host.reader.is_open());
}
