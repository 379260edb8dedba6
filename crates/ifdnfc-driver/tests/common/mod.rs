//! Shared helpers for driver integration tests.

#![allow(dead_code)]

use ifdnfc_core::constants::{IFDNFC_CTRL_ACTIVE, IFDNFC_IS_ACTIVE, IFDNFC_IS_INACTIVE};
use ifdnfc_core::{ConnString, Target};
use ifdnfc_driver::{HandlerConfig, IfdHandler};
use ifdnfc_hardware::Backend;
use ifdnfc_hardware::mock::{MockBus, MockNfcHandle};
use ifdnfc_protocol::{ControlRequest, ControlResponse};

pub const READER: &str = "usb:001:002";
pub const SECOND_READER: &str = "usb:001:003";

/// Control response buffer large enough for any connection string.
pub const CONTROL_CAPACITY: usize = 1 + 2 + 1024;

/// Host ATR buffer size.
pub const ATR_CAPACITY: usize = 33;

/// Type A card with historical bytes AA BB.
pub fn card_a() -> Target {
    Target::type_a(vec![0x04, 0x11, 0x22, 0x33], vec![0x00, 0xAA, 0xBB]).unwrap()
}

pub const CARD_A_ATR: [u8; 7] = [0x3B, 0x82, 0x80, 0x01, 0xAA, 0xBB, 0x12];

pub fn card_b() -> Target {
    Target::type_b([0xA1, 0xA2, 0xA3, 0xA4], [0; 4], [0x00, 0x81, 0x71])
}

pub fn conn(s: &str) -> ConnString {
    ConnString::new(s).unwrap()
}

/// Handler over a bus with two readers attached.
pub struct Host {
    pub handler: IfdHandler,
    pub reader: MockNfcHandle,
    pub second: MockNfcHandle,
}

impl Host {
    pub fn new(config: HandlerConfig) -> Self {
        let mut bus = MockBus::new();
        let reader = bus.attach(conn(READER));
        let second = bus.attach(conn(SECOND_READER));
        let mut handler = IfdHandler::new(Backend::Mock(bus), config);
        handler.create_channel(0);
        Self {
            handler,
            reader,
            second,
        }
    }

    pub fn control(&mut self, request: &ControlRequest) -> ControlResponse {
        let bytes = self
            .handler
            .control(IFDNFC_CTRL_ACTIVE, &request.to_bytes(), CONTROL_CAPACITY)
            .unwrap();
        ControlResponse::decode(&bytes).unwrap()
    }

    pub fn activate(&mut self) -> ControlResponse {
        self.control(&ControlRequest::SetActive(Some(conn(READER))))
    }

    pub fn status(&mut self) -> ControlResponse {
        self.control(&ControlRequest::GetStatus)
    }
}

pub fn is_active_tag(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(&IFDNFC_IS_ACTIVE) => true,
        Some(&IFDNFC_IS_INACTIVE) => false,
        other => panic!("unexpected status byte {other:?}"),
    }
}
