pub mod codec;
pub mod message;

pub use codec::{ControlClientCodec, ControlCodec};
pub use message::{ControlRequest, ControlResponse};
