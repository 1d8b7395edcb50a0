//! Gateway protocol types
//!
//! Defines opcodes, frame format, close codes, and payload structures for
//! the client side of the gateway connection.

mod close_codes;
mod frame;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use frame::Frame;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ReadyPayload, ResumePayload};
