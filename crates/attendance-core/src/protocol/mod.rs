//! Protocol module containing message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, expect_acknowledgement, ProtocolError};
pub use messages::*;
