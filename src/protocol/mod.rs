//! RESP2 wire protocol
//!
//! Frame types plus the codec used by the TCP server. Nothing here knows
//! about the store or the commands.

mod frame;
mod codec;

pub use frame::{Frame, FrameError};
pub use codec::{decode, encode, encode_to};
