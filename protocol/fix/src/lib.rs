//! FIX 4.x tag=value framing.
//!
//! This crate parses SOH-delimited FIX messages incrementally out of an
//! [`io_ring::RingBuffer`]: the parser commits one complete field at a time,
//! consuming its bytes from the ring and carrying a running checksum across
//! suspensions, so arbitrarily chunked socket reads parse to the same result
//! as an atomic parse.
//!
//! Field values are copied into the [`Message`] when the field's terminating
//! SOH is seen, so a finished message never borrows from the ring and the
//! ring stays available to the socket while the message is handled.

mod error;
mod message;
mod parser;

pub use error::ParseError;
pub use message::{Message, SOH};
pub use parser::{parse_message, Disposition};

use bytes::BytesMut;

/// Well-known FIX tag numbers handled with dedicated message slots.
pub mod tags {
    pub const BEGIN_STRING: u32 = 8;
    pub const BODY_LENGTH: u32 = 9;
    pub const CHECK_SUM: u32 = 10;
    pub const CL_ORD_ID: u32 = 11;
    pub const MSG_SEQ_NUM: u32 = 34;
    pub const MSG_TYPE: u32 = 35;
    pub const SENDER_COMP_ID: u32 = 49;
    pub const TARGET_COMP_ID: u32 = 56;
}

/// Append one `<tag>=<value>SOH` field to a wire buffer.
pub fn put_field(buf: &mut BytesMut, tag: u32, value: &[u8]) {
    let mut digits = [0u8; 10];
    let mut i = digits.len();
    let mut t = tag;
    loop {
        i -= 1;
        digits[i] = b'0' + (t % 10) as u8;
        t /= 10;
        if t == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
    buf.extend_from_slice(b"=");
    buf.extend_from_slice(value);
    buf.extend_from_slice(&[SOH]);
}
