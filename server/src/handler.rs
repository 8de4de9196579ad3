//! Message dispatch.
//!
//! The only message type with a response is Logon (`35=A`), which gets an
//! echo with sender and target swapped. Everything else parses cleanly and
//! is dropped after a log line. The handler never touches the socket; it
//! only appends to the connection's outbound ring.

use bytes::BytesMut;
use protocol_fix::{put_field, tags, Message};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::metrics::LOGONS_ECHOED;

/// Dispatch the finished message on `conn`. Returns `false` when the
/// connection must be closed (the response no longer fits in the outbound
/// ring).
pub fn handle(conn: &mut Connection) -> bool {
    match conn.message.msg_type.as_slice() {
        b"A" => {
            let echo = logon_echo(&conn.message);
            if !conn.queue_response(&echo) {
                warn!(
                    len = echo.len(),
                    free = conn.outbound.free_space(),
                    "outbound ring cannot take logon echo, closing connection"
                );
                return false;
            }
            LOGONS_ECHOED.increment();
            true
        }
        other => {
            debug!(
                msg_type = %String::from_utf8_lossy(other),
                "no handler for message type, dropping"
            );
            true
        }
    }
}

/// Serialize the logon echo.
///
/// Field order: begin string, body length, message type, sequence number,
/// sender (the request's target), target (the request's sender), every
/// other field in original wire order, checksum. Body length and checksum
/// are mirrored verbatim from the request.
pub fn logon_echo(msg: &Message) -> BytesMut {
    let mut out = BytesMut::with_capacity(128);
    put_field(&mut out, tags::BEGIN_STRING, &msg.begin_string);
    put_field(&mut out, tags::BODY_LENGTH, &msg.body_length);
    put_field(&mut out, tags::MSG_TYPE, &msg.msg_type);
    put_field(&mut out, tags::MSG_SEQ_NUM, &msg.seq_number);
    put_field(&mut out, tags::SENDER_COMP_ID, &msg.target_comp_id);
    put_field(&mut out, tags::TARGET_COMP_ID, &msg.sender_comp_id);
    for (tag, value) in &msg.other_fields {
        put_field(&mut out, *tag, value);
    }
    put_field(&mut out, tags::CHECK_SUM, &msg.check_sum);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use io_ring::RingBuffer;
    use protocol_fix::{parse_message, Disposition};

    const LOGON: &[u8] = b"8=FIX.4.2\x019=70\x0135=A\x0134=1\x0149=CLIENT1\x01\
        52=20250314-15:24:42.191\x0156=EXECUTOR\x0198=0\x01108=30\x0110=088\x01";

    const ECHO: &[u8] = b"8=FIX.4.2\x019=70\x0135=A\x0134=1\x0149=EXECUTOR\x01\
        56=CLIENT1\x0152=20250314-15:24:42.191\x0198=0\x01108=30\x0110=088\x01";

    fn parsed_logon() -> Message {
        let mut ring = RingBuffer::with_capacity(4096);
        assert_eq!(ring.extend(LOGON), LOGON.len());
        let mut msg = Message::new();
        assert_eq!(
            parse_message(&mut ring, &mut msg),
            Ok(Disposition::Finished)
        );
        msg
    }

    #[test]
    fn logon_echo_swaps_comp_ids_and_mirrors_trailer() {
        let msg = parsed_logon();
        assert_eq!(&logon_echo(&msg)[..], ECHO);
    }

    #[test]
    fn logon_echo_is_idempotent() {
        let msg = parsed_logon();
        assert_eq!(logon_echo(&msg), logon_echo(&msg));
    }

    #[test]
    fn handle_queues_echo_for_logon() {
        let mut conn = Connection::new(4096);
        conn.message = parsed_logon();
        assert!(handle(&mut conn));
        assert!(conn.has_pending_write());
        let (a, b) = conn.outbound.read_views();
        assert!(b.is_empty());
        assert_eq!(a, ECHO);
    }

    #[test]
    fn handle_ignores_other_message_types() {
        let mut conn = Connection::new(4096);
        conn.message = parsed_logon();
        conn.message.msg_type = b"D".to_vec();
        assert!(handle(&mut conn));
        assert!(!conn.has_pending_write());
    }

    #[test]
    fn handle_closes_when_echo_does_not_fit() {
        let mut conn = Connection::new(16);
        conn.message = parsed_logon();
        assert!(!handle(&mut conn));
        assert!(!conn.has_pending_write());
    }
}
