//! Per-connection state.

use io_ring::RingBuffer;
use protocol_fix::Message;

/// One client connection: an inbound ring the socket reads into, an
/// outbound ring the socket writes from, and the message currently being
/// parsed. Owned exclusively by one worker; created when the worker picks
/// the fd off its handoff pipe and destroyed on peer close, socket error,
/// or parse error.
pub struct Connection {
    pub inbound: RingBuffer,
    pub outbound: RingBuffer,
    pub message: Message,
}

impl Connection {
    pub fn new(buffer_capacity: usize) -> Self {
        Connection {
            inbound: RingBuffer::with_capacity(buffer_capacity),
            outbound: RingBuffer::with_capacity(buffer_capacity),
            message: Message::new(),
        }
    }

    /// Queue a complete response into the outbound ring.
    ///
    /// Returns `false` without writing anything when the response does not
    /// fit; a half-queued message would corrupt the stream, so the caller
    /// closes the connection instead.
    pub fn queue_response(&mut self, bytes: &[u8]) -> bool {
        if self.outbound.free_space() < bytes.len() {
            return false;
        }
        self.outbound.extend(bytes) == bytes.len()
    }

    #[inline]
    pub fn has_pending_write(&self) -> bool {
        !self.outbound.is_empty()
    }
}
