//! Server metrics.
//!
//! Plain metriken statics; there is no exposition endpoint, but the
//! registry keeps the hot-path counters cheap and nameable.

use metriken::{metric, Counter, Gauge};

#[metric(
    name = "connections_accepted",
    description = "Total number of connections accepted"
)]
pub static CONNECTIONS_ACCEPTED: Counter = Counter::new();

#[metric(
    name = "connections_active",
    description = "Number of currently active connections"
)]
pub static CONNECTIONS_ACTIVE: Gauge = Gauge::new();

#[metric(
    name = "connections_dropped",
    description = "Accepted connections dropped because pipe handoff failed"
)]
pub static CONNECTIONS_DROPPED: Counter = Counter::new();

#[metric(name = "messages_parsed", description = "Complete FIX messages parsed")]
pub static MESSAGES_PARSED: Counter = Counter::new();

#[metric(name = "logons_echoed", description = "Logon echoes queued for send")]
pub static LOGONS_ECHOED: Counter = Counter::new();

#[metric(name = "parse_errors", description = "Connections closed on parse errors")]
pub static PARSE_ERRORS: Counter = Counter::new();

#[metric(name = "bytes_received", description = "Bytes read off client sockets")]
pub static BYTES_RECEIVED: Counter = Counter::new();

#[metric(name = "bytes_sent", description = "Bytes written to client sockets")]
pub static BYTES_SENT: Counter = Counter::new();
