use crate::tags;

/// FIX field delimiter (start-of-header).
pub const SOH: u8 = 0x01;

/// One parsed FIX message.
///
/// Well-known header and trailer tags land in dedicated slots; everything
/// else is collected in `other_fields` preserving wire order. Values are
/// owned copies made when each field commits, so the message stays valid
/// after the ring buffer bytes it came from are retired.
#[derive(Debug, Default)]
pub struct Message {
    /// Tag 8, e.g. `FIX.4.2`. Any version string is accepted.
    pub begin_string: Vec<u8>,
    /// Tag 9. Parsed and echoed, never validated against the actual body.
    pub body_length: Vec<u8>,
    /// Tag 35, e.g. `A` for Logon.
    pub msg_type: Vec<u8>,
    /// Tag 49.
    pub sender_comp_id: Vec<u8>,
    /// Tag 56.
    pub target_comp_id: Vec<u8>,
    /// Tag 11.
    pub cl_ord_id: Vec<u8>,
    /// Tag 34.
    pub seq_number: Vec<u8>,
    /// Tag 10, three ASCII digits.
    pub check_sum: Vec<u8>,
    /// Every other tag, in wire order.
    pub other_fields: Vec<(u32, Vec<u8>)>,
    /// True exactly once tag 10 has committed.
    pub finished: bool,
    /// Cumulative byte sum over all committed fields except the `10=` field
    /// itself. Carried across parser suspensions.
    pub(crate) running_checksum: u32,
}

impl Message {
    pub fn new() -> Self {
        Message::default()
    }

    /// Store a committed field value. Unknown tags append to `other_fields`.
    pub(crate) fn set_field(&mut self, tag: u32, value: &[u8]) {
        let slot = match tag {
            tags::BEGIN_STRING => &mut self.begin_string,
            tags::BODY_LENGTH => &mut self.body_length,
            tags::MSG_TYPE => &mut self.msg_type,
            tags::SENDER_COMP_ID => &mut self.sender_comp_id,
            tags::TARGET_COMP_ID => &mut self.target_comp_id,
            tags::CL_ORD_ID => &mut self.cl_ord_id,
            tags::MSG_SEQ_NUM => &mut self.seq_number,
            tags::CHECK_SUM => &mut self.check_sum,
            _ => {
                self.other_fields.push((tag, value.to_vec()));
                return;
            }
        };
        slot.clear();
        slot.extend_from_slice(value);
    }

    /// The running checksum modulo 256.
    pub fn computed_checksum(&self) -> u32 {
        self.running_checksum % 256
    }

    /// Clear all fields and parser state for the next message, keeping the
    /// slot allocations.
    pub fn reset(&mut self) {
        self.begin_string.clear();
        self.body_length.clear();
        self.msg_type.clear();
        self.sender_comp_id.clear();
        self.target_comp_id.clear();
        self.cl_ord_id.clear();
        self.seq_number.clear();
        self.check_sum.clear();
        self.other_fields.clear();
        self.finished = false;
        self.running_checksum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedicated_slots_and_other_fields() {
        let mut msg = Message::new();
        msg.set_field(8, b"FIX.4.2");
        msg.set_field(35, b"A");
        msg.set_field(52, b"20250314-15:24:42.191");
        msg.set_field(98, b"0");
        assert_eq!(msg.begin_string, b"FIX.4.2");
        assert_eq!(msg.msg_type, b"A");
        assert_eq!(
            msg.other_fields,
            vec![
                (52, b"20250314-15:24:42.191".to_vec()),
                (98, b"0".to_vec())
            ]
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut msg = Message::new();
        msg.set_field(8, b"FIX.4.2");
        msg.set_field(99, b"x");
        msg.finished = true;
        msg.running_checksum = 123;
        msg.reset();
        assert!(msg.begin_string.is_empty());
        assert!(msg.other_fields.is_empty());
        assert!(!msg.finished);
        assert_eq!(msg.computed_checksum(), 0);
    }

    #[test]
    fn repeated_set_overwrites_slot() {
        let mut msg = Message::new();
        msg.set_field(49, b"FIRST");
        msg.set_field(49, b"SECOND");
        assert_eq!(msg.sender_comp_id, b"SECOND");
    }
}
