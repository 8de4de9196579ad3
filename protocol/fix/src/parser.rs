use std::borrow::Cow;

use io_ring::RingBuffer;

use crate::{tags, Message, ParseError, SOH};

/// Outcome of one parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A complete, checksum-valid message is resident in the `Message`; its
    /// bytes have been consumed from the ring through the SOH terminating
    /// the `10=` field.
    Finished,
    /// The input is a prefix of one or more valid messages. Every fully
    /// parsed field has been consumed; bytes of a partial field remain in
    /// the ring and are re-scanned once more data arrives.
    NeedMore,
}

/// Logical view over the two contiguous readable runs of a ring buffer,
/// addressed as one byte sequence. Lets a field straddle the wrap boundary.
struct Runs<'a> {
    a: &'a [u8],
    b: &'a [u8],
}

impl<'a> Runs<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.a.len() + self.b.len()
    }

    #[inline]
    fn at(&self, i: usize) -> u8 {
        if i < self.a.len() {
            self.a[i]
        } else {
            self.b[i - self.a.len()]
        }
    }

    /// Position of the first `byte` at or after `from`.
    fn find(&self, from: usize, byte: u8) -> Option<usize> {
        let alen = self.a.len();
        if from < alen {
            if let Some(p) = self.a[from..].iter().position(|&c| c == byte) {
                return Some(from + p);
            }
            return self.b.iter().position(|&c| c == byte).map(|p| alen + p);
        }
        self.b[from - alen..]
            .iter()
            .position(|&c| c == byte)
            .map(|p| from + p)
    }

    /// Byte sum over `[0, end)`.
    fn sum_prefix(&self, end: usize) -> u32 {
        let alen = self.a.len();
        if end <= alen {
            self.a[..end].iter().map(|&c| c as u32).sum()
        } else {
            self.a.iter().map(|&c| c as u32).sum::<u32>()
                + self.b[..end - alen].iter().map(|&c| c as u32).sum::<u32>()
        }
    }

    /// The bytes in `[start, end)`, borrowed when they lie within one run.
    fn extract(&self, start: usize, end: usize) -> Cow<'a, [u8]> {
        let alen = self.a.len();
        if end <= alen {
            Cow::Borrowed(&self.a[start..end])
        } else if start >= alen {
            Cow::Borrowed(&self.b[start - alen..end - alen])
        } else {
            let mut v = Vec::with_capacity(end - start);
            v.extend_from_slice(&self.a[start..]);
            v.extend_from_slice(&self.b[..end - alen]);
            Cow::Owned(v)
        }
    }
}

/// Incrementally parse FIX fields out of `ring` into `msg`.
///
/// Commits one complete `<tag>=<value>SOH` field at a time: the field's
/// value is copied into `msg`, its bytes are consumed from the ring, and the
/// running checksum advances by every byte of the field including `=` and
/// the SOH. The checksum stops accumulating at the first byte of the `10=`
/// field, matching the standard FIX trailer rule.
///
/// Returns [`Disposition::Finished`] once tag 10 commits with a matching
/// checksum; the caller handles the message and calls [`Message::reset`]
/// before the next parse. Errors are connection-fatal and leave the ring in
/// an unspecified position.
pub fn parse_message(ring: &mut RingBuffer, msg: &mut Message) -> Result<Disposition, ParseError> {
    loop {
        let field_len = {
            let (a, b) = ring.read_views();
            let runs = Runs { a, b };
            if runs.len() == 0 {
                return Ok(Disposition::NeedMore);
            }

            // Tag: ASCII digits up to '='.
            let mut tag: u32 = 0;
            let mut i = 0;
            loop {
                if i == runs.len() {
                    return Ok(Disposition::NeedMore);
                }
                match runs.at(i) {
                    b'=' if i > 0 => break,
                    c @ b'0'..=b'9' => {
                        tag = tag
                            .checked_mul(10)
                            .and_then(|t| t.checked_add(u32::from(c - b'0')))
                            .ok_or(ParseError::InvalidTag)?;
                    }
                    _ => return Err(ParseError::InvalidTag),
                }
                i += 1;
            }

            // Value: everything up to the next SOH.
            let val_start = i + 1;
            let soh = match runs.find(val_start, SOH) {
                Some(p) => p,
                None => return Ok(Disposition::NeedMore),
            };
            let field_len = soh + 1;

            if tag == tags::CHECK_SUM {
                if soh - val_start != 3 {
                    return Err(ParseError::InvalidChecksumField);
                }
                let mut declared: u32 = 0;
                for j in val_start..soh {
                    let c = runs.at(j);
                    if !c.is_ascii_digit() {
                        return Err(ParseError::InvalidChecksumField);
                    }
                    declared = declared * 10 + u32::from(c - b'0');
                }
                let computed = msg.running_checksum % 256;
                if computed != declared {
                    return Err(ParseError::ChecksumMismatch { computed, declared });
                }
                let value = runs.extract(val_start, soh);
                msg.set_field(tag, &value);
                msg.finished = true;
            } else {
                msg.running_checksum =
                    (msg.running_checksum + runs.sum_prefix(field_len)) % 256;
                let value = runs.extract(val_start, soh);
                msg.set_field(tag, &value);
            }

            field_len
        };

        ring.consume(field_len);
        if msg.finished {
            return Ok(Disposition::Finished);
        }
    }
}
