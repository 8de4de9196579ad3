use thiserror::Error;

/// Connection-fatal parse failures.
///
/// None of these are recoverable: the stream position after a malformed
/// field is undefined, so the caller closes the connection rather than
/// attempting to resynchronize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A non-digit byte appeared in a tag before the `=` separator, or the
    /// tag was empty or absurdly long.
    #[error("invalid tag")]
    InvalidTag,

    /// The `10=` field value was not exactly three ASCII digits.
    #[error("malformed checksum field")]
    InvalidChecksumField,

    /// The running byte sum disagrees with the declared checksum.
    #[error("checksum mismatch: computed {computed}, declared {declared}")]
    ChecksumMismatch { computed: u32, declared: u32 },
}
