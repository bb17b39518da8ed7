//! Redirect markers: the 16-byte value stored in a table slot whose
//! duplicate set has moved to an overflow record.
//!
//! ```text
//! bytes 0..8   ASCII "redirect"
//! bytes 8..16  overflow record id, u64 big-endian
//! ```

use dirdex_common::{Result, error::Error};

use crate::marshaller::Marshaller;

/// Reference to an overflow record holding a duplicate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Redirect {
    record_id: u64,
}

impl Redirect {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16;

    pub const TAG: &'static [u8; 8] = b"redirect";

    pub fn new(record_id: u64) -> Redirect {
        Redirect { record_id }
    }

    pub fn record_id(&self) -> u64 {
        self.record_id
    }

    pub fn to_bytes(&self) -> [u8; Redirect::SIZE] {
        let mut bytes = [0u8; Redirect::SIZE];
        bytes[..8].copy_from_slice(Redirect::TAG);
        bytes[8..].copy_from_slice(&self.record_id.to_be_bytes());
        bytes
    }

    /// Decodes a marker.
    ///
    /// # Errors
    ///
    /// `MalformedRedirect` if `bytes` is not exactly 16 bytes long or does
    /// not start with the `redirect` tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Redirect> {
        if bytes.len() != Redirect::SIZE || &bytes[..8] != Redirect::TAG {
            return Err(Error::malformed_redirect(bytes));
        }
        let record_id = bytes[8..]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        Ok(Redirect { record_id })
    }
}

/// Returns `true` unless `bytes` is a well-formed redirect marker.
///
/// Holds exactly when [`Redirect::from_bytes`] would fail, so callers can
/// cheaply tell inline slot contents from redirects.
pub fn is_not_redirect(bytes: Option<&[u8]>) -> bool {
    match bytes {
        None => true,
        Some(bytes) => bytes.len() != Redirect::SIZE || &bytes[..8] != Redirect::TAG,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RedirectMarshaller;

impl Marshaller<Redirect> for RedirectMarshaller {
    fn serialize(&self, value: &Redirect) -> Result<Vec<u8>> {
        Ok(value.to_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Redirect> {
        Redirect::from_bytes(bytes)
    }
}
