//! On-disk frame layout of the table log.
//!
//! ```text
//! [op: u8][key_len: u32 BE][value_len: u32 BE][key][value][xxh3(header..value): u64 BE]
//! ```

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use dirdex_io::{utils::read_fully, verify};
use xxhash_rust::xxh3::xxh3_64;

pub const HEADER_SIZE: usize = 9;
pub const CHECKSUM_SIZE: usize = 8;

/// Largest key or value a frame can hold.
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOp {
    Put = 1,
    Remove = 2,
}

impl FrameOp {
    fn from_u8(op: u8) -> Option<FrameOp> {
        match op {
            1 => Some(FrameOp::Put),
            2 => Some(FrameOp::Remove),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub op: FrameOp,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Frame {
    pub fn encoded_len(&self) -> u64 {
        frame_len(self.key.len(), self.value.len())
    }
}

#[derive(Debug)]
pub enum ReadOutcome {
    Frame(Frame),
    /// Clean end of the log at a frame boundary.
    End,
    /// The log ends inside a frame.
    Torn,
}

pub fn frame_len(key_len: usize, value_len: usize) -> u64 {
    (HEADER_SIZE + key_len + value_len + CHECKSUM_SIZE) as u64
}

pub fn encode(op: FrameOp, key: &[u8], value: &[u8]) -> std::io::Result<Vec<u8>> {
    verify!(key.len() <= MAX_FIELD_LEN);
    verify!(value.len() <= MAX_FIELD_LEN);
    let mut buf = Vec::with_capacity(frame_len(key.len(), value.len()) as usize);
    buf.write_u8(op as u8)?;
    buf.write_u32::<BigEndian>(key.len() as u32)?;
    buf.write_u32::<BigEndian>(value.len() as u32)?;
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    let checksum = xxh3_64(&buf);
    buf.write_u64::<BigEndian>(checksum)?;
    Ok(buf)
}

/// Reads the next frame, given the number of bytes left in the log.
///
/// # Errors
///
/// `InvalidData` for an unknown op code or a checksum mismatch. A frame that
/// would extend past `remaining` is reported as [`ReadOutcome::Torn`].
pub fn read_frame<R: Read>(reader: &mut R, remaining: u64) -> std::io::Result<ReadOutcome> {
    let mut header = [0u8; HEADER_SIZE];
    let n = read_fully(&mut *reader, &mut header)?;
    if n == 0 {
        return Ok(ReadOutcome::End);
    }
    if n < HEADER_SIZE {
        return Ok(ReadOutcome::Torn);
    }

    let mut fields = &header[..];
    let op = fields.read_u8()?;
    let key_len = fields.read_u32::<BigEndian>()? as usize;
    let value_len = fields.read_u32::<BigEndian>()? as usize;
    let Some(op) = FrameOp::from_u8(op) else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown table log op code {op}"),
        ));
    };
    if frame_len(key_len, value_len) > remaining {
        return Ok(ReadOutcome::Torn);
    }

    let mut body = vec![0u8; key_len + value_len];
    reader.read_exact(&mut body)?;
    let stored = reader.read_u64::<BigEndian>()?;

    let mut hasher = xxhash_rust::xxh3::Xxh3::new();
    hasher.update(&header);
    hasher.update(&body);
    if hasher.digest() != stored {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "table log frame checksum mismatch",
        ));
    }

    let value = body.split_off(key_len);
    Ok(ReadOutcome::Frame(Frame {
        op,
        key: body,
        value,
    }))
}

#[cfg(test)]
mod tests {
    use super::{FrameOp, ReadOutcome, encode, read_frame};

    #[test]
    fn test_frame_layout() {
        let buf = encode(FrameOp::Put, b"ab", b"xyz").unwrap();
        assert_eq!(buf.len(), 9 + 2 + 3 + 8);
        assert_eq!(&buf[..9], &[1, 0, 0, 0, 2, 0, 0, 0, 3]);
        assert_eq!(&buf[9..14], b"abxyz");
    }

    #[test]
    fn test_read_back() {
        let mut log = encode(FrameOp::Put, b"k", b"v").unwrap();
        log.extend(encode(FrameOp::Remove, b"k", b"").unwrap());
        let total = log.len() as u64;
        let mut reader = &log[..];

        let ReadOutcome::Frame(first) = read_frame(&mut reader, total).unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(first.op, FrameOp::Put);
        assert_eq!((first.key.as_slice(), first.value.as_slice()), (&b"k"[..], &b"v"[..]));
        let remaining = total - first.encoded_len();
        let ReadOutcome::Frame(second) = read_frame(&mut reader, remaining).unwrap() else {
            panic!("expected frame");
        };
        assert_eq!(second.op, FrameOp::Remove);
        assert!(matches!(read_frame(&mut reader, 0).unwrap(), ReadOutcome::End));
    }

    #[test]
    fn test_torn_and_corrupt() {
        let log = encode(FrameOp::Put, b"key", b"value").unwrap();
        for cut in [1, 8, 9, 12, log.len() - 1] {
            let mut reader = &log[..cut];
            let outcome = read_frame(&mut reader, cut as u64).unwrap();
            assert!(matches!(outcome, ReadOutcome::Torn), "cut at {cut}");
        }

        let mut corrupt = log.clone();
        corrupt[10] ^= 0xff;
        let err = read_frame(&mut &corrupt[..], corrupt.len() as u64).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

        let mut bad_op = log;
        bad_op[0] = 7;
        let err = read_frame(&mut &bad_op[..], bad_op.len() as u64).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
