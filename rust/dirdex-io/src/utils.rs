#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            condition,
        ))
    }
}

/// Error returned by every table operation after `close()`.
pub fn table_closed(name: &str) -> std::io::Error {
    std::io::Error::other(format!("table '{name}' has been closed"))
}

/// Reads until `buffer` is full or the reader is exhausted, returning the
/// number of bytes read.
pub fn read_fully<R: std::io::Read>(mut read: R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut pos: usize = 0;
    loop {
        if pos == buffer.len() {
            return Ok(pos);
        }
        match read.read(&mut buffer[pos..]) {
            Ok(0) => return Ok(pos),
            Ok(bytes) => pos += bytes,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::read_fully;

    #[test]
    fn test_read_fully_short_source() {
        let mut buf = [0u8; 8];
        assert_eq!(read_fully(&b"abc"[..], &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(read_fully(&b""[..], &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_verify() {
        fn check(len: usize) -> std::io::Result<()> {
            verify!(len < 4);
            Ok(())
        }
        assert!(check(3).is_ok());
        let err = check(4).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "len < 4");
    }
}
