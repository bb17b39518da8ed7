//! Conversions between index values and the byte strings stored in tables.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use dirdex_avl::{AvlTree, NaturalOrder};
use dirdex_common::{Result, error::Error, verify_arg, verify_data};

/// Converts values of type `T` to and from bytes.
///
/// For values used as index keys, the byte order of serialized values is the
/// order in which the index sorts them.
pub trait Marshaller<T> {
    fn serialize(&self, value: &T) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
}

/// 8-byte big-endian `u64`; byte order matches numeric order.
#[derive(Debug, Default, Clone, Copy)]
pub struct U64Marshaller;

impl Marshaller<u64> for U64Marshaller {
    fn serialize(&self, value: &u64) -> Result<Vec<u8>> {
        Ok(value.to_be_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u64> {
        verify_data!(bytes, bytes.len() == 8);
        Ok(BigEndian::read_u64(bytes))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BytesMarshaller;

impl Marshaller<Vec<u8>> for BytesMarshaller {
    fn serialize(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringMarshaller;

impl Marshaller<String> for StringMarshaller {
    fn serialize(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::invalid_format("string", e.to_string()))
    }
}

/// Largest element count or element length a `u32` prefix can carry.
const MAX_PREFIXED_LEN: usize = u32::MAX as usize;

/// Serializes a duplicate set as a `u32` BE element count followed by each
/// element, ascending, as a `u32` BE length and the element bytes.
///
/// Deserialization rebuilds the tree in linear time from the sorted run and
/// rejects runs that are not strictly ascending.
#[derive(Debug, Default, Clone, Copy)]
pub struct AvlTreeMarshaller<M> {
    element: M,
}

impl<M> AvlTreeMarshaller<M> {
    pub fn new(element: M) -> AvlTreeMarshaller<M> {
        AvlTreeMarshaller { element }
    }
}

impl<D, M> Marshaller<AvlTree<D>> for AvlTreeMarshaller<M>
where
    D: Ord,
    M: Marshaller<D>,
{
    fn serialize(&self, tree: &AvlTree<D>) -> Result<Vec<u8>> {
        verify_arg!(tree, tree.len() <= MAX_PREFIXED_LEN);
        let mut buf = Vec::new();
        buf.extend_from_slice(&(tree.len() as u32).to_be_bytes());
        for element in tree.iter() {
            let bytes = self.element.serialize(element)?;
            verify_arg!(element, bytes.len() <= MAX_PREFIXED_LEN);
            buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            buf.extend_from_slice(&bytes);
        }
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<AvlTree<D>> {
        let mut rest = bytes;
        let count = rest.read_u32::<BigEndian>().map_err(truncated)? as usize;
        verify_data!(count, count <= rest.len() / 4);
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let len = rest.read_u32::<BigEndian>().map_err(truncated)? as usize;
            verify_data!(len, len <= rest.len());
            let (element, tail) = rest.split_at(len);
            items.push(self.element.deserialize(element)?);
            rest = tail;
        }
        verify_data!(rest, rest.is_empty());
        AvlTree::from_sorted(NaturalOrder, items)
            .map_err(|e| Error::invalid_format("duplicate set", e.to_string()))
    }
}

fn truncated(e: std::io::Error) -> Error {
    Error::invalid_format("duplicate set", e.to_string())
}

#[cfg(test)]
mod tests {
    use dirdex_avl::AvlTree;

    use super::{AvlTreeMarshaller, Marshaller, StringMarshaller, U64Marshaller};

    #[test]
    fn test_u64_order_preserving() {
        let m = U64Marshaller;
        let a = m.serialize(&255).unwrap();
        let b = m.serialize(&256).unwrap();
        assert!(a < b);
        assert_eq!(a, vec![0, 0, 0, 0, 0, 0, 0, 255]);
        assert_eq!(m.deserialize(&b).unwrap(), 256);
        assert!(m.deserialize(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_string() {
        let m = StringMarshaller;
        assert_eq!(m.serialize(&"cn".to_string()).unwrap(), b"cn");
        assert_eq!(m.deserialize("ou=ü".as_bytes()).unwrap(), "ou=ü");
        assert!(m.deserialize(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_tree_layout() {
        let m = AvlTreeMarshaller::new(U64Marshaller);
        let tree = AvlTree::from_iter([9u64, 2]);
        let bytes = m.serialize(&tree).unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 8]);
        assert_eq!(&bytes[8..16], &2u64.to_be_bytes());
        assert_eq!(bytes.len(), 4 + 2 * (4 + 8));

        let back: AvlTree<u64> = m.deserialize(&bytes).unwrap();
        assert_eq!(back.iter().copied().collect::<Vec<_>>(), vec![2, 9]);
    }

    #[test]
    fn test_tree_rejects_bad_input() {
        let m = AvlTreeMarshaller::new(U64Marshaller);
        let bytes = m.serialize(&AvlTree::from_iter([1u64, 2, 3])).unwrap();
        let deserialize = |b: &[u8]| -> dirdex_common::Result<AvlTree<u64>> { m.deserialize(b) };

        assert!(deserialize(&bytes[..bytes.len() - 1]).is_err());
        assert!(deserialize(&[]).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(deserialize(&trailing).is_err());

        // Swap the first two elements so the run is no longer ascending.
        let mut swapped = bytes.clone();
        swapped[8..16].copy_from_slice(&2u64.to_be_bytes());
        swapped[20..28].copy_from_slice(&1u64.to_be_bytes());
        let err = deserialize(&swapped).unwrap_err();
        assert!(err.to_string().contains("duplicate set"));

        let mut huge_count = bytes;
        huge_count[..4].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(deserialize(&huge_count).is_err());
    }

    #[test]
    fn test_empty_tree() {
        let m = AvlTreeMarshaller::new(U64Marshaller);
        let bytes = m.serialize(&AvlTree::<u64>::new()).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let back: AvlTree<u64> = m.deserialize(&bytes).unwrap();
        assert!(back.is_empty());
    }

    /// Refuses to encode zero.
    struct NonZero;

    impl Marshaller<u64> for NonZero {
        fn serialize(&self, value: &u64) -> dirdex_common::Result<Vec<u8>> {
            dirdex_common::verify_arg!(value, *value != 0);
            U64Marshaller.serialize(value)
        }

        fn deserialize(&self, bytes: &[u8]) -> dirdex_common::Result<u64> {
            U64Marshaller.deserialize(bytes)
        }
    }

    #[test]
    fn test_tree_propagates_element_errors() {
        let m = AvlTreeMarshaller::new(NonZero);
        assert!(m.serialize(&AvlTree::from_iter([1u64, 2])).is_ok());
        let err = m.serialize(&AvlTree::from_iter([0u64, 1])).unwrap_err();
        assert!(matches!(
            err.kind(),
            dirdex_common::error::ErrorKind::InvalidArgument { .. }
        ));
    }
}
