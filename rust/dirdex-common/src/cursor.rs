//! The bidirectional cursor contract shared by in-memory containers and
//! persistent tables.
//!
//! A cursor is always in exactly one of the following positions:
//!
//! - *before first*: unavailable; `next()` lands on the smallest element.
//! - *after last*: unavailable; `previous()` lands on the largest element.
//! - *on element*: `available()` is `true` and `get()` returns the element.
//! - *pending*: unavailable, anchored between two adjacent elements by
//!   [`Cursor::before`] or [`Cursor::after`]; the next `next()`/`previous()`
//!   call lands on the element on the respective side of the anchor.
//! - *closed*: terminal, every navigation call fails with a `Closed` error.
//!
//! Running off either end of the sequence is not an error: `next()` and
//! `previous()` return `Ok(false)` and leave the cursor after last / before
//! first respectively. Errors are reserved for misuse (`get()` while not
//! positioned, any call after `close()`) and for failures of the underlying
//! storage.

use crate::Result;

/// Bidirectional, positional navigation over an ordered sequence of elements.
pub trait Cursor {
    /// The element type produced by [`get`](Cursor::get).
    type Element;

    /// Returns `true` if the cursor is positioned on an element.
    fn available(&self) -> bool;

    /// Positions the cursor immediately before the smallest element that is
    /// greater than or equal to `element`. The element does not need to be
    /// present. The cursor is not available until the next `next()` or
    /// `previous()` call.
    fn before(&mut self, element: &Self::Element) -> Result<()>;

    /// Positions the cursor immediately after the largest element that is
    /// less than or equal to `element`. The element does not need to be
    /// present. The cursor is not available until the next `next()` or
    /// `previous()` call.
    fn after(&mut self, element: &Self::Element) -> Result<()>;

    /// Positions the cursor before the first element.
    fn before_first(&mut self) -> Result<()>;

    /// Positions the cursor after the last element.
    fn after_last(&mut self) -> Result<()>;

    /// Positions the cursor on the first element, returning `false` if there
    /// is none.
    fn first(&mut self) -> Result<bool>;

    /// Positions the cursor on the last element, returning `false` if there
    /// is none.
    fn last(&mut self) -> Result<bool>;

    /// Moves one element back in sort order.
    fn previous(&mut self) -> Result<bool>;

    /// Moves one element forward in sort order.
    fn next(&mut self) -> Result<bool>;

    /// Returns the element at the current position.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidPosition` when the cursor is not
    /// [`available`](Cursor::available), and with `Closed` after
    /// [`close`](Cursor::close).
    fn get(&self) -> Result<&Self::Element>;

    /// Whether the reference returned by [`get`](Cursor::get) may point into
    /// storage that is reused by the next positioning call. When `true`,
    /// callers that need the element past that point must copy it.
    fn is_element_reused(&self) -> bool;

    /// Closes the cursor, releasing any resources. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Returns `true` once [`close`](Cursor::close) has been called.
    fn is_closed(&self) -> bool;

    /// Adapts the cursor into an iterator over cloned elements, starting
    /// from the cursor's current position.
    fn iter(&mut self) -> CursorIter<'_, Self>
    where
        Self: Sized,
        Self::Element: Clone,
    {
        CursorIter { cursor: self }
    }
}

/// Forward iterator over a [`Cursor`], yielding owned copies of the
/// elements.
///
/// Each call to `next()` advances the cursor by one step. A storage failure
/// is yielded once as `Some(Err(_))`.
pub struct CursorIter<'a, C: Cursor> {
    cursor: &'a mut C,
}

impl<C> Iterator for CursorIter<'_, C>
where
    C: Cursor,
    C::Element: Clone,
{
    type Item = Result<C::Element>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next() {
            Ok(true) => Some(self.cursor.get().cloned()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Element = C::Element;

    fn available(&self) -> bool {
        (**self).available()
    }

    fn before(&mut self, element: &Self::Element) -> Result<()> {
        (**self).before(element)
    }

    fn after(&mut self, element: &Self::Element) -> Result<()> {
        (**self).after(element)
    }

    fn before_first(&mut self) -> Result<()> {
        (**self).before_first()
    }

    fn after_last(&mut self) -> Result<()> {
        (**self).after_last()
    }

    fn first(&mut self) -> Result<bool> {
        (**self).first()
    }

    fn last(&mut self) -> Result<bool> {
        (**self).last()
    }

    fn previous(&mut self) -> Result<bool> {
        (**self).previous()
    }

    fn next(&mut self) -> Result<bool> {
        (**self).next()
    }

    fn get(&self) -> Result<&Self::Element> {
        (**self).get()
    }

    fn is_element_reused(&self) -> bool {
        (**self).is_element_reused()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;
    use crate::{Result, error::Error};

    /// Minimal cursor over a sorted slice, used to exercise the iterator
    /// adapter independently of any container.
    struct SliceCursor {
        items: Vec<u32>,
        // `None` before first, `Some(len)` after last.
        pos: Option<usize>,
        closed: bool,
    }

    impl Cursor for SliceCursor {
        type Element = u32;

        fn available(&self) -> bool {
            matches!(self.pos, Some(i) if i < self.items.len())
        }

        fn before(&mut self, element: &u32) -> Result<()> {
            let idx = self.items.partition_point(|x| x < element);
            self.pos = idx.checked_sub(1);
            Ok(())
        }

        fn after(&mut self, element: &u32) -> Result<()> {
            let idx = self.items.partition_point(|x| x <= element);
            self.pos = idx.checked_sub(1);
            Ok(())
        }

        fn before_first(&mut self) -> Result<()> {
            self.pos = None;
            Ok(())
        }

        fn after_last(&mut self) -> Result<()> {
            self.pos = Some(self.items.len());
            Ok(())
        }

        fn first(&mut self) -> Result<bool> {
            self.before_first()?;
            self.next()
        }

        fn last(&mut self) -> Result<bool> {
            self.after_last()?;
            self.previous()
        }

        fn previous(&mut self) -> Result<bool> {
            self.pos = match self.pos {
                None | Some(0) => None,
                Some(i) => Some(i - 1),
            };
            Ok(self.pos.is_some())
        }

        fn next(&mut self) -> Result<bool> {
            if self.closed {
                return Err(Error::closed("slice cursor"));
            }
            let next = self.pos.map_or(0, |i| (i + 1).min(self.items.len()));
            self.pos = Some(next);
            Ok(next < self.items.len())
        }

        fn get(&self) -> Result<&u32> {
            match self.pos {
                Some(i) if i < self.items.len() => Ok(&self.items[i]),
                _ => Err(Error::invalid_position("slice cursor")),
            }
        }

        fn is_element_reused(&self) -> bool {
            false
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    fn cursor(items: &[u32]) -> SliceCursor {
        SliceCursor {
            items: items.to_vec(),
            pos: None,
            closed: false,
        }
    }

    #[test]
    fn test_iter_from_start() {
        let mut c = cursor(&[1, 4, 9]);
        let items = c.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(items, vec![1, 4, 9]);
        assert!(!c.available());
    }

    #[test]
    fn test_iter_from_anchor() {
        let mut c = cursor(&[1, 4, 9, 16]);
        c.after(&4).unwrap();
        let items = c.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(items, vec![9, 16]);
    }

    #[test]
    fn test_iter_surfaces_errors() {
        let mut c = cursor(&[1, 2]);
        c.close().unwrap();
        let mut it = c.iter();
        assert!(it.next().unwrap().unwrap_err().is_closed());
    }

    #[test]
    fn test_boxed_cursor() {
        let mut c: Box<dyn Cursor<Element = u32>> = Box::new(cursor(&[3, 5]));
        assert!(c.last().unwrap());
        assert_eq!(*c.get().unwrap(), 5);
        assert!(!c.is_element_reused());
    }
}
