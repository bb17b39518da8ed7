use std::{collections::BTreeMap, ops::Bound};

use dirdex_common::{Cursor, Result, error::Error};

use crate::Tuple;

const CURSOR: &str = "table cursor";

#[derive(Debug)]
enum Position {
    BeforeFirst,
    AfterLast,
    OnTuple,
    Before(Vec<u8>),
    After(Vec<u8>),
    Closed,
}

/// Cursor over a key directory (`BTreeMap` from key to some value handle),
/// materializing the value of the current tuple through `load`.
///
/// Every step is a range query on the directory, so the cursor holds no
/// tree state between calls.
pub struct KeyRangeCursor<'a, V, F> {
    directory: &'a BTreeMap<Vec<u8>, V>,
    load: F,
    position: Position,
    current: Tuple,
}

impl<'a, V, F> KeyRangeCursor<'a, V, F>
where
    F: Fn(&[u8], &V) -> std::io::Result<Vec<u8>>,
{
    pub fn new(directory: &'a BTreeMap<Vec<u8>, V>, load: F) -> KeyRangeCursor<'a, V, F> {
        KeyRangeCursor {
            directory,
            load,
            position: Position::BeforeFirst,
            current: Tuple::default(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if matches!(self.position, Position::Closed) {
            return Err(Error::closed(CURSOR));
        }
        Ok(())
    }

    /// Moves onto `found`, or to the boundary state when there is nothing in
    /// that direction.
    fn land(&mut self, found: Option<(&'a Vec<u8>, &'a V)>, forward: bool) -> Result<bool> {
        match found {
            Some((key, handle)) => {
                let value = (self.load)(key.as_slice(), handle)
                    .map_err(|e| Error::io(format!("{CURSOR} value load"), e))?;
                self.current.key.clone_from(key);
                self.current.value = value;
                self.position = Position::OnTuple;
                Ok(true)
            }
            None => {
                self.position = if forward {
                    Position::AfterLast
                } else {
                    Position::BeforeFirst
                };
                Ok(false)
            }
        }
    }
}

impl<'a, V, F> Cursor for KeyRangeCursor<'a, V, F>
where
    F: Fn(&[u8], &V) -> std::io::Result<Vec<u8>>,
{
    type Element = Tuple;

    fn available(&self) -> bool {
        matches!(self.position, Position::OnTuple)
    }

    fn before(&mut self, element: &Tuple) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::Before(element.key.clone());
        Ok(())
    }

    fn after(&mut self, element: &Tuple) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::After(element.key.clone());
        Ok(())
    }

    fn before_first(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::AfterLast;
        Ok(())
    }

    fn first(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let found = self.directory.iter().next();
        self.land(found, false)
    }

    fn last(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let found = self.directory.iter().next_back();
        self.land(found, true)
    }

    fn previous(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let directory = self.directory;
        let found = match &self.position {
            Position::BeforeFirst | Position::Closed => None,
            Position::AfterLast => directory.iter().next_back(),
            Position::OnTuple => directory
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(self.current.key.as_slice())))
                .next_back(),
            Position::Before(key) => directory
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key.as_slice())))
                .next_back(),
            Position::After(key) => directory
                .range::<[u8], _>((Bound::Unbounded, Bound::Included(key.as_slice())))
                .next_back(),
        };
        self.land(found, false)
    }

    fn next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let directory = self.directory;
        let found = match &self.position {
            Position::AfterLast | Position::Closed => None,
            Position::BeforeFirst => directory.iter().next(),
            Position::OnTuple => directory
                .range::<[u8], _>((Bound::Excluded(self.current.key.as_slice()), Bound::Unbounded))
                .next(),
            Position::Before(key) => directory
                .range::<[u8], _>((Bound::Included(key.as_slice()), Bound::Unbounded))
                .next(),
            Position::After(key) => directory
                .range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
                .next(),
        };
        self.land(found, true)
    }

    fn get(&self) -> Result<&Tuple> {
        match self.position {
            Position::OnTuple => Ok(&self.current),
            Position::Closed => Err(Error::closed(CURSOR)),
            _ => Err(Error::invalid_position(CURSOR)),
        }
    }

    fn is_element_reused(&self) -> bool {
        true
    }

    fn close(&mut self) -> Result<()> {
        self.position = Position::Closed;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        matches!(self.position, Position::Closed)
    }
}
