//! Log-structured file table.
//!
//! Every mutation appends one [`frame`] to a single log file. An in-memory
//! key directory maps each live key to the position of its latest value,
//! which is read positionally on demand. Opening a table replays the log to
//! rebuild the directory; a partially written final frame (the result of a
//! crash mid-append) is cut off. Superseded frames stay in the log until
//! [`FileTable::compact`] rewrites it.

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use dirdex_common::Cursor;
use dirdex_io::{KeyRangeCursor, Table, Tuple, file::file_read_vec_at, utils::table_closed};

use frame::{FrameOp, HEADER_SIZE, ReadOutcome, frame_len};

pub mod frame;

/// Position of a value inside the log.
#[derive(Debug, Clone, Copy)]
struct Location {
    offset: u64,
    len: u32,
}

impl Location {
    /// Encoded size of the put frame holding this value.
    fn frame_len(&self, key_len: usize) -> u64 {
        frame_len(key_len, self.len as usize)
    }
}

pub struct FileTable {
    path: PathBuf,
    reader: File,
    writer: Option<BufWriter<File>>,
    directory: BTreeMap<Vec<u8>, Location>,
    /// Logical end of the log, including bytes still buffered in `writer`.
    end: u64,
    /// Bytes occupied by superseded and removal frames.
    garbage: u64,
    unflushed: bool,
}

impl FileTable {
    /// Opens the table stored at `path`, creating an empty one if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidData` when a complete frame fails its checksum.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<FileTable> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let file_len = file.metadata()?.len();

        let mut table = FileTable {
            reader: file,
            writer: None,
            directory: BTreeMap::new(),
            end: 0,
            garbage: 0,
            unflushed: false,
            path,
        };
        table.replay(file_len)?;
        if table.end < file_len {
            log::warn!(
                "truncating torn frame at the end of {} ({} of {} bytes kept)",
                table.path.display(),
                table.end,
                file_len
            );
            table.reader.set_len(table.end)?;
            table.reader.sync_all()?;
        }
        table.writer = Some(BufWriter::new(
            OpenOptions::new().append(true).open(&table.path)?,
        ));
        log::info!(
            "opened table {} ({} keys, {} log bytes)",
            table.path.display(),
            table.directory.len(),
            table.end
        );
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the log in bytes, including superseded frames.
    pub fn log_size(&self) -> u64 {
        self.end
    }

    /// Bytes of the log that compaction would reclaim.
    pub fn garbage_size(&self) -> u64 {
        self.garbage
    }

    /// Rewrites the log so that it holds exactly one frame per live key,
    /// then swaps it in place of the current file.
    pub fn compact(&mut self) -> std::io::Result<()> {
        self.flush_writer()?;
        let before = self.end;
        let compacted_path = self.path.with_extension("compact");

        let mut out = BufWriter::new(File::create(&compacted_path)?);
        let mut directory = BTreeMap::new();
        let mut offset = 0u64;
        for (key, location) in &self.directory {
            let value = self.read_value(*location)?;
            out.write_all(&frame::encode(FrameOp::Put, key, &value)?)?;
            directory.insert(
                key.clone(),
                Location {
                    offset: offset + (HEADER_SIZE + key.len()) as u64,
                    len: location.len,
                },
            );
            offset += frame_len(key.len(), value.len());
        }
        out.flush()?;
        out.get_ref().sync_all()?;
        drop(out);

        // Release the old handles before replacing the file.
        self.writer = None;
        self.reader = File::open(&compacted_path)?;
        std::fs::rename(&compacted_path, &self.path)?;
        self.writer = Some(BufWriter::new(
            OpenOptions::new().append(true).open(&self.path)?,
        ));
        self.directory = directory;
        self.end = offset;
        self.garbage = 0;

        log::info!(
            "compacted table {} from {} to {} bytes",
            self.path.display(),
            before,
            offset
        );
        Ok(())
    }

    fn replay(&mut self, file_len: u64) -> std::io::Result<()> {
        let mut reader = BufReader::new(&self.reader);
        loop {
            let frame = match frame::read_frame(&mut reader, file_len - self.end)? {
                ReadOutcome::Frame(frame) => frame,
                ReadOutcome::End | ReadOutcome::Torn => return Ok(()),
            };
            let frame_start = self.end;
            let encoded_len = frame.encoded_len();
            self.end += encoded_len;
            match frame.op {
                FrameOp::Put => {
                    let key_len = frame.key.len();
                    let location = Location {
                        offset: frame_start + (HEADER_SIZE + key_len) as u64,
                        len: frame.value.len() as u32,
                    };
                    if let Some(old) = self.directory.insert(frame.key, location) {
                        self.garbage += old.frame_len(key_len);
                    }
                }
                FrameOp::Remove => {
                    self.garbage += encoded_len;
                    if let Some(old) = self.directory.remove(&frame.key) {
                        self.garbage += old.frame_len(frame.key.len());
                    }
                }
            }
        }
    }

    fn append(&mut self, op: FrameOp, key: &[u8], value: &[u8]) -> std::io::Result<u64> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| table_closed(&self.path.to_string_lossy()))?;
        let frame = frame::encode(op, key, value)?;
        writer.write_all(&frame)?;
        let value_offset = self.end + (HEADER_SIZE + key.len()) as u64;
        self.end += frame.len() as u64;
        self.unflushed = true;
        Ok(value_offset)
    }

    fn flush_writer(&mut self) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| table_closed(&self.path.to_string_lossy()))?;
        if self.unflushed {
            writer.flush()?;
            self.unflushed = false;
        }
        Ok(())
    }

    fn read_value(&self, location: Location) -> std::io::Result<Vec<u8>> {
        file_read_vec_at(&self.reader, location.offset, location.len as usize)
    }
}

impl Table for FileTable {
    fn get(&mut self, key: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
        self.flush_writer()?;
        match self.directory.get(key) {
            Some(&location) => Ok(Some(self.read_value(location)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
        let offset = self.append(FrameOp::Put, key, value)?;
        let location = Location {
            offset,
            len: value.len() as u32,
        };
        if let Some(old) = self.directory.insert(key.to_vec(), location) {
            self.garbage += old.frame_len(key.len());
        }
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> std::io::Result<bool> {
        if self.writer.is_none() {
            return Err(table_closed(&self.path.to_string_lossy()));
        }
        if !self.directory.contains_key(key) {
            return Ok(false);
        }
        self.append(FrameOp::Remove, key, &[])?;
        if let Some(old) = self.directory.remove(key) {
            self.garbage += old.frame_len(key.len());
        }
        self.garbage += frame_len(key.len(), 0);
        Ok(true)
    }

    fn len(&self) -> usize {
        self.directory.len()
    }

    fn cursor(&mut self) -> std::io::Result<Box<dyn Cursor<Element = Tuple> + '_>> {
        self.flush_writer()?;
        let reader = &self.reader;
        Ok(Box::new(KeyRangeCursor::new(
            &self.directory,
            move |_: &[u8], location: &Location| {
                file_read_vec_at(reader, location.offset, location.len as usize)
            },
        )))
    }

    fn sync(&mut self) -> std::io::Result<()> {
        self.flush_writer()?;
        if let Some(writer) = self.writer.as_ref() {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> std::io::Result<()> {
        if self.writer.is_none() {
            return Ok(());
        }
        self.sync()?;
        self.writer = None;
        log::info!(
            "closed table {} ({} keys, {} log bytes)",
            self.path.display(),
            self.directory.len(),
            self.end
        );
        Ok(())
    }
}
