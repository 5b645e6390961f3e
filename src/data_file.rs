use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub(crate) const HEADER_SIZE: u64 = 11;
const MAGIC: [u8; 3] = *b"Ld2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastOp {
    Read,
    Write,
}

/// The fixed-width append-only data file: an 11-byte header followed by
/// back-to-back `key_size + value_size` records. Tracks its own cursor so
/// reads and writes that are already correctly positioned skip the `seek`
/// syscall; a read/write barrier seek is still taken whenever the last op
/// was on the other side of that fence.
pub struct DataFile {
    file: File,
    key_size: u32,
    value_size: u32,
    record_size: u64,
    pos: u64,
    last_op: LastOp,
    key_scratch: Vec<u8>,
}

impl DataFile {
    pub fn key_size(&self) -> u32 {
        self.key_size
    }

    pub fn value_size(&self) -> u32 {
        self.value_size
    }

    pub fn offset_of(&self, file_index: u32) -> u64 {
        HEADER_SIZE + file_index as u64 * self.record_size
    }

    /// Opens `path`, creating it with a fresh header if it doesn't exist.
    /// Returns the file plus the number of whole records already on disk
    /// (a torn trailing record, if any, is truncated away first).
    pub fn open_or_create(path: &Path, key_size: u32, value_size: u32) -> Result<(Self, u32)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let record_size = key_size as u64 + value_size as u64;
        let len = file.metadata()?.len();

        if len < HEADER_SIZE {
            let mut data_file = DataFile {
                file,
                key_size,
                value_size,
                record_size,
                pos: 0,
                last_op: LastOp::Write,
                key_scratch: vec![0u8; key_size as usize],
            };
            data_file.write_header()?;
            return Ok((data_file, 0));
        }

        let mut file = file;
        file.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let found_magic = [header[0], header[1], header[2]];
        let found_key_size = u32::from_le_bytes([header[3], header[4], header[5], header[6]]);
        let found_value_size = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
        if found_magic != MAGIC || found_key_size != key_size || found_value_size != value_size {
            return Err(Error::HeaderMismatch {
                expected_magic: MAGIC,
                expected_key_size: key_size,
                expected_value_size: value_size,
                found_magic,
                found_key_size,
                found_value_size,
            });
        }

        let body_len = len - HEADER_SIZE;
        let whole_records = body_len / record_size;
        let remainder = body_len % record_size;

        let file = if remainder != 0 {
            drop(file);
            tracing::warn!(
                path = %path.display(),
                remainder,
                "torn tail found in data file, truncating to last whole record"
            );
            Self::truncate_torn_tail(path, whole_records, record_size)?
        } else {
            file
        };

        let data_file = DataFile {
            file,
            key_size,
            value_size,
            record_size,
            pos: HEADER_SIZE,
            last_op: LastOp::Read,
            key_scratch: vec![0u8; key_size as usize],
        };
        Ok((data_file, whole_records as u32))
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..3].copy_from_slice(&MAGIC);
        header[3..7].copy_from_slice(&self.key_size.to_le_bytes());
        header[7..11].copy_from_slice(&self.value_size.to_le_bytes());
        self.file.write_all(&header)?;
        self.pos = HEADER_SIZE;
        Ok(())
    }

    /// Rewrites `path` to contain only its header plus `whole_records`
    /// complete records, via a sibling temp file and an atomic rename.
    /// Streams the copy in fixed-size chunks rather than reading the whole
    /// file into memory, since data files are expected to grow far larger
    /// than RAM.
    fn truncate_torn_tail(path: &Path, whole_records: u64, record_size: u64) -> Result<File> {
        let keep = HEADER_SIZE + whole_records * record_size;

        let mut tmp_name: OsString = path.as_os_str().to_owned();
        tmp_name.push(".trunc");
        let tmp_path = std::path::PathBuf::from(tmp_name);

        {
            let src = File::open(path)?;
            let mut reader = BufReader::new(src).take(keep);
            let dst = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(dst);
            io::copy(&mut reader, &mut writer)?;
            writer.flush()?;
        }

        fs::rename(&tmp_path, path)?;
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(file)
    }

    fn seek_before_read(&mut self, target: u64) -> Result<()> {
        if self.last_op == LastOp::Write || self.pos != target {
            self.file.seek(SeekFrom::Start(target))?;
            self.pos = target;
        }
        self.last_op = LastOp::Read;
        Ok(())
    }

    fn seek_before_append(&mut self, target: u64) -> Result<()> {
        if self.last_op == LastOp::Read || self.pos != target {
            self.pos = self.file.seek(SeekFrom::End(0))?;
        }
        if self.pos != target {
            return Err(Error::UnexpectedOffset {
                expected: target,
                found: self.pos,
            });
        }
        Ok(())
    }

    /// A write immediately following a read always re-seeks, even to the
    /// position it's already at: the read/write barrier is not elidable.
    fn seek_before_write_at(&mut self, target: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(())
    }

    /// Reads the key at `file_index` and compares it to `key`, leaving the
    /// cursor positioned right after the key on a match.
    pub fn verify_key(&mut self, file_index: u32, key: &[u8]) -> Result<bool> {
        let target = self.offset_of(file_index);
        self.seek_before_read(target)?;
        self.file.read_exact(&mut self.key_scratch)?;
        self.pos += self.key_size as u64;
        self.last_op = LastOp::Read;
        Ok(self.key_scratch == key)
    }

    /// Reads the full record at `file_index`, returning `Ok(false)` without
    /// touching `out_value` if the on-disk key doesn't match (a fingerprint
    /// collision, not an error).
    pub fn read_record(&mut self, file_index: u32, key: &[u8], out_value: &mut [u8]) -> Result<bool> {
        if !self.verify_key(file_index, key)? {
            return Ok(false);
        }
        self.file.read_exact(out_value)?;
        self.pos += self.value_size as u64;
        Ok(true)
    }

    /// Reads key and value at a known-good index without key verification,
    /// used by bootstrap replay and by the sequential iterator.
    pub fn read_record_raw(&mut self, file_index: u32, out_key: &mut [u8], out_value: &mut [u8]) -> Result<()> {
        let target = self.offset_of(file_index);
        self.seek_before_read(target)?;
        self.file.read_exact(out_key)?;
        self.file.read_exact(out_value)?;
        self.pos = target + self.record_size;
        self.last_op = LastOp::Read;
        Ok(())
    }

    /// Appends a brand-new record at `file_index`, which must equal the
    /// current record count (callers assign file indices sequentially).
    pub fn append_record(&mut self, file_index: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let target = self.offset_of(file_index);
        self.seek_before_append(target)?;
        self.file.write_all(key)?;
        self.file.write_all(value)?;
        self.pos = target + self.record_size;
        self.last_op = LastOp::Write;
        Ok(())
    }

    /// Overwrites the value of an existing record in place; the key and
    /// the file's size are unaffected.
    pub fn overwrite_value(&mut self, file_index: u32, value: &[u8]) -> Result<()> {
        let target = self.offset_of(file_index) + self.key_size as u64;
        self.seek_before_write_at(target)?;
        self.file.write_all(value)?;
        self.pos = target + self.value_size as u64;
        self.last_op = LastOp::Write;
        Ok(())
    }
}
