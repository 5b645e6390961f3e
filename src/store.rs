use std::path::Path;

use crate::config::{self, StoreConfig};
use crate::data_file::DataFile;
use crate::error::Result;
use crate::index::{BucketRef, LinearHashIndex, RECORDS_PER_BUCKET};
use crate::iter::Iter;
use crate::size;

/// A persistent, single-file, fixed-size key/value store backed by an
/// in-memory Linear Hashing index.
pub struct Store {
    pub(crate) file: DataFile,
    index: LinearHashIndex,
    pub(crate) config: StoreConfig,
}

impl Store {
    /// Opens `path` under the process-wide default max load (see
    /// [`config::set_max_load`]). `start_buckets`, `key_size` and
    /// `value_size` are only consulted when the file is created fresh;
    /// on an existing file they're read back from the header and must
    /// match, or `open` fails.
    pub fn open(
        path: impl AsRef<Path>,
        start_buckets: u32,
        key_size: u32,
        value_size: u32,
    ) -> Result<Self> {
        Self::open_with_max_load(
            path,
            start_buckets,
            key_size,
            value_size,
            config::default_max_load(),
        )
    }

    pub fn open_with_max_load(
        path: impl AsRef<Path>,
        start_buckets: u32,
        key_size: u32,
        value_size: u32,
        max_load: f64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let (mut file, num_records_in_file) = DataFile::open_or_create(path, key_size, value_size)?;

        let table_size = if num_records_in_file == 0 {
            start_buckets.max(2)
        } else {
            size::perfect_table_size(max_load, num_records_in_file)
        };

        let mut index = LinearHashIndex::new(table_size);

        if num_records_in_file > 0 {
            tracing::info!(
                path = %path.display(),
                num_records_in_file,
                table_size,
                "replaying data file into index"
            );
            let mut key_buf = vec![0u8; key_size as usize];
            let mut value_buf = vec![0u8; value_size as usize];
            for file_index in 0..num_records_in_file {
                file.read_record_raw(file_index, &mut key_buf, &mut value_buf)?;
                index.insert_ignoring_data_file(&key_buf, file_index);
            }
        }

        Ok(Store {
            file,
            index,
            config: StoreConfig {
                max_load,
                key_size,
                value_size,
            },
        })
    }

    /// Looks up `key`, filling `out_value` on success. Returns `Ok(false)`
    /// (not an error) if the key isn't present.
    pub fn get(&mut self, key: &[u8], out_value: &mut [u8]) -> Result<bool> {
        debug_assert_eq!(key.len(), self.config.key_size as usize);
        debug_assert_eq!(out_value.len(), self.config.value_size as usize);

        let fp = self.index.fingerprint_for_key(key);
        let bin = self.index.bin_number_from_fingerprint(fp);
        let mut tail = BucketRef::Primary(bin);
        let mut depth = 0u32;

        loop {
            let bucket = *self.index.bucket(tail);
            for slot in 0..bucket.len() {
                if bucket.fingerprints[slot] == fp && self.file.read_record(bucket.file_index[slot], key, out_value)? {
                    self.index.note_overflow_depth(depth);
                    return Ok(true);
                }
            }
            match bucket.overflow_index {
                0 => {
                    self.index.note_overflow_depth(depth);
                    return Ok(false);
                }
                idx => {
                    tail = BucketRef::Overflow(idx);
                    depth += 1;
                }
            }
        }
    }

    /// Inserts or overwrites `key` with `value`. A key that already exists
    /// keeps its file index; the value is overwritten in place and the
    /// file does not grow.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        debug_assert_eq!(key.len(), self.config.key_size as usize);
        debug_assert_eq!(value.len(), self.config.value_size as usize);

        let fp = self.index.fingerprint_for_key(key);
        let bin = self.index.bin_number_from_fingerprint(fp);
        let mut tail = BucketRef::Primary(bin);
        let mut depth = 0u32;

        loop {
            let bucket = *self.index.bucket(tail);
            let len = bucket.len();

            for slot in 0..len {
                if bucket.fingerprints[slot] == fp {
                    let file_index = bucket.file_index[slot];
                    if self.file.verify_key(file_index, key)? {
                        self.file.overwrite_value(file_index, value)?;
                        self.index.note_overflow_depth(depth);
                        return Ok(());
                    }
                }
            }

            if len < RECORDS_PER_BUCKET {
                let file_index = self.index.num_records();
                self.file.append_record(file_index, key, value)?;
                self.index.place_at(tail, len, fp, file_index);
                self.index.bump_num_records();
                self.index.note_overflow_depth(depth);
                return self.maybe_split();
            }

            tail = match bucket.overflow_index {
                0 => self.index.append_overflow(tail),
                idx => BucketRef::Overflow(idx),
            };
            depth += 1;
        }
    }

    fn maybe_split(&mut self) -> Result<()> {
        while self.index.load_factor() > self.config.max_load {
            tracing::debug!(
                size_b = self.index.current_size(),
                num_records = self.index.num_records(),
                "table load exceeded, splitting one bin"
            );
            self.index.split_step()?;
        }
        Ok(())
    }

    pub fn iter(&mut self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Total number of primary bins, including those added by splits.
    pub fn current_size(&self) -> u32 {
        self.index.current_size()
    }

    pub fn num_records(&self) -> u32 {
        self.index.num_records()
    }

    pub fn max_overflow_depth(&self) -> u32 {
        self.index.max_overflow_depth()
    }

    /// Optimal starting table size for housing `new_num_records` at this
    /// store's configured max load, for seeding a fresh store the data is
    /// being copied into.
    pub fn shrink_size(&self, new_num_records: u32) -> u32 {
        size::perfect_table_size(self.config.max_load, new_num_records)
    }
}
