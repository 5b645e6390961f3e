use crate::error::Result;
use crate::store::Store;

/// Sequential scan over every record in the data file, in file-index order
/// (insertion order, not key order).
pub struct Iter<'a> {
    store: &'a mut Store,
    next_index: u32,
    total: u32,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(store: &'a mut Store) -> Self {
        let total = store.num_records();
        Iter {
            store,
            next_index: 0,
            total,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }
        let mut key = vec![0u8; self.store.config.key_size as usize];
        let mut value = vec![0u8; self.store.config.value_size as usize];
        let result = self
            .store
            .file
            .read_record_raw(self.next_index, &mut key, &mut value);
        self.next_index += 1;
        match result {
            Ok(()) => Some(Ok((key, value))),
            Err(e) => Some(Err(e)),
        }
    }
}
