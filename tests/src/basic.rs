use std::fs::{File, OpenOptions};
use std::io::Write;

use linhash::Store;
use rand::Rng;
use tempfile::tempdir;

const KEY_SIZE: u32 = 4;
const VALUE_SIZE: u32 = 4;

#[test]
fn empty_then_put_then_get() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();

    let key = 0x0102_0304u32.to_be_bytes();
    let value = 0xAABB_CCDDu32.to_be_bytes();
    store.put(&key, &value).unwrap();

    let mut out = [0u8; VALUE_SIZE as usize];
    assert!(store.get(&key, &mut out).unwrap());
    assert_eq!(out, value);
    assert_eq!(store.num_records(), 1);

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, 11 + 8);
}

#[test]
fn overwrite_does_not_grow_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();

    let key = 0x0102_0304u32.to_be_bytes();
    store.put(&key, &0xAABB_CCDDu32.to_be_bytes()).unwrap();
    store.put(&key, &0x1122_3344u32.to_be_bytes()).unwrap();

    let mut out = [0u8; VALUE_SIZE as usize];
    assert!(store.get(&key, &mut out).unwrap());
    assert_eq!(out, 0x1122_3344u32.to_be_bytes());
    assert_eq!(store.num_records(), 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 11 + 8);
}

#[test]
fn missing_key_is_not_found_not_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();
    store.put(&1u32.to_le_bytes(), &9u32.to_le_bytes()).unwrap();

    let mut out = [0u8; VALUE_SIZE as usize];
    assert!(!store.get(&2u32.to_le_bytes(), &mut out).unwrap());
}

#[test]
fn forced_split_keeps_every_key_retrievable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    let mut store = Store::open_with_max_load(&path, 2, KEY_SIZE, VALUE_SIZE, 0.5).unwrap();

    for i in 0u32..9 {
        store.put(&i.to_le_bytes(), &(i * 10).to_le_bytes()).unwrap();
    }
    assert!(store.current_size() >= 3);

    let mut out = [0u8; VALUE_SIZE as usize];
    for i in 0u32..9 {
        assert!(store.get(&i.to_le_bytes(), &mut out).unwrap());
        assert_eq!(u32::from_le_bytes(out), i * 10);
    }
}

#[test]
fn overflow_chain_is_used_when_a_bucket_fills_up() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    // max_load of 1.0 means a single bucket of 8 slots never triggers a
    // split on its own; a 9th distinct key forces an overflow bucket.
    let mut store = Store::open_with_max_load(&path, 2, KEY_SIZE, VALUE_SIZE, 1.0).unwrap();

    for i in 0u32..200 {
        store.put(&i.to_le_bytes(), &i.to_le_bytes()).unwrap();
    }

    let mut out = [0u8; VALUE_SIZE as usize];
    for i in 0u32..200 {
        assert!(store.get(&i.to_le_bytes(), &mut out).unwrap());
        assert_eq!(u32::from_le_bytes(out), i);
    }
    assert!(store.max_overflow_depth() >= 1);
}

#[test]
fn torn_tail_is_truncated_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();
        for i in 0u32..3 {
            store.put(&i.to_le_bytes(), &i.to_le_bytes()).unwrap();
        }
    }

    // Simulate a crash mid-append: trailing bytes shorter than one record.
    {
        let mut file: File = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
    }

    let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();
    assert_eq!(store.num_records(), 3);

    let expected_len = 11 + 3 * (KEY_SIZE + VALUE_SIZE) as u64;
    assert_eq!(std::fs::metadata(&path).unwrap().len(), expected_len);

    let mut out = [0u8; VALUE_SIZE as usize];
    for i in 0u32..3 {
        assert!(store.get(&i.to_le_bytes(), &mut out).unwrap());
        assert_eq!(u32::from_le_bytes(out), i);
    }
}

#[test]
fn reopen_preserves_every_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    let mut rng = rand::thread_rng();

    let mut entries: Vec<([u8; 16], [u8; 4])> = Vec::new();
    {
        let mut store = Store::open(&path, 2, 16, 4).unwrap();
        for _ in 0..1000 {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            let value: [u8; 4] = rng.gen::<u32>().to_le_bytes();
            store.put(&key, &value).unwrap();
            entries.push((key, value));
        }
    }

    let mut store = Store::open(&path, 2, 16, 4).unwrap();
    assert_eq!(store.num_records() as usize, entries.len());

    let mut out = [0u8; 4];
    for (key, value) in &entries {
        assert!(store.get(key, &mut out).unwrap());
        assert_eq!(&out, value);
    }

    let mut seen = std::collections::HashSet::new();
    for item in store.iter() {
        let (key, value) = item.unwrap();
        seen.insert((key, value));
    }
    assert_eq!(seen.len(), entries.len());
    for (key, value) in &entries {
        assert!(seen.contains(&(key.to_vec(), value.to_vec())));
    }
}

#[test]
fn header_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let _store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();
    }
    let result = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE + 4);
    assert!(result.is_err());
}

#[test]
fn set_max_load_affects_subsequent_opens_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");

    linhash::set_max_load(0.9);
    assert_eq!(linhash::default_max_load(), 0.9);

    let mut store = Store::open(&path, 2, KEY_SIZE, VALUE_SIZE).unwrap();
    for i in 0u32..20 {
        store.put(&i.to_le_bytes(), &i.to_le_bytes()).unwrap();
    }
    linhash::set_max_load(0.5);

    let mut out = [0u8; VALUE_SIZE as usize];
    for i in 0u32..20 {
        assert!(store.get(&i.to_le_bytes(), &mut out).unwrap());
    }
}
