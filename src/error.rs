use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "header mismatch: expected magic {expected_magic:?} key_size={expected_key_size} \
         value_size={expected_value_size}, found magic {found_magic:?} \
         key_size={found_key_size} value_size={found_value_size}"
    )]
    HeaderMismatch {
        expected_magic: [u8; 3],
        expected_key_size: u32,
        expected_value_size: u32,
        found_magic: [u8; 3],
        found_key_size: u32,
        found_value_size: u32,
    },

    #[error(
        "seek landed at unexpected offset: expected {expected}, found {found}"
    )]
    UnexpectedOffset { expected: u64, found: u64 },

    #[error(
        "split produced a record whose new bin {bin} (fingerprint {fingerprint}) matched \
         neither the old bin {old_bin} nor the new bin {new_bin}"
    )]
    SplitInvariantViolated {
        fingerprint: u32,
        bin: u32,
        old_bin: u32,
        new_bin: u32,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
