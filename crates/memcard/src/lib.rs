mod card;
mod dir_entry;
mod error;
mod fat;
mod superblock;

pub use card::CardHandle;
pub use dir_entry::{
    DirEntry, DF_DIR, DF_EXECUTE, DF_EXISTS, DF_FILE, DF_HIDDEN, DF_PROTECTED, DF_READ, DF_WRITE,
};
pub use error::{Error, Result};
pub use fat::{FatTable, ALLOCATED_BIT, CHAIN_END, UNALLOCATED};
pub use superblock::SuperBlock;
