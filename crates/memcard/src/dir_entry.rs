use byteorder::{ReadBytesExt, LE};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read};

use crate::{Error, Result};

pub const ENTRY_SIZE: usize = 512;

pub const DF_READ: u16 = 0x0001;
pub const DF_WRITE: u16 = 0x0002;
pub const DF_EXECUTE: u16 = 0x0004;
pub const DF_PROTECTED: u16 = 0x0008;
pub const DF_FILE: u16 = 0x0010;
pub const DF_DIR: u16 = 0x0020;
pub const DF_HIDDEN: u16 = 0x2000;
pub const DF_EXISTS: u16 = 0x8000;

/// One 512-byte directory record: a file, a directory, or a deleted/unused
/// slot (when `DF_EXISTS` is clear).
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub mode: u16,
    pub length: u32,
    pub created: NaiveDateTime,
    /// Relative start cluster of the entry's data chain.
    pub cluster: u32,
    pub modified: NaiveDateTime,
    pub attributes: u32,
    pub name: String,
}

impl DirEntry {
    pub fn is_exists(&self) -> bool {
        self.mode & DF_EXISTS != 0
    }

    pub fn is_dir(&self) -> bool {
        self.mode & (DF_DIR | DF_EXISTS) == (DF_DIR | DF_EXISTS)
    }

    pub fn is_file(&self) -> bool {
        self.mode & (DF_FILE | DF_EXISTS) == (DF_FILE | DF_EXISTS)
    }

    pub fn is_hidden(&self) -> bool {
        self.mode & DF_HIDDEN != 0
    }

    pub fn is_dotted(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn read(data: &[u8]) -> Result<DirEntry> {
        if data.len() != ENTRY_SIZE {
            return Err(Error::Format(format!(
                "directory entry must be {ENTRY_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let mut c = Cursor::new(data);

        let mode = c.read_u16::<LE>()?;
        let _unused = c.read_u16::<LE>()?;
        let length = c.read_u32::<LE>()?;

        let mut created = [0u8; 8];
        c.read_exact(&mut created)?;
        let created = read_timestamp(&created);

        let cluster = c.read_u32::<LE>()?;
        let _dir_entry = c.read_u32::<LE>()?;

        let mut modified = [0u8; 8];
        c.read_exact(&mut modified)?;
        let modified = read_timestamp(&modified);

        let attributes = c.read_u32::<LE>()?;

        let mut _reserved = [0u8; 28];
        c.read_exact(&mut _reserved)?;

        let mut name = [0u8; 32];
        c.read_exact(&mut name)?;

        Ok(DirEntry {
            mode,
            length,
            created,
            cluster,
            modified,
            attributes,
            name: parse_name(&name),
        })
    }
}

fn parse_name(bytes: &[u8; 32]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}

/// Unpacks an 8-byte time-of-day record: reserved byte, then sec, min, hour,
/// day, zero-indexed month, and a little-endian u16 year. Matches the layout
/// this workspace already writes for `.psu` entry timestamps.
fn read_timestamp(bytes: &[u8; 8]) -> NaiveDateTime {
    let second = bytes[1] as u32;
    let minute = bytes[2] as u32;
    let hour = bytes[3] as u32;
    let day = bytes[4] as u32;
    let month = bytes[5] as u32 + 1;
    let year = u16::from_le_bytes([bytes[6], bytes[7]]) as i32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        })
}
