use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read};

use crate::{Error, Result};

pub const SUPERBLOCK_SIZE: usize = 340;
pub const SUPERBLOCK_MAGIC: &[u8; 28] = b"Sony PS2 Memory Card Format ";

/// Card geometry and allocation metadata, unpacked from the first 340 bytes
/// of a `.ps2` image.
#[derive(Debug, Clone)]
pub struct SuperBlock {
    pub version: [u8; 12],
    pub page_size: u16,
    pub pages_per_cluster: u16,
    pub pages_per_block: u16,
    pub clusters_per_card: u32,
    pub alloc_offset: u32,
    pub alloc_end: u32,
    pub rootdir_cluster: u32,
    pub backup_block1: u32,
    pub backup_block2: u32,
    /// Indirect-FAT cluster indices with trailing zero entries stripped.
    pub ifc_list: Vec<u32>,
    pub bad_block_list: [u32; 32],
    pub card_type: u8,
    pub card_flags: u8,
}

impl SuperBlock {
    pub fn cluster_size(&self) -> usize {
        self.page_size as usize * self.pages_per_cluster as usize
    }

    pub fn fat_entries_per_cluster(&self) -> usize {
        self.cluster_size() / 4
    }

    /// Spare (ECC/out-of-band) bytes per page: `(page_size / 128) * 4`.
    pub fn spare_size(&self) -> usize {
        (self.page_size as usize / 128) * 4
    }

    /// On-disk bytes occupied by a page, data plus spare.
    pub fn raw_page_size(&self) -> usize {
        self.page_size as usize + self.spare_size()
    }

    pub fn read(data: &[u8]) -> Result<SuperBlock> {
        if data.len() < SUPERBLOCK_SIZE {
            return Err(Error::Format(format!(
                "card image too small to hold a superblock: {} bytes",
                data.len()
            )));
        }

        let mut c = Cursor::new(data);

        let mut magic = [0u8; 28];
        c.read_exact(&mut magic)?;
        if &magic != SUPERBLOCK_MAGIC {
            return Err(Error::Format("superblock magic mismatch".to_string()));
        }

        let mut version = [0u8; 12];
        c.read_exact(&mut version)?;

        let page_size = c.read_u16::<LE>()?;
        let pages_per_cluster = c.read_u16::<LE>()?;
        let pages_per_block = c.read_u16::<LE>()?;
        let _unused = c.read_u16::<LE>()?; // 0xFF00
        let clusters_per_card = c.read_u32::<LE>()?;
        let alloc_offset = c.read_u32::<LE>()?;
        let alloc_end = c.read_u32::<LE>()?;
        let rootdir_cluster = c.read_u32::<LE>()?;
        let backup_block1 = c.read_u32::<LE>()?;
        let backup_block2 = c.read_u32::<LE>()?;

        let mut _reserved = [0u8; 8];
        c.read_exact(&mut _reserved)?;

        let mut ifc_list_raw = [0u32; 32];
        c.read_u32_into::<LE>(&mut ifc_list_raw)?;
        let ifc_list = ifc_list_raw
            .into_iter()
            .take_while(|&v| v != 0)
            .collect::<Vec<_>>();

        let mut bad_block_list = [0u32; 32];
        c.read_u32_into::<LE>(&mut bad_block_list)?;

        let card_type = c.read_u8()?;
        let card_flags = c.read_u8()?;

        Ok(SuperBlock {
            version,
            page_size,
            pages_per_cluster,
            pages_per_block,
            clusters_per_card,
            alloc_offset,
            alloc_end,
            rootdir_cluster,
            backup_block1,
            backup_block2,
            ifc_list,
            bad_block_list,
            card_type,
            card_flags,
        })
    }
}
