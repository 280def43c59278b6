use std::path::{Path, PathBuf};

use byteorder::{ReadBytesExt, LE};
use std::io::Cursor;

use crate::dir_entry::{DirEntry, ENTRY_SIZE};
use crate::fat::{flatten_ifc, FatTable};
use crate::superblock::SuperBlock;
use crate::{Error, Result};

/// An opened `.ps2` memory-card image: the raw byte buffer, its parsed
/// geometry, the materialized FAT, and a cached, filtered root listing.
pub struct CardHandle {
    data: Vec<u8>,
    superblock: SuperBlock,
    fat: FatTable,
    root: Vec<DirEntry>,
}

impl CardHandle {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<CardHandle> {
        let data = std::fs::read(path).map_err(Error::Io)?;
        let superblock = SuperBlock::read(&data)?;
        let fat = build_fat_table(&superblock, &data)?;

        let mut handle = CardHandle {
            data,
            superblock,
            fat,
            root: Vec::new(),
        };

        let root_entry = handle.get_root_entry()?;
        handle.root = handle
            .find_sub_entries(&root_entry)?
            .into_iter()
            .filter(|entry| entry.is_exists())
            .collect();

        Ok(handle)
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    /// The root directory's games: `EXISTS`-set, non-dotted entries only.
    pub fn list_root(&self) -> &[DirEntry] {
        &self.root
    }

    /// Returns the non-dotted children of the root entry exactly matching `name`.
    pub fn lookup(&self, name: &str) -> Result<Vec<DirEntry>> {
        let entry = self
            .root
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::Lookup(format!("can't find game {name}")))?;

        self.find_sub_entries(entry)
    }

    /// Reads a file entry's full contents by following its cluster chain.
    pub fn read_file(&self, entry: &DirEntry) -> Result<Vec<u8>> {
        let cluster_size = self.superblock.cluster_size();
        let chain = self
            .fat
            .chain(entry.cluster, self.superblock.clusters_per_card)?;

        let mut out = Vec::with_capacity(entry.length as usize);
        let mut remaining = entry.length as usize;

        for cluster in chain {
            if remaining == 0 {
                break;
            }
            let bytes = self.read_relative_cluster(cluster)?;
            let take = remaining.min(cluster_size);
            out.extend_from_slice(&bytes[..take]);
            remaining -= take;
        }

        if out.len() != entry.length as usize {
            return Err(Error::Format(format!(
                "entry {} declares length {} but its chain only yielded {} bytes",
                entry.name,
                entry.length,
                out.len()
            )));
        }

        Ok(out)
    }

    /// Exports every file child of `name` into `dest_dir/name/`, returning
    /// that directory's path.
    pub fn export(&self, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let children = self.lookup(name)?;
        let out_dir = dest_dir.join(name);
        std::fs::create_dir_all(&out_dir).map_err(Error::Io)?;

        for child in children.iter().filter(|entry| entry.is_file()) {
            let data = self.read_file(child)?;
            std::fs::write(out_dir.join(&child.name), data).map_err(Error::Io)?;
        }

        Ok(out_dir)
    }

    fn get_root_entry(&self) -> Result<DirEntry> {
        let bytes = self.read_relative_cluster(self.superblock.rootdir_cluster)?;
        DirEntry::read(&bytes[..ENTRY_SIZE])
    }

    /// Walks `parent.cluster`'s chain, unpacking at most `parent.length`
    /// directory records, then drops any entry whose name begins with `.`.
    fn find_sub_entries(&self, parent: &DirEntry) -> Result<Vec<DirEntry>> {
        let entries_per_cluster = self.superblock.cluster_size() / ENTRY_SIZE;
        let chain = self
            .fat
            .chain(parent.cluster, self.superblock.clusters_per_card)?;

        let mut entries = Vec::new();

        'clusters: for cluster in chain {
            let bytes = self.read_relative_cluster(cluster)?;
            for i in 0..entries_per_cluster {
                if entries.len() >= parent.length as usize {
                    break 'clusters;
                }
                let start = i * ENTRY_SIZE;
                let end = start + ENTRY_SIZE;
                let record = bytes.get(start..end).ok_or_else(|| {
                    Error::Format("directory cluster too short for its entry count".to_string())
                })?;
                entries.push(DirEntry::read(record)?);
            }
        }

        Ok(entries.into_iter().filter(|entry| !entry.is_dotted()).collect())
    }

    /// Reads a relative cluster (directory/file data), applying `alloc_offset`.
    fn read_relative_cluster(&self, cluster: u32) -> Result<Vec<u8>> {
        read_cluster(&self.superblock, &self.data, cluster + self.superblock.alloc_offset)
    }
}

fn read_page<'a>(superblock: &SuperBlock, data: &'a [u8], n: u32) -> Result<&'a [u8]> {
    let raw_page_size = superblock.raw_page_size();
    let page_size = superblock.page_size as usize;
    let start = n as usize * raw_page_size;
    let end = start + page_size;

    data.get(start..end)
        .ok_or_else(|| Error::Format(format!("page {n} is out of bounds of the card image")))
}

fn read_cluster(superblock: &SuperBlock, data: &[u8], n: u32) -> Result<Vec<u8>> {
    let pages_per_cluster = superblock.pages_per_cluster as u32;
    let mut buf = Vec::with_capacity(superblock.cluster_size());

    for i in 0..pages_per_cluster {
        buf.extend_from_slice(read_page(superblock, data, n * pages_per_cluster + i)?);
    }

    Ok(buf)
}

fn read_cluster_u32s(superblock: &SuperBlock, data: &[u8], n: u32) -> Result<Vec<u32>> {
    let bytes = read_cluster(superblock, data, n)?;
    let mut out = vec![0u32; bytes.len() / 4];
    Cursor::new(&bytes[..]).read_u32_into::<LE>(&mut out)?;
    Ok(out)
}

/// Materializes the two-level FAT: first the indirect-FAT cluster list (IFC
/// clusters flattened, `UNALLOCATED` entries dropped), then each FAT cluster
/// named by that list, read as a `u32` row.
fn build_fat_table(superblock: &SuperBlock, data: &[u8]) -> Result<FatTable> {
    let entries_per_cluster = superblock.fat_entries_per_cluster();

    let ifc_clusters = superblock
        .ifc_list
        .iter()
        .map(|&cluster| read_cluster_u32s(superblock, data, cluster))
        .collect::<Result<Vec<_>>>()?;

    let fat_cluster_list = flatten_ifc(&ifc_clusters);

    let fat_clusters = fat_cluster_list
        .iter()
        .map(|&cluster| read_cluster_u32s(superblock, data, cluster))
        .collect::<Result<Vec<_>>>()?;

    Ok(FatTable::new(fat_clusters, entries_per_cluster))
}
