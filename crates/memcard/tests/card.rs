use std::io::Write;

use memcard::CardHandle;
use ps2_filetypes::{parse_icon, parse_icon_sys};
use tempfile::NamedTempFile;

const PAGE_SIZE: usize = 512;
const SPARE_SIZE: usize = 16;
const RAW_PAGE_SIZE: usize = PAGE_SIZE + SPARE_SIZE;
const PAGES_PER_CLUSTER: usize = 2;
const CLUSTER_SIZE: usize = PAGE_SIZE * PAGES_PER_CLUSTER;
const CLUSTERS_PER_CARD: u32 = 16;
const ALLOC_OFFSET: u32 = 3;
const ENTRY_SIZE: usize = 512;

const CHAIN_END: u32 = 0x7FFF_FFFF;
const ALLOCATED_BIT: u32 = 0x8000_0000;
const UNALLOCATED: u32 = 0xFFFF_FFFF;

/// A tiny, hand-assembled `.ps2` image with one game ("MYGAME") holding an
/// `icon.sys` and one `.icn` file.
struct Fixture {
    bytes: Vec<u8>,
}

impl Fixture {
    fn blank() -> Self {
        let total = CLUSTERS_PER_CARD as usize * PAGES_PER_CLUSTER * RAW_PAGE_SIZE;
        Self {
            bytes: vec![0u8; total],
        }
    }

    /// Writes `payload` (at most one cluster's worth) into absolute cluster
    /// `cluster`, honoring the per-page spare-byte gap.
    fn write_cluster(&mut self, cluster: u32, payload: &[u8]) {
        assert!(payload.len() <= CLUSTER_SIZE);
        for (page_in_cluster, chunk) in payload.chunks(PAGE_SIZE).enumerate() {
            let page_index = cluster as usize * PAGES_PER_CLUSTER + page_in_cluster;
            let offset = page_index * RAW_PAGE_SIZE;
            self.bytes[offset..offset + chunk.len()].copy_from_slice(chunk);
        }
    }

    fn write_superblock(&mut self, ifc_list: &[u32]) {
        let mut sb = Vec::with_capacity(340);
        sb.extend_from_slice(b"Sony PS2 Memory Card Format ");
        sb.extend_from_slice(&[0u8; 12]); // version
        sb.extend_from_slice(&(PAGE_SIZE as u16).to_le_bytes());
        sb.extend_from_slice(&(PAGES_PER_CLUSTER as u16).to_le_bytes());
        sb.extend_from_slice(&16u16.to_le_bytes()); // pages_per_block
        sb.extend_from_slice(&0xFF00u16.to_le_bytes());
        sb.extend_from_slice(&CLUSTERS_PER_CARD.to_le_bytes());
        sb.extend_from_slice(&ALLOC_OFFSET.to_le_bytes());
        sb.extend_from_slice(&CLUSTERS_PER_CARD.to_le_bytes()); // alloc_end
        sb.extend_from_slice(&0u32.to_le_bytes()); // rootdir_cluster (relative 0)
        sb.extend_from_slice(&0u32.to_le_bytes()); // backup_block1
        sb.extend_from_slice(&0u32.to_le_bytes()); // backup_block2
        sb.extend_from_slice(&[0u8; 8]); // reserved

        let mut ifc = [0u32; 32];
        ifc[..ifc_list.len()].copy_from_slice(ifc_list);
        for entry in ifc {
            sb.extend_from_slice(&entry.to_le_bytes());
        }
        for _ in 0..32 {
            sb.extend_from_slice(&UNALLOCATED.to_le_bytes()); // bad_block_list
        }
        sb.push(0); // card_type
        sb.push(0); // card_flags
        sb.extend_from_slice(&[0u8; 2]);

        assert_eq!(sb.len(), 340);
        self.write_cluster(0, &sb);
    }

    fn write_u32_cluster(&mut self, cluster: u32, entries: &[(usize, u32)]) {
        let mut buf = vec![0u8; CLUSTER_SIZE];
        for &(index, value) in entries {
            let offset = index * 4;
            buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        self.write_cluster(cluster, &buf);
    }

    fn into_file(self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(&self.bytes).expect("write fixture");
        file
    }
}

fn build_entry(mode: u16, length: u32, cluster: u32, name: &str) -> [u8; ENTRY_SIZE] {
    let mut bytes = [0u8; ENTRY_SIZE];
    bytes[0..2].copy_from_slice(&mode.to_le_bytes());
    bytes[4..8].copy_from_slice(&length.to_le_bytes());
    // created[8..16] left zeroed (falls back to the epoch in DirEntry::read)
    bytes[16..20].copy_from_slice(&cluster.to_le_bytes());
    // dir_entry[20..24], modified[24..32], attributes[32..36] left zeroed
    let name_bytes = name.as_bytes();
    bytes[64..64 + name_bytes.len()].copy_from_slice(name_bytes);
    bytes
}

fn build_icon_sys(subtitle: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(964);
    bytes.extend_from_slice(b"PS2D");
    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
    bytes.extend_from_slice(&(subtitle.len() as u16).to_le_bytes()); // linebreak
    bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
    bytes.extend_from_slice(&64u32.to_le_bytes()); // background_transparency

    for _ in 0..4 {
        for channel in [200u32, 200, 200, 255] {
            bytes.extend_from_slice(&channel.to_le_bytes());
        }
    }
    for _ in 0..3 {
        for v in [0.0f32, -1.0, 0.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    for _ in 0..3 {
        for v in [1.0f32, 1.0, 1.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    for v in [0.5f32, 0.5, 0.5, 1.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    let mut subtitle_buf = [0u8; 68];
    let sjis = subtitle.as_bytes();
    subtitle_buf[..sjis.len()].copy_from_slice(sjis);
    bytes.extend_from_slice(&subtitle_buf);

    for name in ["icon00.icn", "icon00.icn", "icon00.icn"] {
        let mut buf = [0u8; 64];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        bytes.extend_from_slice(&buf);
    }

    assert_eq!(bytes.len(), 964);
    bytes
}

fn build_icn() -> Vec<u8> {
    let mut bytes = Vec::new();
    // header: magic, animation_shapes=1, tex_type=0, padding, vertex_count=1
    bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());

    // one vertex, one shape: x,y,z,w
    bytes.extend_from_slice(&1i16.to_le_bytes());
    bytes.extend_from_slice(&2i16.to_le_bytes());
    bytes.extend_from_slice(&3i16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    // normal
    bytes.extend_from_slice(&0i16.to_le_bytes());
    bytes.extend_from_slice(&0i16.to_le_bytes());
    bytes.extend_from_slice(&1i16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    // uv
    bytes.extend_from_slice(&0i16.to_le_bytes());
    bytes.extend_from_slice(&0i16.to_le_bytes());
    // color
    bytes.extend_from_slice(&[255, 255, 255, 255]);

    // animation header: magic=1, frame_length, anim_speed, play_offset, frame_count=1
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&30u32.to_le_bytes());
    bytes.extend_from_slice(&1.0f32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());

    // one frame: shape_id=0, key_count=1 (zero key pairs follow), two reserved u32s
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes
}

/// Cluster map (all absolute): 0 superblock, 1 IFC, 2 FAT row,
/// 3 (rel 0) root dir, 4 (rel 1) MYGAME dir part 1, 5 (rel 2) icon.sys data,
/// 6 (rel 3) icon00.icn data, 7 (rel 4) MYGAME dir part 2.
fn build_fixture() -> (NamedTempFile, Vec<u8>, Vec<u8>) {
    let mut fixture = Fixture::blank();

    fixture.write_superblock(&[1]);
    fixture.write_u32_cluster(1, &[(0, 2)]); // IFC cluster -> FAT cluster 2

    let fat_entries = [
        (0, CHAIN_END),                 // relative cluster 0 (root dir): single cluster
        (1, ALLOCATED_BIT | 4),          // relative cluster 1 (MYGAME dir part 1) -> rel 4
        (2, CHAIN_END),                  // relative cluster 2 (icon.sys data)
        (3, CHAIN_END),                  // relative cluster 3 (icon00.icn data)
        (4, CHAIN_END),                  // relative cluster 4 (MYGAME dir part 2)
    ];
    fixture.write_u32_cluster(2, &fat_entries);

    // root dir cluster (relative 0, absolute 0 + ALLOC_OFFSET)
    let root_self = build_entry(0x8020, 2, 0, ".");
    let mygame_entry = build_entry(0x8020, 4, 1, "MYGAME");
    let mut root_cluster = Vec::with_capacity(CLUSTER_SIZE);
    root_cluster.extend_from_slice(&root_self);
    root_cluster.extend_from_slice(&mygame_entry);
    fixture.write_cluster(0 + ALLOC_OFFSET, &root_cluster);

    // MYGAME dir part 1 (relative 1): "." and ".."
    let dot = build_entry(0x8020, 4, 1, ".");
    let dotdot = build_entry(0x8020, 2, 0, "..");
    let mut mygame_part1 = Vec::with_capacity(CLUSTER_SIZE);
    mygame_part1.extend_from_slice(&dot);
    mygame_part1.extend_from_slice(&dotdot);
    fixture.write_cluster(1 + ALLOC_OFFSET, &mygame_part1);

    let icon_sys_bytes = build_icon_sys("My Great Game");
    let icn_bytes = build_icn();

    // MYGAME dir part 2 (relative 4): icon.sys and icon00.icn entries
    let icon_sys_entry = build_entry(0x8010, icon_sys_bytes.len() as u32, 2, "icon.sys");
    let icn_entry = build_entry(0x8010, icn_bytes.len() as u32, 3, "icon00.icn");
    let mut mygame_part2 = Vec::with_capacity(CLUSTER_SIZE);
    mygame_part2.extend_from_slice(&icon_sys_entry);
    mygame_part2.extend_from_slice(&icn_entry);
    fixture.write_cluster(4 + ALLOC_OFFSET, &mygame_part2);

    // icon.sys data (relative 2)
    fixture.write_cluster(2 + ALLOC_OFFSET, &icon_sys_bytes);
    // icon00.icn data (relative 3)
    fixture.write_cluster(3 + ALLOC_OFFSET, &icn_bytes);

    let file = fixture.into_file();
    (file, icon_sys_bytes, icn_bytes)
}

#[test]
fn list_root_contains_the_synthetic_game() {
    let (file, _, _) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let names: Vec<&str> = card.list_root().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["MYGAME"]);
}

#[test]
fn lookup_returns_icon_sys_and_icn_children() {
    let (file, _, _) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let children = card.lookup("MYGAME").expect("lookup MYGAME");
    let names: Vec<&str> = children.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"icon.sys"));
    assert!(names.contains(&"icon00.icn"));
}

#[test]
fn lookup_missing_game_is_a_lookup_error() {
    let (file, _, _) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let err = card.lookup("does-not-exist").unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn read_file_round_trips_icon_sys_bytes_exactly() {
    let (file, icon_sys_bytes, _) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let children = card.lookup("MYGAME").unwrap();
    let icon_sys_entry = children.iter().find(|e| e.name == "icon.sys").unwrap();
    let data = card.read_file(icon_sys_entry).unwrap();

    assert_eq!(data, icon_sys_bytes);

    let icon_sys = parse_icon_sys(&data).expect("parse icon.sys");
    assert_eq!(icon_sys.subtitle.0, "My Great Game");
}

#[test]
fn read_file_round_trips_icn_bytes_and_parses() {
    let (file, _, icn_bytes) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let children = card.lookup("MYGAME").unwrap();
    let icn_entry = children.iter().find(|e| e.name == "icon00.icn").unwrap();
    let data = card.read_file(icn_entry).unwrap();

    assert_eq!(data, icn_bytes);

    let icon = parse_icon(&data).expect("parse icon00.icn");
    assert_eq!(icon.header.vertex_count, 1);
    assert_eq!(icon.vertex_data.len(), 1);
    assert_eq!(icon.vertex_data[0].len(), 1);
    assert!(icon.texture.is_none());
}

#[test]
fn export_writes_both_files_byte_identical() {
    let (file, icon_sys_bytes, icn_bytes) = build_fixture();
    let card = CardHandle::open(file.path()).expect("open card");

    let dest = tempfile::tempdir().expect("tempdir");
    let out_dir = card.export("MYGAME", dest.path()).expect("export");

    assert_eq!(out_dir, dest.path().join("MYGAME"));
    assert_eq!(
        std::fs::read(out_dir.join("icon.sys")).unwrap(),
        icon_sys_bytes
    );
    assert_eq!(
        std::fs::read(out_dir.join("icon00.icn")).unwrap(),
        icn_bytes
    );
}
