use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read};

use crate::sjis::decode_sjis;
use crate::util::parse_cstring;
use crate::{BinReader, Color, ColorF, Error, Result, Vector};

pub const ICON_SYS_MAGIC: &[u8; 4] = b"PS2D";
pub const ICON_SYS_SIZE: usize = 964;

/// Decoded `icon.sys`, the 964-byte descriptor every PS2 save folder carries
/// alongside its `.icn` icon(s).
#[derive(Debug, Clone)]
pub struct IconSys {
    /// Usage flag: 0 PS2 save file, 1 PS2 software, 3 PocketStation software,
    /// 4 PS2 settings, 5 system driver. Other values are seen in the wild and
    /// are preserved rather than rejected.
    pub flags: u16,
    pub subtitle_line_break: u16,
    /// Raw on-disk value; divide by 128.0 to get the normalized alpha a
    /// renderer expects.
    pub background_transparency: u32,
    /// Upper-left, upper-right, lower-left, lower-right corners.
    pub background_colors: [Color; 4],
    pub light_directions: [Vector; 3],
    pub light_colors: [ColorF; 3],
    pub ambient_color: ColorF,
    /// The subtitle split at `subtitle_line_break` into its two display lines.
    pub subtitle: (String, String),
    pub icon_file_normal: String,
    pub icon_file_copy: String,
    pub icon_file_delete: String,
}

impl IconSys {
    pub fn background_transparency_normalized(&self) -> f32 {
        self.background_transparency as f32 / 128.0
    }
}

impl BinReader<IconSys> for IconSys {
    fn read(data: &[u8]) -> Result<IconSys> {
        if data.len() != ICON_SYS_SIZE {
            return Err(Error::Format(format!(
                "icon.sys must be {ICON_SYS_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let mut c = Cursor::new(data);

        let mut magic = [0u8; 4];
        c.read_exact(&mut magic)?;
        if &magic != ICON_SYS_MAGIC {
            return Err(Error::Format("icon.sys magic mismatch".to_string()));
        }

        let flags = c.read_u16::<LE>()?;
        let subtitle_line_break = c.read_u16::<LE>()?;
        let _reserved = c.read_u32::<LE>()?;
        let background_transparency = c.read_u32::<LE>()?;

        let background_colors = [
            read_background_color(&mut c)?,
            read_background_color(&mut c)?,
            read_background_color(&mut c)?,
            read_background_color(&mut c)?,
        ];

        let light_directions = [
            read_vector(&mut c)?,
            read_vector(&mut c)?,
            read_vector(&mut c)?,
        ];

        let light_colors = [
            read_colorf(&mut c)?,
            read_colorf(&mut c)?,
            read_colorf(&mut c)?,
        ];

        let ambient_color = read_colorf(&mut c)?;

        let mut subtitle_buf = [0u8; 68];
        c.read_exact(&mut subtitle_buf)?;

        let mut icon_file_normal = [0u8; 64];
        c.read_exact(&mut icon_file_normal)?;
        let mut icon_file_copy = [0u8; 64];
        c.read_exact(&mut icon_file_copy)?;
        let mut icon_file_delete = [0u8; 64];
        c.read_exact(&mut icon_file_delete)?;

        let split = (subtitle_line_break as usize).min(subtitle_buf.len());
        let (first, second) = subtitle_buf.split_at(split);

        Ok(IconSys {
            flags,
            subtitle_line_break,
            background_transparency,
            background_colors,
            light_directions,
            light_colors,
            ambient_color,
            subtitle: (decode_sjis(first), decode_sjis(second)),
            icon_file_normal: parse_cstring(&icon_file_normal),
            icon_file_copy: parse_cstring(&icon_file_copy),
            icon_file_delete: parse_cstring(&icon_file_delete),
        })
    }
}

pub fn parse_icon_sys(data: &[u8]) -> Result<IconSys> {
    IconSys::read(data)
}

fn read_background_color(c: &mut Cursor<&[u8]>) -> Result<Color> {
    let r = c.read_u32::<LE>()? as u8;
    let g = c.read_u32::<LE>()? as u8;
    let b = c.read_u32::<LE>()? as u8;
    let a = c.read_u32::<LE>()? as u8;
    Ok(Color::new(r, g, b, a))
}

fn read_colorf(c: &mut Cursor<&[u8]>) -> Result<ColorF> {
    Ok(ColorF {
        r: c.read_f32::<LE>()?,
        g: c.read_f32::<LE>()?,
        b: c.read_f32::<LE>()?,
        a: c.read_f32::<LE>()?,
    })
}

fn read_vector(c: &mut Cursor<&[u8]>) -> Result<Vector> {
    Ok(Vector {
        x: c.read_f32::<LE>()?,
        y: c.read_f32::<LE>()?,
        z: c.read_f32::<LE>()?,
        w: c.read_f32::<LE>()?,
    })
}
