use byteorder::{ReadBytesExt, LE};
use std::io::Cursor;

use crate::color::Color;
use crate::{BinReader, Error, Result};

pub const ICN_MAGIC: u32 = 0x0001_0000;
pub const ANIMATION_HEADER_MAGIC: u32 = 0x01;

pub const TEXTURE_WIDTH: usize = 128;
pub const TEXTURE_HEIGHT: usize = 128;
pub const TEXTURE_PIXEL_COUNT: usize = TEXTURE_WIDTH * TEXTURE_HEIGHT;
pub const TEXTURE_RGB_SIZE: usize = TEXTURE_PIXEL_COUNT * 3;

/// Divisor turning a raw PS2 16.12 fixed-point vertex component into a
/// model-space float. The decoder itself leaves components as raw integers
/// and exposes this constant for whatever consumer eventually renders them.
pub const FIXED_POINT_SCALE: f32 = 4096.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub w: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normal {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub w: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uv {
    pub u: i16,
    pub v: i16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key {
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub shape_id: u32,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, Copy)]
pub struct AnimationHeader {
    pub frame_length: u32,
    pub anim_speed: f32,
    pub play_offset: u32,
    pub frame_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct IcnHeader {
    pub animation_shapes: u32,
    pub tex_type: u32,
    pub vertex_count: u32,
}

/// A decoded `.icn` animated save icon.
#[derive(Debug, Clone)]
pub struct ICN {
    pub header: IcnHeader,
    /// Indexed `[vertex][shape]`: every vertex carries one coordinate per
    /// animation shape, replicated the way the PS2 format stores it.
    pub vertex_data: Vec<Vec<Vertex>>,
    pub normal_data: Vec<Normal>,
    pub uv_data: Vec<Uv>,
    pub color_data: Vec<Color>,
    pub animation_header: AnimationHeader,
    pub frames: Vec<Frame>,
    /// Decoded RGB888 texture, 128x128x3 bytes, when `tex_type & 0b100` is set.
    pub texture: Option<Vec<u8>>,
}

impl BinReader<ICN> for ICN {
    fn read(data: &[u8]) -> Result<ICN> {
        let mut c = Cursor::new(data);

        let header = read_header(&mut c)?;
        let (vertex_data, normal_data, uv_data, color_data) = read_shapes(&mut c, &header)?;
        let (animation_header, frames) = read_animation(&mut c)?;
        let texture = read_texture(&mut c, header.tex_type)?;

        Ok(ICN {
            header,
            vertex_data,
            normal_data,
            uv_data,
            color_data,
            animation_header,
            frames,
            texture,
        })
    }
}

pub fn parse_icon(data: &[u8]) -> Result<ICN> {
    ICN::read(data)
}

fn read_header(c: &mut Cursor<&[u8]>) -> Result<IcnHeader> {
    let magic = c.read_u32::<LE>()?;
    if magic != ICN_MAGIC {
        return Err(Error::Format(format!(
            "icon header magic mismatch: expected {ICN_MAGIC:#x}, got {magic:#x}"
        )));
    }
    let animation_shapes = c.read_u32::<LE>()?;
    let tex_type = c.read_u32::<LE>()?;
    let _padding = c.read_u32::<LE>()?;
    let vertex_count = c.read_u32::<LE>()?;

    Ok(IcnHeader {
        animation_shapes,
        tex_type,
        vertex_count,
    })
}

type Shapes = (Vec<Vec<Vertex>>, Vec<Normal>, Vec<Uv>, Vec<Color>);

fn read_shapes(c: &mut Cursor<&[u8]>, header: &IcnHeader) -> Result<Shapes> {
    let vertex_count = header.vertex_count as usize;
    let animation_shapes = header.animation_shapes as usize;

    let mut vertex_data = Vec::with_capacity(vertex_count);
    let mut normal_data = Vec::with_capacity(vertex_count);
    let mut uv_data = Vec::with_capacity(vertex_count);
    let mut color_data = Vec::with_capacity(vertex_count);

    for _ in 0..vertex_count {
        let mut shapes = Vec::with_capacity(animation_shapes);
        for _ in 0..animation_shapes {
            shapes.push(read_vertex(c)?);
        }
        vertex_data.push(shapes);
        normal_data.push(read_normal(c)?);
        uv_data.push(read_uv(c)?);
        color_data.push(read_color(c)?);
    }

    Ok((vertex_data, normal_data, uv_data, color_data))
}

fn read_vertex(c: &mut Cursor<&[u8]>) -> Result<Vertex> {
    Ok(Vertex {
        x: c.read_i16::<LE>()?,
        y: c.read_i16::<LE>()?,
        z: c.read_i16::<LE>()?,
        w: c.read_u16::<LE>()?,
    })
}

fn read_normal(c: &mut Cursor<&[u8]>) -> Result<Normal> {
    Ok(Normal {
        x: c.read_i16::<LE>()?,
        y: c.read_i16::<LE>()?,
        z: c.read_i16::<LE>()?,
        w: c.read_u16::<LE>()?,
    })
}

fn read_uv(c: &mut Cursor<&[u8]>) -> Result<Uv> {
    Ok(Uv {
        u: c.read_i16::<LE>()?,
        v: c.read_i16::<LE>()?,
    })
}

fn read_color(c: &mut Cursor<&[u8]>) -> Result<Color> {
    let r = c.read_u8()?;
    let g = c.read_u8()?;
    let b = c.read_u8()?;
    let a = c.read_u8()?;
    Ok(Color::new(r, g, b, a))
}

fn read_animation(c: &mut Cursor<&[u8]>) -> Result<(AnimationHeader, Vec<Frame>)> {
    let magic = c.read_u32::<LE>()?;
    if magic != ANIMATION_HEADER_MAGIC {
        return Err(Error::Format(format!(
            "animation header magic mismatch: expected {ANIMATION_HEADER_MAGIC:#x}, got {magic:#x}"
        )));
    }
    let frame_length = c.read_u32::<LE>()?;
    let anim_speed = c.read_f32::<LE>()?;
    let play_offset = c.read_u32::<LE>()?;
    let frame_count = c.read_u32::<LE>()?;

    let mut frames = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        frames.push(read_frame(c)?);
    }

    Ok((
        AnimationHeader {
            frame_length,
            anim_speed,
            play_offset,
            frame_count,
        },
        frames,
    ))
}

fn read_frame(c: &mut Cursor<&[u8]>) -> Result<Frame> {
    let shape_id = c.read_u32::<LE>()?;
    let key_count = c.read_u32::<LE>()?;
    let _unknown0 = c.read_u32::<LE>()?;
    let _unknown1 = c.read_u32::<LE>()?;

    if key_count == 0 {
        return Err(Error::Format(
            "animation frame declares key_count == 0".to_string(),
        ));
    }

    let mut keys = Vec::with_capacity(key_count as usize - 1);
    for _ in 0..key_count - 1 {
        keys.push(Key {
            time: c.read_f32::<LE>()?,
            value: c.read_f32::<LE>()?,
        });
    }

    Ok(Frame { shape_id, keys })
}

fn read_texture(c: &mut Cursor<&[u8]>, tex_type: u32) -> Result<Option<Vec<u8>>> {
    if tex_type & 0b100 == 0 {
        return Ok(None);
    }

    let pixels = if tex_type & 0b1000 != 0 {
        read_texture_compressed(c)?
    } else {
        read_texture_raw(c)?
    };

    if pixels.len() != TEXTURE_PIXEL_COUNT {
        return Err(Error::Format(format!(
            "decoded texture has {} pixels, expected {TEXTURE_PIXEL_COUNT}",
            pixels.len()
        )));
    }

    let mut rgb = Vec::with_capacity(TEXTURE_RGB_SIZE);
    for pixel in pixels {
        let color = Color::from_rgb555(pixel);
        rgb.push(color.r);
        rgb.push(color.g);
        rgb.push(color.b);
    }

    Ok(Some(rgb))
}

fn read_texture_raw(c: &mut Cursor<&[u8]>) -> Result<Vec<u16>> {
    let mut pixels = vec![0u16; TEXTURE_PIXEL_COUNT];
    c.read_u16_into::<LE>(&mut pixels)?;
    Ok(pixels)
}

fn read_texture_compressed(c: &mut Cursor<&[u8]>) -> Result<Vec<u16>> {
    let compressed_size = c.read_u32::<LE>()? as usize;
    if compressed_size % 2 != 0 {
        return Err(Error::Format(
            "RLE compressed_size must be a multiple of 2".to_string(),
        ));
    }
    let mut compressed = vec![0u16; compressed_size / 2];
    c.read_u16_into::<LE>(&mut compressed)?;

    decode_rle(&compressed)
}

/// Decodes a stream of RLE codes into raw 16-bit pixels. A code with its top
/// bit set is a literal run of `0x8000 - (code ^ 0x8000)` pixels copied
/// verbatim from the stream; otherwise it is a repeat run of the single
/// pixel that follows, repeated `code` times. A repeat count of 0 is a pure
/// no-op: it consumes only the code word, not a pixel word.
fn decode_rle(compressed: &[u16]) -> Result<Vec<u16>> {
    let mut pixels = Vec::new();
    let mut offset = 0usize;

    while offset < compressed.len() {
        let code = compressed[offset];
        offset += 1;

        if code & 0x8000 != 0 {
            let count = (0x8000 - (code ^ 0x8000)) as usize;
            let end = offset + count;
            let slice = compressed
                .get(offset..end)
                .ok_or_else(|| Error::Format("RLE literal run overruns compressed stream".to_string()))?;
            pixels.extend_from_slice(slice);
            offset = end;
        } else {
            let count = code as usize;
            if count > 0 {
                let pixel = *compressed
                    .get(offset)
                    .ok_or_else(|| Error::Format("RLE repeat run overruns compressed stream".to_string()))?;
                offset += 1;
                pixels.extend(std::iter::repeat(pixel).take(count));
            }
        }
    }

    Ok(pixels)
}
