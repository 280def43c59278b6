mod bin;
mod color;
mod error;
mod icn;
mod icon_sys;
mod sjis;
mod util;

pub use bin::BinReader;
pub use color::{Color, ColorF, Vector};
pub use error::{Error, Result};
pub use icn::*;
pub use icon_sys::*;
pub use sjis::{decode_sjis, decode_sjis_strict};
