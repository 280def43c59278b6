use crate::Result;

pub trait BinReader<T> {
    fn read(data: &[u8]) -> Result<T>;
}
