use crate::error::FRes;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Binary encoding of the store catalog entries.
pub(crate) trait BinaryFormat {
    fn write(&self, write: &mut dyn Write) -> FRes<()>;
    fn read(read: &mut dyn Read) -> FRes<Self>
    where
        Self: Sized;
}

impl BinaryFormat for String {
    fn write(&self, write: &mut dyn Write) -> FRes<()> {
        let b = self.as_bytes();
        WriteBytesExt::write_u32::<BigEndian>(write, b.len() as u32)?;
        write.write_all(b)?;
        Ok(())
    }
    fn read(read: &mut dyn Read) -> FRes<String> {
        let size = ReadBytesExt::read_u32::<BigEndian>(read)? as usize;
        let mut buff = vec![0; size];
        read.read_exact(&mut buff)?;
        String::from_utf8(buff).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}

impl<T: BinaryFormat> BinaryFormat for Vec<T> {
    fn write(&self, write: &mut dyn Write) -> FRes<()> {
        WriteBytesExt::write_u32::<BigEndian>(write, self.len() as u32)?;
        for v in self {
            v.write(write)?;
        }
        Ok(())
    }
    fn read(read: &mut dyn Read) -> FRes<Vec<T>> {
        let len = ReadBytesExt::read_u32::<BigEndian>(read)?;
        let mut v = Vec::new();
        for _ in 0..len {
            v.push(T::read(read)?);
        }
        Ok(v)
    }
}
