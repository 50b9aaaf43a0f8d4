//! Little-endian cursor helpers shared by the container header and the binary codec.

pub(crate) fn put_u8(target: &mut Vec<u8>, value: u8) {
    target.push(value);
}

pub(crate) fn put_u16(target: &mut Vec<u8>, value: u16) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(target: &mut Vec<u8>, value: u32) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_i128(target: &mut Vec<u8>, value: i128) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_f32(target: &mut Vec<u8>, value: f32) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_f64(target: &mut Vec<u8>, value: f64) {
    target.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_string(target: &mut Vec<u8>, value: &str) -> Result<(), &'static str> {
    let bytes = value.as_bytes();
    let len = u32::try_from(bytes.len()).map_err(|_| "string too long for u32 length")?;
    put_u32(target, len);
    target.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn put_blob(target: &mut Vec<u8>, value: &[u8]) -> Result<(), &'static str> {
    let len = u32::try_from(value.len()).map_err(|_| "blob too long for u32 length")?;
    put_u32(target, len);
    target.extend_from_slice(value);
    Ok(())
}

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.cursor == self.bytes.len()
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8], &'static str> {
        let end = self.cursor.saturating_add(len);
        if end > self.bytes.len() {
            return Err("unexpected end of data");
        }
        let out = &self.bytes[self.cursor..end];
        self.cursor = end;
        Ok(out)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], &'static str> {
        self.read_exact(N)?
            .try_into()
            .map_err(|_| "invalid fixed-width field")
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, &'static str> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, &'static str> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, &'static str> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_i128(&mut self) -> Result<i128, &'static str> {
        Ok(i128::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, &'static str> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, &'static str> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_string(&mut self) -> Result<String, &'static str> {
        let len = self.read_u32()? as usize;
        let raw = self.read_exact(len)?;
        std::str::from_utf8(raw)
            .map(ToString::to_string)
            .map_err(|_| "invalid UTF-8 string")
    }

    pub(crate) fn read_blob(&mut self) -> Result<Vec<u8>, &'static str> {
        let len = self.read_u32()? as usize;
        Ok(self.read_exact(len)?.to_vec())
    }
}
