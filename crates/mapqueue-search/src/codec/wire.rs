//! Byte-level primitives. Fixed-width integers are big-endian, variable
//! ones LEB128 (zigzag for signed).

use super::CodecError;

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    pub fn zigzag(&mut self, v: i64) {
        self.varint(((v << 1) ^ (v >> 63)) as u64);
    }

    /// Length-prefixed UTF-8.
    pub fn str(&mut self, s: &str) {
        self.varint(s.len() as u64);
        self.bytes(s.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn varint(&mut self) -> Result<u64, CodecError> {
        let start = self.pos;
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            let bits = (byte & 0x7f) as u64;
            if shift == 63 && bits > 1 {
                return Err(CodecError::VarintOverflow { offset: start });
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::VarintOverflow { offset: start })
    }

    pub fn zigzag(&mut self) -> Result<i64, CodecError> {
        let v = self.varint()?;
        Ok(((v >> 1) as i64) ^ -((v & 1) as i64))
    }

    /// Length prefix checked against the remaining input before allocating.
    pub fn len_prefix(&mut self) -> Result<usize, CodecError> {
        let offset = self.pos;
        let n = self.varint()?;
        let remaining = (self.buf.len() - self.pos) as u64;
        if n > remaining {
            return Err(CodecError::Truncated {
                offset,
                needed: (n - remaining) as usize,
            });
        }
        Ok(n as usize)
    }

    pub fn str(&mut self) -> Result<String, CodecError> {
        let len = self.len_prefix()?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset })
    }

    pub fn finish(&self) -> Result<(), CodecError> {
        if self.pos != self.buf.len() {
            return Err(CodecError::TrailingBytes { offset: self.pos });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn varint_known_encodings() {
        let mut w = Writer::new();
        w.varint(0);
        w.varint(127);
        w.varint(128);
        w.varint(300);
        assert_eq!(w.into_bytes(), vec![0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);
    }

    #[test]
    fn zigzag_small_magnitudes_stay_small() {
        let mut w = Writer::new();
        w.zigzag(-1);
        w.zigzag(1);
        w.zigzag(-64);
        assert_eq!(w.into_bytes(), vec![0x01, 0x02, 0x7f]);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = Reader::new(&[0x01]);
        r.u8().unwrap();
        match r.u16() {
            Err(CodecError::Truncated { offset, needed }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overlong_varint_rejected() {
        let bytes = [0xffu8; 11];
        let mut r = Reader::new(&bytes);
        assert!(matches!(r.varint(), Err(CodecError::VarintOverflow { offset: 0 })));
    }

    #[test]
    fn string_length_beyond_input() {
        let mut w = Writer::new();
        w.varint(10);
        w.bytes(b"abc");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert!(matches!(
            r.str(),
            Err(CodecError::Truncated { offset: 0, needed: 7 })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let bytes = [0x02, 0xc3, 0x28];
        let mut r = Reader::new(&bytes);
        assert!(matches!(r.str(), Err(CodecError::InvalidUtf8 { offset: 1 })));
    }

    #[test]
    fn trailing_bytes() {
        let r = Reader::new(&[0x00]);
        assert!(matches!(r.finish(), Err(CodecError::TrailingBytes { offset: 0 })));
    }

    proptest! {
        #[test]
        fn varint_round_trip(v in any::<u64>()) {
            let mut w = Writer::new();
            w.varint(v);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            prop_assert_eq!(r.varint().unwrap(), v);
            prop_assert!(r.finish().is_ok());
        }

        #[test]
        fn zigzag_round_trip(v in any::<i64>()) {
            let mut w = Writer::new();
            w.zigzag(v);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            prop_assert_eq!(r.zigzag().unwrap(), v);
        }
    }
}
