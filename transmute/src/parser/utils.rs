use std::io::{self, Read};

use leb::ReadLEB;

use crate::error::TranslateError;

pub fn read_varuint32(reader: &mut dyn Read) -> Result<u32, TranslateError> {
    Ok(reader.bytes().read_varuint(32)? as u32)
}

pub fn read_varuint7(reader: &mut dyn Read) -> Result<u8, TranslateError> {
    Ok(reader.bytes().read_varuint(7)? as u8)
}

pub fn read_varuint1(reader: &mut dyn Read) -> Result<bool, TranslateError> {
    Ok(reader.bytes().read_varuint(1)? == 1)
}

/// A length prefixed UTF-8 string.
pub fn read_string(reader: &mut dyn Read) -> Result<String, TranslateError> {
    let length = u64::from(read_varuint32(reader)?);
    let mut field = vec![];
    let read = reader.take(length).read_to_end(&mut field)?;
    if read as u64 != length {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    String::from_utf8(field).map_err(|e| TranslateError::MalformedEncoding(format!("name is not UTF-8: {}", e)))
}

/// Discards whatever is left of the reader.
pub fn skip(reader: &mut dyn Read) -> Result<u64, TranslateError> {
    Ok(io::copy(reader, &mut io::sink())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_prefixed_string() {
        let mut reader = Cursor::new(vec![3, b'e', b'n', b'v', 9]);
        assert_eq!(read_string(&mut reader).unwrap(), "env");
        assert_eq!(read_varuint7(&mut reader).unwrap(), 9);
    }

    #[test]
    fn index_past_u32_is_malformed() {
        let mut reader = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x10]);
        match read_varuint32(&mut reader) {
            Err(TranslateError::MalformedEncoding(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_string_is_eof() {
        let mut reader = Cursor::new(vec![4, b'e', b'n']);
        assert!(read_string(&mut reader).unwrap_err().is_eof());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut reader = Cursor::new(vec![2, 0xff, 0xfe]);
        match read_string(&mut reader) {
            Err(TranslateError::MalformedEncoding(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
