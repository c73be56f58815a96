use std::error;
use std::fmt;
use std::io::{self, Bytes, ErrorKind, Read};

const CONTINUE_MASK: u8 = 0x80;
const VALUE_MASK: u8 = 0x7F;
const SIGN_MASK: u8 = 0x40;

/*
A LEB128 variable-length integer, limited to N bits, is represented by at most
ceil(N/7) bytes. Each byte carries 7 bits of the value, least significant group
first, and the high bit of every byte but the last is set.
*/

#[derive(Debug)]
pub enum Error {
    UnexpectedEof,
    Malformed(&'static str),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnexpectedEof => write!(f, "stream ended inside a varint"),
            Error::Malformed(reason) => write!(f, "malformed varint: {}", reason),
            Error::Io(ref e) => write!(f, "failed reading varint: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if err.kind() == ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(err)
        }
    }
}

fn next_byte<I>(buffer: &mut I) -> Result<u8, Error>
where
    I: Iterator<Item = io::Result<u8>>,
{
    match buffer.next() {
        Some(Ok(byte)) => Ok(byte),
        Some(Err(e)) => Err(Error::from(e)),
        None => Err(Error::UnexpectedEof),
    }
}

fn max_bytes(bits: u32) -> u32 {
    assert!(bits > 0 && bits <= 64, "varints are between 1 and 64 bits wide");
    (bits + 6) / 7
}

/// Reads an unsigned varint of at most `bits` bits.
///
/// A continuation bit on the last permitted byte is an error, and so are
/// value bits beyond the width.
pub fn unsigned<I>(buffer: &mut I, bits: u32) -> Result<u64, Error>
where
    I: Iterator<Item = io::Result<u8>>,
{
    let mut result: u64 = 0;
    let mut shift = 0;
    for _ in 0..max_bytes(bits) {
        let byte = next_byte(buffer)?;
        let group = byte & VALUE_MASK;
        // the last permitted byte only has `bits - shift` bits left
        if shift + 7 > bits && group >> (bits - shift) != 0 {
            return Err(Error::Malformed("value is wider than the encoding allows"));
        }
        result |= u64::from(group) << shift;
        if byte & CONTINUE_MASK == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(Error::Malformed("continue flag present beyond max bits to read"))
}

/// Reads a signed varint of at most `bits` bits, sign extending from the
/// last group read.
///
/// Bits of the last permitted byte beyond the width must repeat the sign.
pub fn signed<I>(buffer: &mut I, bits: u32) -> Result<i64, Error>
where
    I: Iterator<Item = io::Result<u8>>,
{
    let mut result: i64 = 0;
    let mut shift = 0;
    for _ in 0..max_bytes(bits) {
        let byte = next_byte(buffer)?;
        let group = byte & VALUE_MASK;
        if shift + 7 > bits {
            // sign bit and everything above it
            let high = group >> (bits - shift - 1);
            if high != 0 && high != VALUE_MASK >> (bits - shift - 1) {
                return Err(Error::Malformed("value is wider than the encoding allows"));
            }
        }
        result |= i64::from(group) << shift;
        shift += 7;
        if byte & CONTINUE_MASK == 0 {
            if shift < 64 && byte & SIGN_MASK != 0 {
                result |= !0i64 << shift;
            }
            return Ok(result);
        }
    }
    Err(Error::Malformed("continue flag present beyond max bits to read"))
}

/// Varint reads straight off a byte stream, e.g. `reader.bytes().read_varuint(32)`.
pub trait ReadLEB {
    fn read_varuint(&mut self, bits: u32) -> Result<u64, Error>;
    fn read_varint(&mut self, bits: u32) -> Result<i64, Error>;
}

impl<R: Read> ReadLEB for Bytes<R> {
    fn read_varuint(&mut self, bits: u32) -> Result<u64, Error> {
        unsigned(self, bits)
    }

    fn read_varint(&mut self, bits: u32) -> Result<i64, Error> {
        signed(self, bits)
    }
}

/// Appends the shortest unsigned encoding of `value`.
pub fn write_unsigned(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value as u8) & VALUE_MASK;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | CONTINUE_MASK);
    }
}

/// Appends the shortest signed encoding of `value`.
pub fn write_signed(mut value: i64, out: &mut Vec<u8>) {
    loop {
        let byte = (value as u8) & VALUE_MASK;
        value >>= 7;
        let done = (value == 0 && byte & SIGN_MASK == 0) || (value == -1 && byte & SIGN_MASK != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | CONTINUE_MASK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Bytes, Cursor, Read};

    fn x(bytes: Vec<u8>) -> Bytes<Cursor<Vec<u8>>> {
        Cursor::new(bytes).bytes()
    }

    fn unsigned_round_trip(value: u64, bits: u32) -> u64 {
        let mut out = vec![];
        write_unsigned(value, &mut out);
        x(out).read_varuint(bits).unwrap()
    }

    fn signed_round_trip(value: i64, bits: u32) -> i64 {
        let mut out = vec![];
        write_signed(value, &mut out);
        x(out).read_varint(bits).unwrap()
    }

    #[test]
    fn unsigned_reads_1_32() {
        let mut buff = x(vec![1]);
        assert_eq!(unsigned(&mut buff, 32).unwrap(), 1);
    }

    #[test]
    fn unsigned_reads_500_32() {
        let mut buff = x(vec![
            0b1111_0100u8,
            0b0000_0011u8,
        ]);
        assert_eq!(unsigned(&mut buff, 32).unwrap(), 500);
    }

    #[test]
    fn unsigned_accepts_padded_encoding() {
        let mut buff = x(vec![0x83, 0x80, 0x80, 0x80, 0x00]);
        assert_eq!(buff.read_varuint(32).unwrap(), 3);
    }

    #[test]
    fn unsigned_rejects_continued_fifth_byte() {
        let mut buff = x(vec![0xff, 0xff, 0xff, 0xff, 0x8f, 0x01]);
        match buff.read_varuint(32) {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected malformed varint, got {:?}", other),
        }
    }

    #[test]
    fn varuint7_rejects_high_bit() {
        assert!(x(vec![0x80]).read_varuint(7).is_err());
        assert_eq!(x(vec![0x7f]).read_varuint(7).unwrap(), 0x7f);
    }

    #[test]
    fn varuint1_only_reads_flags() {
        assert_eq!(x(vec![0]).read_varuint(1).unwrap(), 0);
        assert_eq!(x(vec![1]).read_varuint(1).unwrap(), 1);
        assert!(x(vec![7]).read_varuint(1).is_err());
    }

    #[test]
    fn truncated_input_is_eof() {
        match x(vec![0x80, 0x80]).read_varuint(32) {
            Err(Error::UnexpectedEof) => {}
            other => panic!("expected eof, got {:?}", other),
        }
        match x(vec![]).read_varint(64) {
            Err(Error::UnexpectedEof) => {}
            other => panic!("expected eof, got {:?}", other),
        }
    }

    #[test]
    fn signed_reads_minus_one() {
        assert_eq!(x(vec![0x7f]).read_varint(32).unwrap() as i32, -1);
        assert_eq!(x(vec![0x7f]).read_varint(64).unwrap(), -1);
    }

    #[test]
    fn signed_reads_i32_min_from_five_bytes() {
        let mut buff = x(vec![0x80, 0x80, 0x80, 0x80, 0x78]);
        assert_eq!(buff.read_varint(32).unwrap() as i32, i32::min_value());
    }

    #[test]
    fn unsigned_rejects_bits_past_width() {
        // 2^32 in five bytes
        match x(vec![0x80, 0x80, 0x80, 0x80, 0x10]).read_varuint(32) {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected malformed varint, got {:?}", other),
        }
        assert_eq!(x(vec![0xff, 0xff, 0xff, 0xff, 0x0f]).read_varuint(32).unwrap(), 0xffff_ffff);
        assert!(x(vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]).read_varuint(64).is_err());
        assert_eq!(
            x(vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]).read_varuint(64).unwrap(),
            u64::max_value()
        );
    }

    #[test]
    fn signed_rejects_high_bits_that_are_not_the_sign() {
        // +2^31 does not fit 32 bits
        match x(vec![0x80, 0x80, 0x80, 0x80, 0x08]).read_varint(32) {
            Err(Error::Malformed(_)) => {}
            other => panic!("expected malformed varint, got {:?}", other),
        }
        assert!(x(vec![0xff, 0xff, 0xff, 0xff, 0x77]).read_varint(32).is_err());
        assert_eq!(x(vec![0xff, 0xff, 0xff, 0xff, 0x07]).read_varint(32).unwrap(), i64::from(i32::max_value()));
        assert_eq!(x(vec![0x80, 0x80, 0x80, 0x80, 0x78]).read_varint(32).unwrap(), i64::from(i32::min_value()));
        assert!(x(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x3f]).read_varint(64).is_err());
    }

    #[test]
    fn signed_rejects_continued_tenth_byte() {
        let mut bytes = vec![0x80; 10];
        bytes.push(0x00);
        assert!(x(bytes).read_varint(64).is_err());
    }

    #[test]
    fn u32_edges_round_trip() {
        for &value in &[0u64, 1, 127, 128, 624_485, u64::from(u32::max_value())] {
            assert_eq!(unsigned_round_trip(value, 32), value);
        }
        let mut out = vec![];
        write_unsigned(u64::from(u32::max_value()), &mut out);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn i32_edges_round_trip() {
        for &value in &[0i32, -1, 63, 64, -64, -65, i32::min_value(), i32::max_value()] {
            assert_eq!(signed_round_trip(i64::from(value), 32) as i32, value);
        }
    }

    #[test]
    fn i64_edges_round_trip() {
        for &value in &[0i64, -1, -123_456, i64::from(i32::min_value()) - 1, i64::min_value(), i64::max_value()] {
            assert_eq!(signed_round_trip(value, 64), value);
        }
        let mut out = vec![];
        write_signed(i64::min_value(), &mut out);
        assert_eq!(out.len(), 10);
    }
}
