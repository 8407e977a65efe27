//! Compact-length ("shortvec") encoding
//!
//! 7 payload bits per byte, least-significant group first, high bit set on
//! every byte except the last. Three bytes carry at most 21 bits.

use super::errors::{CodecError, CodecResult};

/// Largest length a compact-length prefix can carry (2^21 - 1)
pub const MAX_SHORTVEC_LEN: usize = (1 << 21) - 1;

/// Maximum encoded size of a compact length
pub const MAX_SHORTVEC_BYTES: usize = 3;

/// Append the compact encoding of `len` to `out`
pub fn write_len(out: &mut Vec<u8>, len: usize) -> CodecResult<()> {
    if len > MAX_SHORTVEC_LEN {
        return Err(CodecError::LengthOverflow {
            len,
            max: MAX_SHORTVEC_LEN,
        });
    }

    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Encode `len` as a standalone compact length
pub fn encode_len(len: usize) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(MAX_SHORTVEC_BYTES);
    write_len(&mut out, len)?;
    Ok(out)
}

/// Decode a compact length from the front of `bytes`
///
/// Returns `(len, bytes_consumed)`.
pub fn decode_len(bytes: &[u8]) -> CodecResult<(usize, usize)> {
    decode_len_at(bytes, 0)
}

/// Decode a compact length starting at `offset`; errors report absolute offsets
pub(crate) fn decode_len_at(bytes: &[u8], offset: usize) -> CodecResult<(usize, usize)> {
    let mut len = 0usize;
    for i in 0..MAX_SHORTVEC_BYTES {
        let pos = offset + i;
        let byte = *bytes
            .get(pos)
            .ok_or_else(|| CodecError::underflow(pos, 1, 0))?;

        len |= ((byte & 0x7f) as usize) << (i * 7);

        if byte & 0x80 == 0 {
            // A zero group after the first byte means a shorter encoding existed
            if i > 0 && byte == 0 {
                return Err(CodecError::ShortVecNonCanonical { offset });
            }
            return Ok((len, i + 1));
        }

        if i == MAX_SHORTVEC_BYTES - 1 {
            return Err(CodecError::ShortVecOverflow { offset: pos });
        }
    }

    // The loop always returns: the last iteration either ends or overflows
    Err(CodecError::ShortVecOverflow { offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_boundary() {
        assert_eq!(encode_len(0).unwrap(), vec![0x00]);
        assert_eq!(encode_len(127).unwrap(), vec![0x7f]);
    }

    #[test]
    fn test_two_byte_boundary() {
        assert_eq!(encode_len(128).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode_len(300).unwrap(), vec![0xac, 0x02]);
        assert_eq!(encode_len(16_383).unwrap(), vec![0xff, 0x7f]);
    }

    #[test]
    fn test_three_byte_boundary() {
        assert_eq!(encode_len(16_384).unwrap(), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_len(MAX_SHORTVEC_LEN).unwrap(), vec![0xff, 0xff, 0x7f]);
    }

    #[test]
    fn test_rejects_oversized_length() {
        let err = encode_len(MAX_SHORTVEC_LEN + 1).unwrap_err();
        assert!(matches!(err, CodecError::LengthOverflow { .. }));
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_len(&[0x7f]).unwrap(), (127, 1));
        assert_eq!(decode_len(&[0x80, 0x01]).unwrap(), (128, 2));
        assert_eq!(decode_len(&[0xac, 0x02, 0xff]).unwrap(), (300, 2));
        assert_eq!(decode_len(&[0xff, 0xff, 0x7f]).unwrap(), (MAX_SHORTVEC_LEN, 3));
    }

    #[test]
    fn test_decode_truncated() {
        let err = decode_len(&[0x80]).unwrap_err();
        assert!(matches!(err, CodecError::BufferUnderflow { offset: 1, .. }));
        assert!(matches!(
            decode_len(&[]).unwrap_err(),
            CodecError::BufferUnderflow { .. }
        ));
    }

    #[test]
    fn test_decode_overflow() {
        let err = decode_len(&[0x80, 0x80, 0x80, 0x01]).unwrap_err();
        assert_eq!(err, CodecError::ShortVecOverflow { offset: 2 });
    }

    #[test]
    fn test_decode_non_canonical() {
        let err = decode_len(&[0x80, 0x00]).unwrap_err();
        assert_eq!(err, CodecError::ShortVecNonCanonical { offset: 0 });
        let err = decode_len(&[0xff, 0x80, 0x00]).unwrap_err();
        assert_eq!(err, CodecError::ShortVecNonCanonical { offset: 0 });
    }
}
