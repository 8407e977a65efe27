//! Schema-driven binary codec
//!
//! Encodes and decodes [`Value`]s according to a [`TypeDescriptor`]:
//!
//! - integers are little-endian, two's complement for signed kinds
//! - `bool` is one byte, 0 or 1
//! - strings, byte buffers and vectors carry a u32 length prefix
//! - options carry a 1-byte presence tag
//! - enums carry a u8 variant index (u32 above 256 variants)
//! - structs and fixed arrays are concatenated without a prefix
//!
//! Encoding is all-or-nothing: a failed encode never leaves partial bytes in
//! the caller's buffer. Decoding reports how many bytes it consumed.
//!
//! The compact-length prefix used by transaction messages lives in
//! [`shortvec`].

mod decode;
mod encode;
pub mod errors;
pub mod shortvec;
pub mod types;

pub use decode::MAX_ZERO_WIDTH_ELEMENTS;
pub use errors::{CodecError, CodecResult};
pub use types::{
    EnumPayload, FieldDescriptor, IntType, TypeDescriptor, TypeRegistry, Value, VariantDescriptor,
    VariantFields,
};

use decode::Decoder;
use encode::Encoder;
use once_cell::sync::Lazy;
use std::sync::Arc;

static EMPTY_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Codec bound to a registry of named types
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone, Default)]
pub struct BinaryCodec {
    registry: Arc<TypeRegistry>,
}

impl BinaryCodec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Encode `value` as `ty`
    pub fn encode(&self, value: &Value, ty: &TypeDescriptor) -> CodecResult<Vec<u8>> {
        encode_with(value, ty, &self.registry)
    }

    /// Append the encoding of `value` to `out`; `out` is untouched on error
    pub fn encode_into(&self, value: &Value, ty: &TypeDescriptor, out: &mut Vec<u8>) -> CodecResult<()> {
        let bytes = self.encode(value, ty)?;
        out.extend_from_slice(&bytes);
        Ok(())
    }

    /// Decode one `ty` from the front of `bytes`, returning the bytes consumed
    pub fn decode(&self, bytes: &[u8], ty: &TypeDescriptor) -> CodecResult<(Value, usize)> {
        decode_with(bytes, ty, &self.registry)
    }

    /// Decode one `ty` that must span all of `bytes`
    pub fn decode_exact(&self, bytes: &[u8], ty: &TypeDescriptor) -> CodecResult<Value> {
        let (value, consumed) = self.decode(bytes, ty)?;
        if consumed != bytes.len() {
            return Err(CodecError::TrailingBytes {
                remaining: bytes.len() - consumed,
            });
        }
        Ok(value)
    }
}

/// Encode without named types
pub fn encode(value: &Value, ty: &TypeDescriptor) -> CodecResult<Vec<u8>> {
    encode_with(value, ty, &EMPTY_REGISTRY)
}

/// Encode resolving `Defined` references through `registry`
pub fn encode_with(value: &Value, ty: &TypeDescriptor, registry: &TypeRegistry) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::new(registry);
    encoder.write(value, ty)?;
    Ok(encoder.finish())
}

/// Decode without named types
pub fn decode(bytes: &[u8], ty: &TypeDescriptor) -> CodecResult<(Value, usize)> {
    decode_with(bytes, ty, &EMPTY_REGISTRY)
}

/// Decode resolving `Defined` references through `registry`
pub fn decode_with(
    bytes: &[u8],
    ty: &TypeDescriptor,
    registry: &TypeRegistry,
) -> CodecResult<(Value, usize)> {
    let mut decoder = Decoder::new(bytes, registry);
    let value = decoder.read(ty)?;
    tracing::trace!(
        ty = %ty.describe(),
        consumed = decoder.position(),
        remaining = decoder.remaining(),
        "decoded value"
    );
    Ok((value, decoder.position()))
}
