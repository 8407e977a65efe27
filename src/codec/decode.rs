//! Schema-driven decoder

use super::encode::{MAX_TYPE_DEPTH, U8_VARIANT_LIMIT};
use super::errors::{CodecError, CodecResult};
use super::types::{
    EnumPayload, FieldDescriptor, IntType, TypeDescriptor, TypeRegistry, Value, VariantFields,
};
use solana_sdk::pubkey::Pubkey;

/// Upper bound on elements preallocated from an untrusted length prefix
const PREALLOC_LIMIT: usize = 1024;

/// Elements occupying zero bytes that a single decode may produce
///
/// Their count cannot be checked against the remaining input, so it is
/// bounded across the whole decode instead.
pub const MAX_ZERO_WIDTH_ELEMENTS: usize = 4096;

/// Type nodes visited when computing an element's minimum size
const MIN_SIZE_VISITS: usize = 4096;

pub(crate) struct Decoder<'a, 'r> {
    data: &'a [u8],
    pos: usize,
    registry: &'r TypeRegistry,
    depth: usize,
    zero_width_left: usize,
}

impl<'a, 'r> Decoder<'a, 'r> {
    pub(crate) fn new(data: &'a [u8], registry: &'r TypeRegistry) -> Self {
        Self {
            data,
            pos: 0,
            registry,
            depth: 0,
            zero_width_left: MAX_ZERO_WIDTH_ELEMENTS,
        }
    }

    /// Bytes consumed so far
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::underflow(self.pos, n, self.remaining()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> CodecResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a u32 length prefix and make sure the payload can exist
    ///
    /// `min_elem` is the smallest encoded size of one element; a length that
    /// cannot possibly fit in the remaining bytes fails before allocating.
    fn take_len(&mut self, min_elem: usize) -> CodecResult<usize> {
        let len = self.take_u32()? as usize;
        if min_elem == 0 {
            self.charge_zero_width(len)?;
            return Ok(len);
        }
        let needed = len.saturating_mul(min_elem);
        if needed > self.remaining() {
            return Err(CodecError::underflow(self.pos, needed, self.remaining()));
        }
        Ok(len)
    }

    fn charge_zero_width(&mut self, count: usize) -> CodecResult<()> {
        if count > self.zero_width_left {
            return Err(CodecError::LengthOverflow {
                len: (MAX_ZERO_WIDTH_ELEMENTS - self.zero_width_left).saturating_add(count),
                max: MAX_ZERO_WIDTH_ELEMENTS,
            });
        }
        self.zero_width_left -= count;
        Ok(())
    }

    pub(crate) fn read(&mut self, ty: &TypeDescriptor) -> CodecResult<Value> {
        match ty {
            TypeDescriptor::Bool => {
                let offset = self.pos;
                match self.take_u8()? {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    byte => Err(CodecError::InvalidBool { offset, byte }),
                }
            }
            TypeDescriptor::Int(int) => self.read_int(*int),
            TypeDescriptor::String => {
                let len = self.take_len(1)?;
                let offset = self.pos;
                let bytes = self.take(len)?;
                std::str::from_utf8(bytes)
                    .map(|s| Value::String(s.to_string()))
                    .map_err(|_| CodecError::InvalidUtf8 { offset })
            }
            TypeDescriptor::Bytes => {
                let len = self.take_len(1)?;
                Ok(Value::Bytes(self.take(len)?.to_vec()))
            }
            TypeDescriptor::Address => {
                let bytes = self.take(32)?;
                let mut key = [0u8; 32];
                key.copy_from_slice(bytes);
                Ok(Value::Address(Pubkey::new_from_array(key)))
            }
            TypeDescriptor::FixedBytes(n) => Ok(Value::Bytes(self.take(*n)?.to_vec())),
            TypeDescriptor::Array(inner, n) => {
                if *n > 0 && self.min_encoded_size(inner) == 0 {
                    self.charge_zero_width(*n)?;
                }
                let items = (0..*n)
                    .map(|_| self.read(inner))
                    .collect::<CodecResult<Vec<_>>>()?;
                Ok(Value::Array(items))
            }
            TypeDescriptor::Vec(inner) => {
                let len = self.take_len(self.min_encoded_size(inner))?;
                let mut items = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                for _ in 0..len {
                    items.push(self.read(inner)?);
                }
                Ok(Value::Array(items))
            }
            TypeDescriptor::Option(inner) => {
                let offset = self.pos;
                match self.take_u8()? {
                    0 => Ok(Value::Option(None)),
                    1 => Ok(Value::Option(Some(Box::new(self.read(inner)?)))),
                    tag => Err(CodecError::InvalidOptionTag { offset, tag }),
                }
            }
            TypeDescriptor::Struct(fields) => Ok(Value::Struct(self.read_fields(fields)?)),
            TypeDescriptor::Enum(variants) => {
                let index = if variants.len() <= U8_VARIANT_LIMIT {
                    self.take_u8()? as usize
                } else {
                    self.take_u32()? as usize
                };
                let variant = variants.get(index).ok_or_else(|| CodecError::UnknownVariant {
                    variant: index.to_string(),
                })?;
                let payload = match &variant.fields {
                    VariantFields::Unit => EnumPayload::Unit,
                    VariantFields::Tuple(types) => EnumPayload::Tuple(
                        types
                            .iter()
                            .map(|t| self.read(t))
                            .collect::<CodecResult<Vec<_>>>()?,
                    ),
                    VariantFields::Struct(fields) => EnumPayload::Struct(self.read_fields(fields)?),
                };
                Ok(Value::Enum {
                    variant: variant.name.clone(),
                    payload,
                })
            }
            TypeDescriptor::Defined(name) => {
                let resolved = self
                    .registry
                    .get(name)
                    .ok_or_else(|| CodecError::UndefinedType(name.clone()))?;
                if self.depth >= MAX_TYPE_DEPTH {
                    return Err(CodecError::DepthExceeded {
                        limit: MAX_TYPE_DEPTH,
                    });
                }
                self.depth += 1;
                let result = self.read(resolved);
                self.depth -= 1;
                result
            }
            TypeDescriptor::Unsupported(name) => Err(CodecError::UnsupportedType(name.clone())),
        }
    }

    fn read_fields(&mut self, fields: &[FieldDescriptor]) -> CodecResult<Vec<(String, Value)>> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            values.push((field.name.clone(), self.read(&field.ty)?));
        }
        Ok(values)
    }

    /// Smallest number of bytes one element of `ty` can occupy
    ///
    /// Used to reject absurd length prefixes up front. `Defined` names are
    /// resolved through the registry. Unknown names, unsupported types and
    /// schemas too deep or too large to walk count as 0.
    fn min_encoded_size(&self, ty: &TypeDescriptor) -> usize {
        let mut visits = MIN_SIZE_VISITS;
        self.min_size_within(ty, 0, &mut visits)
    }

    fn min_size_within(&self, ty: &TypeDescriptor, depth: usize, visits: &mut usize) -> usize {
        if *visits == 0 {
            return 0;
        }
        *visits -= 1;
        match ty {
            TypeDescriptor::Bool => 1,
            TypeDescriptor::Int(int) => int.width(),
            TypeDescriptor::String | TypeDescriptor::Bytes | TypeDescriptor::Vec(_) => 4,
            TypeDescriptor::Address => 32,
            TypeDescriptor::FixedBytes(n) => *n,
            TypeDescriptor::Array(inner, n) => self.min_size_within(inner, depth, visits).saturating_mul(*n),
            TypeDescriptor::Option(_) | TypeDescriptor::Enum(_) => 1,
            TypeDescriptor::Struct(fields) => fields
                .iter()
                .map(|f| self.min_size_within(&f.ty, depth, visits))
                .fold(0usize, usize::saturating_add),
            TypeDescriptor::Defined(name) if depth < MAX_TYPE_DEPTH => self
                .registry
                .get(name)
                .map_or(0, |resolved| self.min_size_within(resolved, depth + 1, visits)),
            TypeDescriptor::Defined(_) | TypeDescriptor::Unsupported(_) => 0,
        }
    }

    fn read_int(&mut self, int: IntType) -> CodecResult<Value> {
        let width = int.width();
        let bytes = self.take(width)?;
        let negative = int.is_signed() && bytes[width - 1] & 0x80 != 0;

        let mut wide = if negative { [0xffu8; 16] } else { [0u8; 16] };
        wide[..width].copy_from_slice(bytes);

        Ok(if int.is_signed() {
            Value::Signed(i128::from_le_bytes(wide))
        } else {
            Value::Unsigned(u128::from_le_bytes(wide))
        })
    }
}
