//! Schema-driven encoder

use super::errors::{CodecError, CodecResult};
use super::types::{
    EnumPayload, FieldDescriptor, IntType, TypeDescriptor, TypeRegistry, Value, VariantFields,
};

/// Maximum `Defined` nesting before the encoder gives up
pub const MAX_TYPE_DEPTH: usize = 64;

/// Enums with more variants than this use a u32 variant index
pub const U8_VARIANT_LIMIT: usize = 256;

pub(crate) struct Encoder<'r> {
    registry: &'r TypeRegistry,
    out: Vec<u8>,
    depth: usize,
}

impl<'r> Encoder<'r> {
    pub(crate) fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            out: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.out
    }

    pub(crate) fn write(&mut self, value: &Value, ty: &TypeDescriptor) -> CodecResult<()> {
        match ty {
            TypeDescriptor::Bool => match value {
                Value::Bool(b) => {
                    self.out.push(u8::from(*b));
                    Ok(())
                }
                other => Err(CodecError::mismatch("bool", other.kind())),
            },
            TypeDescriptor::Int(int) => self.write_int(value, *int),
            TypeDescriptor::String => match value {
                Value::String(s) => {
                    self.write_u32_len(s.len())?;
                    self.out.extend_from_slice(s.as_bytes());
                    Ok(())
                }
                other => Err(CodecError::mismatch("string", other.kind())),
            },
            TypeDescriptor::Bytes => match value {
                Value::Bytes(bytes) => {
                    self.write_u32_len(bytes.len())?;
                    self.out.extend_from_slice(bytes);
                    Ok(())
                }
                other => Err(CodecError::mismatch("bytes", other.kind())),
            },
            TypeDescriptor::Address => match value {
                Value::Address(key) => {
                    self.out.extend_from_slice(key.as_ref());
                    Ok(())
                }
                other => Err(CodecError::mismatch("pubkey", other.kind())),
            },
            TypeDescriptor::FixedBytes(n) => match value {
                Value::Bytes(bytes) if bytes.len() == *n => {
                    self.out.extend_from_slice(bytes);
                    Ok(())
                }
                Value::Bytes(bytes) => Err(CodecError::LengthMismatch {
                    expected: *n,
                    actual: bytes.len(),
                }),
                other => Err(CodecError::mismatch(ty.describe(), other.kind())),
            },
            TypeDescriptor::Array(inner, n) => match value {
                Value::Array(items) if items.len() == *n => {
                    items.iter().try_for_each(|item| self.write(item, inner))
                }
                Value::Array(items) => Err(CodecError::LengthMismatch {
                    expected: *n,
                    actual: items.len(),
                }),
                other => Err(CodecError::mismatch(ty.describe(), other.kind())),
            },
            TypeDescriptor::Vec(inner) => match value {
                Value::Array(items) => {
                    self.write_u32_len(items.len())?;
                    items.iter().try_for_each(|item| self.write(item, inner))
                }
                // Byte vectors may be handed over as a plain buffer
                Value::Bytes(bytes) if **inner == TypeDescriptor::Int(IntType::U8) => {
                    self.write_u32_len(bytes.len())?;
                    self.out.extend_from_slice(bytes);
                    Ok(())
                }
                other => Err(CodecError::mismatch(ty.describe(), other.kind())),
            },
            TypeDescriptor::Option(inner) => match value {
                Value::Option(None) => {
                    self.out.push(0);
                    Ok(())
                }
                Value::Option(Some(v)) => {
                    self.out.push(1);
                    self.write(v, inner)
                }
                other => Err(CodecError::mismatch(ty.describe(), other.kind())),
            },
            TypeDescriptor::Struct(fields) => match value {
                Value::Struct(values) => self.write_fields(fields, values),
                other => Err(CodecError::mismatch("struct", other.kind())),
            },
            TypeDescriptor::Enum(variants) => {
                let (name, payload) = match value {
                    Value::Enum { variant, payload } => (variant, payload),
                    other => return Err(CodecError::mismatch("enum", other.kind())),
                };
                let (index, variant) = variants
                    .iter()
                    .enumerate()
                    .find(|(_, v)| &v.name == name)
                    .ok_or_else(|| CodecError::UnknownVariant {
                        variant: name.clone(),
                    })?;

                if variants.len() <= U8_VARIANT_LIMIT {
                    self.out.push(index as u8);
                } else {
                    self.out.extend_from_slice(&(index as u32).to_le_bytes());
                }

                match (&variant.fields, payload) {
                    (VariantFields::Unit, EnumPayload::Unit) => Ok(()),
                    (VariantFields::Tuple(types), EnumPayload::Tuple(values)) => {
                        if types.len() != values.len() {
                            return Err(CodecError::LengthMismatch {
                                expected: types.len(),
                                actual: values.len(),
                            });
                        }
                        values
                            .iter()
                            .zip(types)
                            .try_for_each(|(v, t)| self.write(v, t))
                    }
                    (VariantFields::Struct(fields), EnumPayload::Struct(values)) => {
                        self.write_fields(fields, values)
                    }
                    (expected, _) => Err(CodecError::mismatch(
                        format!("{} payload for variant {}", payload_kind(expected), name),
                        "enum",
                    )),
                }
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
                let result = self.write(value, resolved);
                self.depth -= 1;
                result
            }
            TypeDescriptor::Unsupported(name) => Err(CodecError::UnsupportedType(name.clone())),
        }
    }

    fn write_fields(
        &mut self,
        fields: &[FieldDescriptor],
        values: &[(String, Value)],
    ) -> CodecResult<()> {
        for field in fields {
            let value = values
                .iter()
                .find(|(name, _)| name == &field.name)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    CodecError::mismatch(format!("field `{}`", field.name), "missing")
                })?;
            self.write(value, &field.ty)?;
        }
        Ok(())
    }

    fn write_u32_len(&mut self, len: usize) -> CodecResult<()> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow {
            len,
            max: u32::MAX as usize,
        })?;
        self.out.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn write_int(&mut self, value: &Value, int: IntType) -> CodecResult<()> {
        let width = int.width();
        let out_of_range = |rendered: String| CodecError::ValueOutOfRange {
            ty: int.name(),
            value: rendered,
        };

        if int.is_signed() {
            let v = match value {
                Value::Signed(v) => *v,
                Value::Unsigned(v) => {
                    i128::try_from(*v).map_err(|_| out_of_range(v.to_string()))?
                }
                other => return Err(CodecError::mismatch(int.name(), other.kind())),
            };
            let (min, max) = int.signed_range();
            if v < min || v > max {
                return Err(out_of_range(v.to_string()));
            }
            self.out.extend_from_slice(&v.to_le_bytes()[..width]);
        } else {
            let v = match value {
                Value::Unsigned(v) => *v,
                Value::Signed(v) => {
                    u128::try_from(*v).map_err(|_| out_of_range(v.to_string()))?
                }
                other => return Err(CodecError::mismatch(int.name(), other.kind())),
            };
            if v > int.unsigned_max() {
                return Err(out_of_range(v.to_string()));
            }
            self.out.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        Ok(())
    }
}

fn payload_kind(fields: &VariantFields) -> &'static str {
    match fields {
        VariantFields::Unit => "unit",
        VariantFields::Tuple(_) => "tuple",
        VariantFields::Struct(_) => "struct",
    }
}
