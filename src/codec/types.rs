//! Type descriptors and the dynamic value model
//!
//! A [`TypeDescriptor`] says how bytes are laid out; a [`Value`] is the data
//! being laid out. Descriptors normally come from an IDL document (see
//! [`crate::idl`]), but can be built by hand for ad-hoc layouts.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

/// Integer kinds supported by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntType {
    U8,
    U16,
    U32,
    U64,
    U128,
    I8,
    I16,
    I32,
    I64,
    I128,
}

impl IntType {
    /// Encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
            Self::U64 | Self::I64 => 8,
            Self::U128 | Self::I128 => 16,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128
        )
    }

    /// IDL spelling of the type
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
        }
    }

    /// Parse the IDL spelling
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "u128" => Self::U128,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "i128" => Self::I128,
            _ => return None,
        })
    }

    /// Largest unsigned value representable (unsigned kinds only)
    pub(crate) const fn unsigned_max(self) -> u128 {
        match self.width() {
            16 => u128::MAX,
            w => (1u128 << (w * 8)) - 1,
        }
    }

    /// Inclusive signed range (signed kinds only)
    pub(crate) const fn signed_range(self) -> (i128, i128) {
        match self.width() {
            16 => (i128::MIN, i128::MAX),
            w => {
                let max = (1i128 << (w * 8 - 1)) - 1;
                (-max - 1, max)
            }
        }
    }
}

/// A named field of a struct or struct-like enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Payload layout of one enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFields {
    Unit,
    Tuple(Vec<TypeDescriptor>),
    Struct(Vec<FieldDescriptor>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub name: String,
    pub fields: VariantFields,
}

impl VariantDescriptor {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: VariantFields::Unit,
        }
    }

    pub fn tuple(name: impl Into<String>, fields: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields: VariantFields::Tuple(fields),
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields: VariantFields::Struct(fields),
        }
    }
}

/// Layout description of an encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Bool,
    Int(IntType),
    /// u32 length prefix + UTF-8 bytes
    String,
    /// u32 length prefix + raw bytes
    Bytes,
    /// 32 raw bytes
    Address,
    /// `n` raw bytes, no prefix
    FixedBytes(usize),
    /// `n` elements, no prefix
    Array(Box<TypeDescriptor>, usize),
    /// u32 length prefix + elements
    Vec(Box<TypeDescriptor>),
    /// 1-byte presence tag + value
    Option(Box<TypeDescriptor>),
    Struct(Vec<FieldDescriptor>),
    Enum(Vec<VariantDescriptor>),
    /// Reference to a named type in a [`TypeRegistry`]
    Defined(String),
    /// A type the schema names but the codec has no layout for (floats, maps)
    Unsupported(String),
}

impl TypeDescriptor {
    pub fn vec(inner: TypeDescriptor) -> Self {
        Self::Vec(Box::new(inner))
    }

    pub fn option(inner: TypeDescriptor) -> Self {
        Self::Option(Box::new(inner))
    }

    pub fn array(inner: TypeDescriptor, len: usize) -> Self {
        Self::Array(Box::new(inner), len)
    }

    pub fn defined(name: impl Into<String>) -> Self {
        Self::Defined(name.into())
    }

    /// Short human-readable name used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Int(int) => int.name().to_string(),
            Self::String => "string".to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::Address => "pubkey".to_string(),
            Self::FixedBytes(n) => format!("[u8; {}]", n),
            Self::Array(inner, n) => format!("[{}; {}]", inner.describe(), n),
            Self::Vec(inner) => format!("vec<{}>", inner.describe()),
            Self::Option(inner) => format!("option<{}>", inner.describe()),
            Self::Struct(_) => "struct".to_string(),
            Self::Enum(_) => "enum".to_string(),
            Self::Defined(name) => name.clone(),
            Self::Unsupported(name) => name.clone(),
        }
    }
}

/// Payload of a decoded or to-be-encoded enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumPayload {
    Unit,
    Tuple(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

/// Dynamically typed value
///
/// Integers are held at full width (`u128`/`i128`) and range-checked against
/// the declared type when encoded. Decoding always yields `Unsigned` for
/// unsigned kinds and `Signed` for signed kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Unsigned(u128),
    Signed(i128),
    String(String),
    Bytes(Vec<u8>),
    Address(Pubkey),
    Array(Vec<Value>),
    Option(Option<Box<Value>>),
    Struct(Vec<(String, Value)>),
    Enum { variant: String, payload: EnumPayload },
}

impl Value {
    /// Kind name used in type-mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Unsigned(_) => "unsigned",
            Self::Signed(_) => "signed",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Address(_) => "address",
            Self::Array(_) => "array",
            Self::Option(_) => "option",
            Self::Struct(_) => "struct",
            Self::Enum { .. } => "enum",
        }
    }

    pub fn some(inner: Value) -> Self {
        Self::Option(Some(Box::new(inner)))
    }

    pub fn none() -> Self {
        Self::Option(None)
    }

    /// Build a struct value from `(name, value)` pairs
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn unit_variant(name: impl Into<String>) -> Self {
        Self::Enum {
            variant: name.into(),
            payload: EnumPayload::Unit,
        }
    }

    /// Look up a struct field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Signed(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Pubkey> {
        match self {
            Self::Address(key) => Some(key),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Unsigned(v as u128)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Signed(v as i128)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Pubkey> for Value {
    fn from(v: Pubkey) -> Self {
        Self::Address(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Named types available to `Defined` references
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a named type
    pub fn insert(&mut self, name: impl Into<String>, ty: TypeDescriptor) -> Option<TypeDescriptor> {
        self.types.insert(name.into(), ty)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_ranges() {
        assert_eq!(IntType::U8.unsigned_max(), 255);
        assert_eq!(IntType::U64.unsigned_max(), u64::MAX as u128);
        assert_eq!(IntType::U128.unsigned_max(), u128::MAX);
        assert_eq!(IntType::I8.signed_range(), (-128, 127));
        assert_eq!(IntType::I32.signed_range(), (i32::MIN as i128, i32::MAX as i128));
        assert_eq!(IntType::I128.signed_range(), (i128::MIN, i128::MAX));
    }

    #[test]
    fn test_int_names_roundtrip() {
        for int in [IntType::U8, IntType::U128, IntType::I16, IntType::I64] {
            assert_eq!(IntType::from_name(int.name()), Some(int));
        }
        assert_eq!(IntType::from_name("f32"), None);
    }

    #[test]
    fn test_value_field_lookup() {
        let value = Value::record([("amount", Value::from(5u64)), ("memo", Value::from("hi"))]);
        assert_eq!(value.field("amount").and_then(Value::as_u128), Some(5));
        assert_eq!(value.field("memo").and_then(Value::as_str), Some("hi"));
        assert!(value.field("missing").is_none());
    }

    #[test]
    fn test_describe() {
        let ty = TypeDescriptor::vec(TypeDescriptor::option(TypeDescriptor::Int(IntType::U16)));
        assert_eq!(ty.describe(), "vec<option<u16>>");
        assert_eq!(TypeDescriptor::FixedBytes(32).describe(), "[u8; 32]");
    }
}
