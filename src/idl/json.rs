//! JSON <-> [`Value`] conversion guided by a type descriptor
//!
//! - integers: JSON numbers, or decimal strings for values past `u64`/`i64`
//! - addresses: base58 strings
//! - byte buffers: arrays of numbers or `0x`-prefixed hex strings
//! - options: `null` or the inner value
//! - enums: `"Variant"` for unit variants, `{"Variant": payload}` otherwise

use super::errors::{IdlError, IdlResult};
use crate::codec::{EnumPayload, TypeDescriptor, TypeRegistry, Value, VariantFields};
use serde_json::{Map, Number, Value as Json};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Build a [`Value`] of type `ty` from JSON
pub fn value_from_json(json: &Json, ty: &TypeDescriptor, registry: &TypeRegistry) -> IdlResult<Value> {
    from_json_at(json, ty, registry, 0)
}

const MAX_DEPTH: usize = 64;

fn from_json_at(json: &Json, ty: &TypeDescriptor, registry: &TypeRegistry, depth: usize) -> IdlResult<Value> {
    let fail = |reason: &str| IdlError::json(ty.describe(), reason);
    if depth > MAX_DEPTH {
        return Err(fail("nesting too deep"));
    }
    let recurse = |json: &Json, ty: &TypeDescriptor| from_json_at(json, ty, registry, depth + 1);

    match ty {
        TypeDescriptor::Bool => json.as_bool().map(Value::Bool).ok_or_else(|| fail("expected boolean")),
        TypeDescriptor::Int(int) => {
            if int.is_signed() {
                parse_i128(json).map(Value::Signed).ok_or_else(|| fail("expected integer"))
            } else {
                parse_u128(json).map(Value::Unsigned).ok_or_else(|| fail("expected unsigned integer"))
            }
        }
        TypeDescriptor::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| fail("expected string")),
        TypeDescriptor::Address => json
            .as_str()
            .ok_or_else(|| fail("expected base58 string"))
            .and_then(|s| Pubkey::from_str(s).map_err(|e| fail(&e.to_string())))
            .map(Value::Address),
        TypeDescriptor::Bytes | TypeDescriptor::FixedBytes(_) => parse_bytes(json).map(Value::Bytes).map_err(|e| fail(&e)),
        TypeDescriptor::Array(inner, _) | TypeDescriptor::Vec(inner) => {
            if let (TypeDescriptor::Vec(_), Json::String(_)) = (ty, json) {
                // vec<u8> may be given as hex
                return parse_bytes(json).map(Value::Bytes).map_err(|e| fail(&e));
            }
            let items = json.as_array().ok_or_else(|| fail("expected array"))?;
            items
                .iter()
                .map(|item| recurse(item, inner.as_ref()))
                .collect::<IdlResult<Vec<_>>>()
                .map(Value::Array)
        }
        TypeDescriptor::Option(inner) => match json {
            Json::Null => Ok(Value::none()),
            other => recurse(other, inner.as_ref()).map(Value::some),
        },
        TypeDescriptor::Struct(fields) => {
            let object = json.as_object().ok_or_else(|| fail("expected object"))?;
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let raw = object
                    .get(&field.name)
                    .ok_or_else(|| fail(&format!("missing field `{}`", field.name)))?;
                values.push((field.name.clone(), recurse(raw, &field.ty)?));
            }
            Ok(Value::Struct(values))
        }
        TypeDescriptor::Enum(variants) => {
            let (name, payload) = match json {
                Json::String(name) => (name.as_str(), None),
                Json::Object(map) if map.len() == 1 => {
                    let (name, payload) = map.iter().next().ok_or_else(|| fail("empty object"))?;
                    (name.as_str(), Some(payload))
                }
                _ => return Err(fail("expected variant name or single-key object")),
            };
            let variant = variants
                .iter()
                .find(|v| v.name == name)
                .ok_or_else(|| fail(&format!("unknown variant `{}`", name)))?;

            let payload = match (&variant.fields, payload) {
                (VariantFields::Unit, None) => EnumPayload::Unit,
                (VariantFields::Unit, Some(Json::Null)) => EnumPayload::Unit,
                (VariantFields::Tuple(types), Some(Json::Array(items))) if items.len() == types.len() => {
                    EnumPayload::Tuple(
                        items
                            .iter()
                            .zip(types)
                            .map(|(item, ty)| recurse(item, ty))
                            .collect::<IdlResult<Vec<_>>>()?,
                    )
                }
                (VariantFields::Struct(fields), Some(payload)) if payload.is_object() => {
                    match recurse(payload, &TypeDescriptor::Struct(fields.clone()))? {
                        Value::Struct(values) => EnumPayload::Struct(values),
                        _ => return Err(fail("expected struct payload")),
                    }
                }
                _ => return Err(fail(&format!("payload does not match variant `{}`", name))),
            };
            Ok(Value::Enum {
                variant: variant.name.clone(),
                payload,
            })
        }
        TypeDescriptor::Defined(name) => {
            let resolved = registry
                .get(name)
                .ok_or_else(|| IdlError::unknown("type", name.clone()))?;
            recurse(json, resolved)
        }
        TypeDescriptor::Unsupported(name) => Err(fail(&format!("type `{}` has no layout", name))),
    }
}

fn parse_u128(json: &Json) -> Option<u128> {
    match json {
        Json::Number(n) => n.as_u64().map(u128::from),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_i128(json: &Json) -> Option<i128> {
    match json {
        Json::Number(n) => n.as_i64().map(i128::from),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_bytes(json: &Json) -> Result<Vec<u8>, String> {
    match json {
        Json::String(s) => {
            let hex_str = s.strip_prefix("0x").ok_or("hex strings must start with 0x")?;
            hex::decode(hex_str).map_err(|e| e.to_string())
        }
        Json::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| "byte arrays hold numbers 0-255".to_string())
            })
            .collect(),
        _ => Err("expected byte array or hex string".to_string()),
    }
}

/// Render a decoded [`Value`] as JSON
///
/// Integers that fit 64 bits become JSON numbers; wider ones become decimal
/// strings. Byte buffers render as `0x` hex.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Unsigned(v) => match u64::try_from(*v) {
            Ok(v) => Json::Number(Number::from(v)),
            Err(_) => Json::String(v.to_string()),
        },
        Value::Signed(v) => match i64::try_from(*v) {
            Ok(v) => Json::Number(Number::from(v)),
            Err(_) => Json::String(v.to_string()),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => Json::String(format!("0x{}", hex::encode(bytes))),
        Value::Address(key) => Json::String(key.to_string()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Option(None) => Json::Null,
        Value::Option(Some(inner)) => value_to_json(inner),
        Value::Struct(fields) => Json::Object(fields_to_json(fields)),
        Value::Enum { variant, payload } => match payload {
            EnumPayload::Unit => Json::String(variant.clone()),
            EnumPayload::Tuple(items) => {
                let mut map = Map::new();
                map.insert(variant.clone(), Json::Array(items.iter().map(value_to_json).collect()));
                Json::Object(map)
            }
            EnumPayload::Struct(fields) => {
                let mut map = Map::new();
                map.insert(variant.clone(), Json::Object(fields_to_json(fields)));
                Json::Object(map)
            }
        },
    }
}

fn fields_to_json(fields: &[(String, Value)]) -> Map<String, Json> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect()
}
