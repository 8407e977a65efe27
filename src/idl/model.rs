//! Serde model of an Anchor-style IDL document
//!
//! Both document generations are accepted:
//!
//! - the older layout with camelCase instruction names, `isMut`/`isSigner`
//!   account flags and account/event layouts declared inline
//! - the current layout with explicit `discriminator` arrays, `writable` /
//!   `signer` flags and every layout declared under `types`

use super::errors::{IdlError, IdlResult};
use crate::codec::{
    FieldDescriptor, IntType, TypeDescriptor, TypeRegistry, VariantDescriptor, VariantFields,
};
use crate::discriminator::{Discriminator, DiscriminatorKind, DiscriminatorSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idl {
    /// Program address (current layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Program name (older layout keeps it at top level)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IdlMetadata>,

    #[serde(default)]
    pub instructions: Vec<IdlInstruction>,

    #[serde(default)]
    pub accounts: Vec<IdlAccountDef>,

    #[serde(default)]
    pub events: Vec<IdlEventDef>,

    #[serde(default)]
    pub types: Vec<IdlTypeDef>,

    #[serde(default)]
    pub errors: Vec<IdlErrorCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default)]
    pub accounts: Vec<IdlAccountItem>,
    #[serde(default)]
    pub args: Vec<IdlField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlAccountItem {
    pub name: String,
    #[serde(default, alias = "isMut")]
    pub writable: bool,
    #[serde(default, alias = "isSigner")]
    pub signer: bool,
    #[serde(default, alias = "isOptional")]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlAccountDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    /// Inline layout (older layout)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<IdlTypeDefTy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEventDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    /// Inline fields (older layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<IdlField>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefTy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default)]
        fields: IdlDefinedFields,
    },
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
    Type {
        alias: IdlType,
    },
}

/// Named (`[{name, type}]`) or positional (`[type, ...]`) fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlType>),
}

impl Default for IdlDefinedFields {
    fn default() -> Self {
        Self::Named(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IdlDefinedFields>,
}

/// A field type: a primitive name or a wrapper object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlType {
    Primitive(String),
    Vec { vec: Box<IdlType> },
    Option { option: Box<IdlType> },
    Array { array: (Box<IdlType>, usize) },
    Defined { defined: IdlDefinedRef },
    /// Anything else (generics, `coption`, maps); has no byte layout here
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedRef {
    Name(String),
    Object { name: String },
}

impl IdlDefinedRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

impl IdlType {
    pub fn to_descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Primitive(name) => primitive(name),
            Self::Vec { vec } => TypeDescriptor::vec(vec.to_descriptor()),
            Self::Option { option } => TypeDescriptor::option(option.to_descriptor()),
            Self::Array { array: (inner, len) } => match inner.to_descriptor() {
                TypeDescriptor::Int(IntType::U8) => TypeDescriptor::FixedBytes(*len),
                other => TypeDescriptor::array(other, *len),
            },
            Self::Defined { defined } => TypeDescriptor::defined(defined.name()),
            Self::Other(raw) => TypeDescriptor::Unsupported(raw.to_string()),
        }
    }
}

fn primitive(name: &str) -> TypeDescriptor {
    match name {
        "bool" => TypeDescriptor::Bool,
        "string" => TypeDescriptor::String,
        "bytes" => TypeDescriptor::Bytes,
        "publicKey" | "pubkey" => TypeDescriptor::Address,
        other => IntType::from_name(other)
            .map(TypeDescriptor::Int)
            .unwrap_or_else(|| TypeDescriptor::Unsupported(other.to_string())),
    }
}

fn named_fields(fields: &[IdlField]) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .map(|f| FieldDescriptor::new(f.name.clone(), f.ty.to_descriptor()))
        .collect()
}

impl IdlDefinedFields {
    fn to_struct(&self) -> TypeDescriptor {
        match self {
            Self::Named(fields) => TypeDescriptor::Struct(named_fields(fields)),
            // Positional fields are named by index
            Self::Tuple(types) => TypeDescriptor::Struct(
                types
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| FieldDescriptor::new(i.to_string(), ty.to_descriptor()))
                    .collect(),
            ),
        }
    }

    fn to_variant_fields(&self) -> VariantFields {
        match self {
            Self::Named(fields) => VariantFields::Struct(named_fields(fields)),
            Self::Tuple(types) => {
                VariantFields::Tuple(types.iter().map(IdlType::to_descriptor).collect())
            }
        }
    }
}

impl IdlTypeDefTy {
    pub fn to_descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Struct { fields } => fields.to_struct(),
            Self::Enum { variants } => TypeDescriptor::Enum(
                variants
                    .iter()
                    .map(|v| VariantDescriptor {
                        name: v.name.clone(),
                        fields: v
                            .fields
                            .as_ref()
                            .map(IdlDefinedFields::to_variant_fields)
                            .unwrap_or(VariantFields::Unit),
                    })
                    .collect(),
            ),
            Self::Type { alias } => alias.to_descriptor(),
        }
    }
}

impl Idl {
    pub fn from_json(json: &str) -> IdlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> IdlResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| IdlError::Parse(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&content)
    }

    /// Program name from whichever layout carries it
    pub fn program_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .or(self.name.as_deref())
    }

    /// Every named layout: `types`, plus inline account and event layouts
    pub fn type_registry(&self) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for def in &self.types {
            registry.insert(def.name.clone(), def.ty.to_descriptor());
        }
        for account in &self.accounts {
            if let Some(ty) = &account.ty {
                registry.insert(account.name.clone(), ty.to_descriptor());
            }
        }
        for event in &self.events {
            if let Some(fields) = &event.fields {
                registry.insert(event.name.clone(), TypeDescriptor::Struct(named_fields(fields)));
            }
        }
        registry
    }

    pub fn instruction(&self, name: &str) -> IdlResult<&IdlInstruction> {
        self.instructions
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| IdlError::unknown("instruction", name))
    }

    pub fn error_by_code(&self, code: u32) -> Option<&IdlErrorCode> {
        self.errors.iter().find(|e| e.code == code)
    }
}

impl IdlInstruction {
    /// Argument struct layout
    pub fn args_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::Struct(named_fields(&self.args))
    }

    /// Older documents name instructions in camelCase but hash the
    /// snake_case form
    pub fn discriminator_spec(&self) -> IdlResult<DiscriminatorSpec> {
        spec_for(
            DiscriminatorKind::Instruction,
            &to_snake_case(&self.name),
            &self.name,
            self.discriminator.as_deref(),
        )
    }
}

impl IdlAccountDef {
    pub fn discriminator_spec(&self) -> IdlResult<DiscriminatorSpec> {
        spec_for(
            DiscriminatorKind::Account,
            &self.name,
            &self.name,
            self.discriminator.as_deref(),
        )
    }
}

impl IdlEventDef {
    pub fn discriminator_spec(&self) -> IdlResult<DiscriminatorSpec> {
        spec_for(
            DiscriminatorKind::Event,
            &self.name,
            &self.name,
            self.discriminator.as_deref(),
        )
    }
}

fn spec_for(
    kind: DiscriminatorKind,
    hashed_name: &str,
    display_name: &str,
    explicit: Option<&[u8]>,
) -> IdlResult<DiscriminatorSpec> {
    let spec = DiscriminatorSpec::new(kind, hashed_name);
    match explicit {
        None => Ok(spec),
        Some(bytes) => {
            let fixed: Discriminator =
                bytes
                    .try_into()
                    .map_err(|_| IdlError::InvalidDiscriminator {
                        name: display_name.to_string(),
                        len: bytes.len(),
                    })?;
            Ok(spec.with_override(fixed))
        }
    }
}

/// `initializeVault` -> `initialize_vault`
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminator::compute;

    const LEGACY: &str = r#"{
        "name": "vault",
        "instructions": [{
            "name": "initializeVault",
            "accounts": [
                {"name": "vault", "isMut": true, "isSigner": false},
                {"name": "owner", "isMut": true, "isSigner": true}
            ],
            "args": [{"name": "amount", "type": "u64"}]
        }],
        "accounts": [{
            "name": "Vault",
            "type": {"kind": "struct", "fields": [
                {"name": "owner", "type": "publicKey"},
                {"name": "seed", "type": {"array": ["u8", 32]}},
                {"name": "tags", "type": {"vec": "string"}}
            ]}
        }],
        "errors": [{"code": 6000, "name": "Overflow", "msg": "math overflow"}]
    }"#;

    #[test]
    fn test_parse_legacy_layout() {
        let idl = Idl::from_json(LEGACY).unwrap();
        assert_eq!(idl.program_name(), Some("vault"));

        let ix = idl.instruction("initializeVault").unwrap();
        assert!(ix.accounts[0].writable && !ix.accounts[0].signer);
        assert!(ix.accounts[1].signer);
        assert_eq!(
            ix.discriminator_spec().unwrap().resolve(),
            compute(DiscriminatorKind::Instruction, "initialize_vault")
        );

        let registry = idl.type_registry();
        assert_eq!(
            registry.get("Vault"),
            Some(&TypeDescriptor::Struct(vec![
                FieldDescriptor::new("owner", TypeDescriptor::Address),
                FieldDescriptor::new("seed", TypeDescriptor::FixedBytes(32)),
                FieldDescriptor::new("tags", TypeDescriptor::vec(TypeDescriptor::String)),
            ]))
        );
        assert_eq!(idl.error_by_code(6000).map(|e| e.name.as_str()), Some("Overflow"));
    }

    #[test]
    fn test_parse_current_layout() {
        let json = r#"{
            "address": "11111111111111111111111111111111",
            "metadata": {"name": "pool", "version": "0.1.0"},
            "instructions": [{
                "name": "swap",
                "discriminator": [1, 2, 3, 4, 5, 6, 7, 8],
                "accounts": [{"name": "user", "writable": true, "signer": true}],
                "args": [{"name": "side", "type": {"defined": {"name": "Side"}}}]
            }],
            "types": [
                {"name": "Side", "type": {"kind": "enum", "variants": [
                    {"name": "Buy"},
                    {"name": "Sell", "fields": ["u64"]},
                    {"name": "Limit", "fields": [{"name": "price", "type": "u64"}]}
                ]}},
                {"name": "Pair", "type": {"kind": "struct", "fields": ["u8", "i16"]}}
            ]
        }"#;
        let idl = Idl::from_json(json).unwrap();
        assert_eq!(idl.program_name(), Some("pool"));
        assert_eq!(
            idl.instruction("swap").unwrap().discriminator_spec().unwrap().resolve(),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );

        let registry = idl.type_registry();
        match registry.get("Side") {
            Some(TypeDescriptor::Enum(variants)) => {
                assert_eq!(variants[0].fields, VariantFields::Unit);
                assert_eq!(
                    variants[1].fields,
                    VariantFields::Tuple(vec![TypeDescriptor::Int(IntType::U64)])
                );
                assert!(matches!(variants[2].fields, VariantFields::Struct(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            registry.get("Pair"),
            Some(&TypeDescriptor::Struct(vec![
                FieldDescriptor::new("0", TypeDescriptor::Int(IntType::U8)),
                FieldDescriptor::new("1", TypeDescriptor::Int(IntType::I16)),
            ]))
        );
    }

    #[test]
    fn test_unknown_shapes_are_unsupported() {
        let ty: IdlType = serde_json::from_str(r#"{"hashMap": ["u8", "u8"]}"#).unwrap();
        assert!(matches!(ty.to_descriptor(), TypeDescriptor::Unsupported(_)));
        let ty: IdlType = serde_json::from_str(r#""f64""#).unwrap();
        assert_eq!(ty.to_descriptor(), TypeDescriptor::Unsupported("f64".to_string()));
    }

    #[test]
    fn test_bad_discriminator_length() {
        let def = IdlAccountDef {
            name: "Short".to_string(),
            discriminator: Some(vec![1, 2, 3]),
            ty: None,
        };
        assert_eq!(
            def.discriminator_spec().unwrap_err(),
            IdlError::InvalidDiscriminator {
                name: "Short".to_string(),
                len: 3
            }
        );
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("initializeVault"), "initialize_vault");
        assert_eq!(to_snake_case("initialize"), "initialize");
        assert_eq!(to_snake_case("setV2Authority"), "set_v2_authority");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_unknown_instruction() {
        let idl = Idl::from_json(LEGACY).unwrap();
        assert_eq!(
            idl.instruction("nope").unwrap_err(),
            IdlError::unknown("instruction", "nope")
        );
    }
}
