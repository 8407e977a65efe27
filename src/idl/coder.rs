//! Discriminator-prefixed coders for accounts, instructions and events
//!
//! Each coder maps item names to their discriminator and layout. Encoding
//! writes `discriminator || payload`; decoding checks the discriminator
//! before touching the payload, so foreign data is rejected with both tags
//! in the error.

use super::errors::{IdlError, IdlResult};
use super::model::{Idl, IdlAccountItem};
use crate::codec::{BinaryCodec, CodecError, TypeDescriptor, TypeRegistry, Value};
use crate::discriminator::{validate, Discriminator, DISCRIMINATOR_LEN};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use tracing::trace;

/// One named, discriminated layout
#[derive(Debug, Clone)]
struct Layout {
    name: String,
    discriminator: Discriminator,
    ty: TypeDescriptor,
}

/// Name and discriminator tables for one item kind
#[derive(Debug, Clone, Default)]
struct LayoutTable {
    kind: &'static str,
    layouts: Vec<Layout>,
    by_name: HashMap<String, usize>,
    by_discriminator: HashMap<Discriminator, usize>,
}

impl LayoutTable {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    fn insert(&mut self, layout: Layout) -> IdlResult<()> {
        let index = self.layouts.len();
        if let Some(&existing) = self.by_discriminator.get(&layout.discriminator) {
            return Err(IdlError::DuplicateDiscriminator {
                first: self.layouts[existing].name.clone(),
                second: layout.name,
            });
        }
        self.by_name.insert(layout.name.clone(), index);
        self.by_discriminator.insert(layout.discriminator, index);
        self.layouts.push(layout);
        Ok(())
    }

    fn by_name(&self, name: &str) -> IdlResult<&Layout> {
        self.by_name
            .get(name)
            .map(|&i| &self.layouts[i])
            .ok_or_else(|| IdlError::unknown(self.kind, name))
    }

    fn identify(&self, data: &[u8]) -> IdlResult<&Layout> {
        let tag = split_discriminator(data)?.0;
        self.by_discriminator
            .get(&tag)
            .map(|&i| &self.layouts[i])
            .ok_or_else(|| IdlError::UnknownDiscriminator {
                kind: self.kind,
                hex: hex::encode_upper(tag),
            })
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(|l| l.name.as_str())
    }
}

fn split_discriminator(data: &[u8]) -> IdlResult<(Discriminator, &[u8])> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(CodecError::BufferUnderflow {
            offset: 0,
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        }
        .into());
    }
    let (head, rest) = data.split_at(DISCRIMINATOR_LEN);
    let mut tag = [0u8; DISCRIMINATOR_LEN];
    tag.copy_from_slice(head);
    Ok((tag, rest))
}

fn encode_with(codec: &BinaryCodec, layout: &Layout, value: &Value) -> IdlResult<Vec<u8>> {
    let mut out = layout.discriminator.to_vec();
    codec.encode_into(value, &layout.ty, &mut out)?;
    Ok(out)
}

fn decode_checked(codec: &BinaryCodec, layout: &Layout, data: &[u8]) -> IdlResult<Value> {
    let (tag, payload) = split_discriminator(data)?;
    validate(&layout.discriminator, &tag).into_result()?;
    // Accounts are often allocated larger than their layout; trailing bytes are ignored
    let (value, consumed) = codec.decode(payload, &layout.ty)?;
    trace!(name = %layout.name, consumed, total = data.len(), "decoded payload");
    Ok(value)
}

/// Account data coder
#[derive(Debug, Clone)]
pub struct AccountCoder {
    codec: BinaryCodec,
    table: LayoutTable,
}

impl AccountCoder {
    pub fn new(idl: &Idl) -> IdlResult<Self> {
        let mut table = LayoutTable::new("account");
        for account in &idl.accounts {
            table.insert(Layout {
                name: account.name.clone(),
                discriminator: account.discriminator_spec()?.resolve(),
                ty: TypeDescriptor::defined(account.name.clone()),
            })?;
        }
        Ok(Self {
            codec: BinaryCodec::new(idl.type_registry()),
            table,
        })
    }

    /// `discriminator || struct bytes`
    pub fn encode(&self, name: &str, value: &Value) -> IdlResult<Vec<u8>> {
        encode_with(&self.codec, self.table.by_name(name)?, value)
    }

    /// Decode after checking the discriminator against `name`'s
    pub fn decode(&self, name: &str, data: &[u8]) -> IdlResult<Value> {
        decode_checked(&self.codec, self.table.by_name(name)?, data)
    }

    /// Name of the account whose discriminator prefixes `data`
    pub fn account_type_for(&self, data: &[u8]) -> IdlResult<&str> {
        self.table.identify(data).map(|l| l.name.as_str())
    }

    /// Identify and decode in one step
    pub fn decode_any(&self, data: &[u8]) -> IdlResult<(String, Value)> {
        let layout = self.table.identify(data)?;
        Ok((layout.name.clone(), decode_checked(&self.codec, layout, data)?))
    }

    pub fn discriminator(&self, name: &str) -> IdlResult<Discriminator> {
        self.table.by_name(name).map(|l| l.discriminator)
    }

    /// Layout of `name`, for building values from external input
    pub fn account_type(&self, name: &str) -> IdlResult<&TypeDescriptor> {
        self.table.by_name(name).map(|l| &l.ty)
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.codec.registry()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }
}

/// Instruction data coder and builder
#[derive(Debug, Clone)]
pub struct InstructionCoder {
    codec: BinaryCodec,
    table: LayoutTable,
    accounts: HashMap<String, Vec<IdlAccountItem>>,
}

impl InstructionCoder {
    pub fn new(idl: &Idl) -> IdlResult<Self> {
        let mut table = LayoutTable::new("instruction");
        let mut accounts = HashMap::new();
        for ix in &idl.instructions {
            table.insert(Layout {
                name: ix.name.clone(),
                discriminator: ix.discriminator_spec()?.resolve(),
                ty: ix.args_descriptor(),
            })?;
            accounts.insert(ix.name.clone(), ix.accounts.clone());
        }
        Ok(Self {
            codec: BinaryCodec::new(idl.type_registry()),
            table,
            accounts,
        })
    }

    /// `discriminator || args struct`
    pub fn encode(&self, name: &str, args: &Value) -> IdlResult<Vec<u8>> {
        encode_with(&self.codec, self.table.by_name(name)?, args)
    }

    /// Identify the instruction and decode its arguments
    pub fn decode(&self, data: &[u8]) -> IdlResult<(String, Value)> {
        let layout = self.table.identify(data)?;
        Ok((layout.name.clone(), decode_checked(&self.codec, layout, data)?))
    }

    /// Args layout of `name`, for building values from external input
    pub fn args_type(&self, name: &str) -> IdlResult<&TypeDescriptor> {
        self.table.by_name(name).map(|l| &l.ty)
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.codec.registry()
    }

    /// Build a ready-to-compile [`Instruction`]
    ///
    /// `accounts` is keyed by the IDL account names; metas follow the IDL's
    /// order and flags. An absent optional account is replaced by the program
    /// id as a read-only placeholder.
    pub fn build_instruction(
        &self,
        name: &str,
        args: &Value,
        accounts: &HashMap<String, Pubkey>,
        program_id: &Pubkey,
    ) -> IdlResult<Instruction> {
        let data = self.encode(name, args)?;
        let items = self
            .accounts
            .get(name)
            .ok_or_else(|| IdlError::unknown("instruction", name))?;

        let metas = items
            .iter()
            .map(|item| match accounts.get(&item.name) {
                Some(key) if item.writable => Ok(AccountMeta::new(*key, item.signer)),
                Some(key) => Ok(AccountMeta::new_readonly(*key, item.signer)),
                None if item.optional => Ok(AccountMeta::new_readonly(*program_id, false)),
                None => Err(IdlError::MissingAccount {
                    instruction: name.to_string(),
                    account: item.name.clone(),
                }),
            })
            .collect::<IdlResult<Vec<_>>>()?;

        Ok(Instruction {
            program_id: *program_id,
            accounts: metas,
            data,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }
}

/// Decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub data: Value,
}

/// Event payload coder
#[derive(Debug, Clone)]
pub struct EventCoder {
    codec: BinaryCodec,
    table: LayoutTable,
}

impl EventCoder {
    pub fn new(idl: &Idl) -> IdlResult<Self> {
        let mut table = LayoutTable::new("event");
        for event in &idl.events {
            table.insert(Layout {
                name: event.name.clone(),
                discriminator: event.discriminator_spec()?.resolve(),
                ty: TypeDescriptor::defined(event.name.clone()),
            })?;
        }
        Ok(Self {
            codec: BinaryCodec::new(idl.type_registry()),
            table,
        })
    }

    pub fn encode(&self, name: &str, value: &Value) -> IdlResult<Vec<u8>> {
        encode_with(&self.codec, self.table.by_name(name)?, value)
    }

    /// Identify the event by discriminator and decode it
    pub fn decode(&self, data: &[u8]) -> IdlResult<DecodedEvent> {
        let layout = self.table.identify(data)?;
        Ok(DecodedEvent {
            name: layout.name.clone(),
            data: decode_checked(&self.codec, layout, data)?,
        })
    }
}

/// All three coders for one program
#[derive(Debug, Clone)]
pub struct IdlCoder {
    pub accounts: AccountCoder,
    pub instructions: InstructionCoder,
    pub events: EventCoder,
}

impl IdlCoder {
    pub fn new(idl: &Idl) -> IdlResult<Self> {
        Ok(Self {
            accounts: AccountCoder::new(idl)?,
            instructions: InstructionCoder::new(idl)?,
            events: EventCoder::new(idl)?,
        })
    }
}
