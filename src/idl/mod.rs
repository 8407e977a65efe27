//! Interface description (IDL) support
//!
//! - **model**: serde model of the JSON document and its mapping onto codec
//!   type descriptors
//! - **coder**: discriminator-prefixed account, instruction and event coders
//! - **json**: JSON conversion for values entering or leaving the codec

pub mod coder;
pub mod errors;
pub mod json;
pub mod model;

pub use coder::{AccountCoder, DecodedEvent, EventCoder, IdlCoder, InstructionCoder};
pub use errors::{IdlError, IdlResult};
pub use json::{value_from_json, value_to_json};
pub use model::{
    Idl, IdlAccountDef, IdlAccountItem, IdlDefinedFields, IdlEventDef, IdlField, IdlInstruction,
    IdlType, IdlTypeDef, IdlTypeDefTy,
};
