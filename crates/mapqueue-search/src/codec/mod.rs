//! Compact, exact serialization of search requests so a whole
//! query can travel in a URL without server-side state.

mod schema;
pub mod token;
mod value;
pub mod wire;

use thiserror::Error;

use crate::catalog::{Category, FieldCatalog};
use crate::model::SearchSchema;
pub use wire::{Reader, Writer};

#[cfg(test)]
pub(crate) use schema::filters_of;

pub const SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated input at byte {offset}: {needed} more byte(s) needed")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown tag {tag} at byte {offset}")]
    UnknownTag { offset: usize, tag: u8 },

    #[error("unknown flag bits {bits:#06x} at byte {offset}")]
    UnknownFlags { offset: usize, bits: u16 },

    #[error("unsupported schema version {version} at byte {offset}")]
    UnsupportedVersion { offset: usize, version: u8 },

    #[error("unknown scope id {id} at byte {offset}")]
    UnknownScope { offset: usize, id: u8 },

    #[error("unknown field id {id} at byte {offset}")]
    UnknownFieldId { offset: usize, id: u16 },

    #[error("field {field} at byte {offset} does not belong to category {category}")]
    FieldCategoryMismatch {
        offset: usize,
        field: String,
        category: Category,
    },

    #[error("field id {id} repeated at byte {offset}")]
    DuplicateField { offset: usize, id: u16 },

    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("varint overflow at byte {offset}")]
    VarintOverflow { offset: usize },

    #[error("timestamp out of range at byte {offset}")]
    InvalidTimestamp { offset: usize },

    #[error("unexpected trailing bytes from byte {offset}")]
    TrailingBytes { offset: usize },

    #[error("float {0} has no exact binary representation")]
    InexactFloat(f64),

    #[error("too many {what}: {count}")]
    TooMany { what: &'static str, count: usize },

    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("compression: {0}")]
    Compression(String),
}

pub trait Encode {
    fn encode(&self, w: &mut Writer, catalog: &FieldCatalog) -> Result<(), CodecError>;
}

pub trait Decode: Sized {
    fn decode(r: &mut Reader<'_>, catalog: &FieldCatalog) -> Result<Self, CodecError>;
}

pub fn encode_schema(schema: &SearchSchema, catalog: &FieldCatalog) -> Result<Vec<u8>, CodecError> {
    let mut w = Writer::new();
    schema.encode(&mut w, catalog)?;
    Ok(w.into_bytes())
}

/// Decode a full payload. Trailing bytes are an error.
pub fn decode_schema(bytes: &[u8], catalog: &FieldCatalog) -> Result<SearchSchema, CodecError> {
    let mut r = Reader::new(bytes);
    let schema = SearchSchema::decode(&mut r, catalog)?;
    r.finish()?;
    Ok(schema)
}

pub fn encode_token(schema: &SearchSchema, catalog: &FieldCatalog) -> Result<String, CodecError> {
    token::pack(&encode_schema(schema, catalog)?)
}

/// Decode a URL token. The result is not validated yet.
pub fn decode_token(token: &str, catalog: &FieldCatalog) -> Result<SearchSchema, CodecError> {
    decode_schema(&token::unpack(token)?, catalog)
}
