//! Protocol conversion traits and types.
//!
//! Internal types (`samsaya_core::Message`, `Attachment`) convert into the wire types
//! of the backend through [`ToProvider`].

mod errors;
pub mod gemini;

pub use errors::{ProtocolError, ProtocolResult};

/// Trait for converting internal types to provider-specific types.
pub trait ToProvider<T> {
    /// Convert from internal type to provider-specific type.
    fn to_provider(&self) -> ProtocolResult<T>;
}
