//! Declared field metadata for header types.
//!
//! Headers list the fields they carry so that consumers can discover the
//! layout of a protocol without decoding it. Decoding itself is left to the
//! consumer; the scanner only needs segment lengths.
//!
//! ```rust
//! use pktscan_core::schema::{FieldDescriptor, FieldKind};
//!
//! let fields = [
//!     FieldDescriptor::new("version", FieldKind::UInt8).at(0),
//!     FieldDescriptor::new("options", FieldKind::Bytes).optional(),
//! ];
//! assert_eq!(fields[0].offset, Some(0));
//! ```

mod field;
mod kind;

pub use field::FieldDescriptor;
pub use kind::FieldKind;
