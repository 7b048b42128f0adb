//! IANA Definitions for DNS.
//!
//! This module contains types for the parameters defined in IANA registries
//! that are relevant for serving zone transfers.
//!
//! All types defined hereunder follow the same basic structure. They are
//! newtypes around the raw integer with associated constants for all
//! well-defined values. Values without a constant are perfectly valid and
//! compare equal to the constant of the same integer value.
//!
//! There are two methods `from_int()` and `to_int()` to convert from and
//! to raw integer values as well as implementations of the `From` trait
//! for these. `FromStr` and `Display` are implemented to convert from
//! the string codes to the values and back.
//!
//! Types also implement `parse()` for creation from wire format data as
//! well as a `compose()` method for composing into wire format data.

pub use self::class::Class;
pub use self::opcode::Opcode;
pub use self::rcode::Rcode;
pub use self::rtype::Rtype;

#[macro_use]
mod macros;

pub mod class;
pub mod opcode;
pub mod rcode;
pub mod rtype;
