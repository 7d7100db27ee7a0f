//! A native Rust implementation of the Open Sound Control 1.0/1.1 binary
//! wire format: atom codecs, address/type-tag validation and pattern
//! matching, bundle/message composite codecs, and a zero-allocation
//! streaming reader/writer.
//!
//! The crate is layered bottom-up, matching the layering of the format
//! itself:
//!
//! - [`byteio`] — big-endian primitive I/O.
//! - [`atom`] — the fixed set of OSC atom codecs (`i`, `f`, `s`, `b`, ...).
//! - [`validate`], [`pattern`] — address/type-tag validation and the
//!   pattern-matching mini-language.
//! - [`signature`], [`bundle`], [`message`] — composite codecs built on
//!   the atoms.
//! - [`serial`] — [`serial::OscWriter`]/[`serial::OscReader`], a
//!   level-stack-driven streaming codec for nested bundles and messages.
//!
//! Every encode/decode operation works against a caller-supplied buffer
//! and returns a byte count or an [`error::OscError`]; nothing in this
//! crate performs its own I/O.

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

pub mod atom;
pub mod bundle;
pub mod byteio;
pub mod error;
pub mod features;
pub mod message;
pub mod pattern;
pub mod serial;
pub mod signature;
pub mod timetag;
pub mod validate;
pub mod value;

pub use bundle::{decode_bundle_header, encode_bundle_header, BUNDLE_TAG};
pub use error::{OscError, Result};
pub use message::{decode_message, decode_values, encode_message, encode_values, Message};
pub use pattern::{match_pattern, match_signature};
pub use serial::{Level, LevelKind, OscReader, OscWriter, SerialFlags};
pub use signature::{decode_signature, encode_signature};
pub use timetag::TimeTag;
pub use value::OscType;
