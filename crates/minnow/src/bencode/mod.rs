//! B-encoding, the serialization format of `.torrent` files and tracker
//! responses.
//!
//! The format has four types:
//!
//! * Integers: `i<base 10 number>e`, e.g. `i52e`
//! * Byte strings: `<length>:<bytes>`, e.g. `5:hello`
//! * Lists: `l<values>e`, e.g. `l5:helloi52ee`
//! * Dictionaries: `d<key><value>...e`, where every key is a byte string,
//!   e.g. `d3:foo3:bare`
//!
//! Decoding accepts dictionaries in any key order, but encoding always emits
//! the keys sorted, so equal values always encode to the same bytes. This is
//! what makes the info hash of a torrent reproducible.
mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_exact, MAX_DEPTH};
pub use encode::encode;
pub use error::{Error, Kind};
pub use value::{Dict, Value};
