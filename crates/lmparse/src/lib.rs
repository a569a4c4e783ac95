//! # lmparse
//!
//! Decoder for the NVMe OCP 2.0 Latency Monitor log page.
//!
//! A log page is described by a [Layout](field::Layout): an ordered list of
//! fields at byte or bit granularity, each optionally carrying a finer-grained
//! child layout. The interpreter walks a layout over the captured bytes and
//! produces either an indented text report or an ordered structured result.
//!
//! ## Example
//!
//! ```
//! use lmparse::ocp::{OCP2_LOG_LEN, ocp2};
//! use lmparse::schema::to_structure;
//! use lmparse::value::Value;
//!
//! let mut page = vec![0u8; OCP2_LOG_LEN];
//! // Active Bucket Counter 0, Write Command Counter
//! page[40] = 5;
//!
//! let record = to_structure(ocp2(), &page).unwrap();
//! let bucket = record["Active Bucket Counter: Bucket 0"].as_record().unwrap();
//! assert_eq!(bucket["Write"], Value::Int(5));
//! assert_eq!(bucket["Read"], Value::Int(0));
//! ```

pub mod assembly;
pub mod bits;
pub mod errors;
pub mod feature;
pub mod field;
pub mod format;
pub mod input;
pub mod ocp;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod validate;
pub mod value;
