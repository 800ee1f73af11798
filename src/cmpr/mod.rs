//! OSD compression codec.
//!
//! This module implements the lossless bitstream consumed by the OSD
//! compositor: an 8-byte header followed by run-length entries that carry
//! either a literal pixel or an index into a most-recently-used palette cache.

mod bitstream;
mod config;
mod frame;
mod header;
mod palette;
mod pixel;
mod syntax;

pub use bitstream::*;
pub use config::*;
pub use frame::*;
pub use header::*;
pub use palette::*;
pub use pixel::*;
pub use syntax::*;
