//! Big-endian, fixed-width encoding used for every shard field.

mod decode;
mod encode;

pub use decode::*;
pub use encode::*;
