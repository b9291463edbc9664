//! The low-level (SIL-like) input dialect
//!
//! - `parser` - Line-oriented syntax pass producing raw nodes
//! - `raw` - Raw nodes with unparsed argument text
//! - `text` - Depth-aware scanning of argument text

pub mod parser;
pub mod raw;
pub mod text;

pub use self::parser::parse_sil;
pub use self::raw::{RawBlock, RawFunction, RawGlobal, RawInstruction, RawModule};
