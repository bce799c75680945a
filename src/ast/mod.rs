//! Expression and statement trees of a script
//!
//! The parser builds these nodes with unknown types; analysis rewrites them
//! into resolved, typed and (outside debug mode) folded nodes that code
//! generation consumes.

mod nodes;
mod printer;
pub mod types;

pub use nodes::*;
pub use printer::*;
pub use types::{Constant, DataType};

pub use crate::parser::span::{HasSpan, Location, Span};
