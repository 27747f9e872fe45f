//! Source selection language.
//!
//! ```text
//! expr   := and (',' and)*
//! and    := unary ('+' unary)*
//! unary  := '!' atom | atom
//! atom   := field ':' value
//! ```
//!
//! `,` is OR and `+` is AND; AND binds tighter. `!` negates one atom.

mod expr;
mod parser;

pub use expr::{Atom, FilterExpr, FilterField, FilterSubject};
pub use parser::parse_filter;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Empty filter expression")]
    Empty,

    #[error("Empty operand at position {0}")]
    EmptyOperand(usize),

    #[error("Malformed filter atom '{0}': expected field:value")]
    MalformedAtom(String),

    #[error("Unknown filter field '{0}'")]
    UnknownField(String),
}
