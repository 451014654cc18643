//! The Lua table-constructor dialect of saved-variable dumps.
//!
//! Input files are WoW saved-variables: top-level `name = { ... }`
//! assignments of nested tables with `["key"] = value` fields and `-- [n]`
//! index comments. The same dialect is written back for the precomputed
//! artifact.

pub use self::{
    lexer::{
        Lexer, LuaSyntaxError, Spanned, SplitOutsideStrings, SyntaxErrorKind, Token,
        split_outside_strings,
    },
    parser::{parse_assignments, scan_fields},
    value::{Key, Table, Value},
    writer::{write_assignment, write_value},
};

mod lexer;
mod parser;
mod value;
mod writer;
