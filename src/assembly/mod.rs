// Copyright (c) 2017-2021 Fabian Schuiki

//! Facilities to emit a module as human-readable assembly, or to parse such
//! assembly back into a module.

use lalrpop_util::lalrpop_mod;

pub mod reader;
pub mod writer;

lalrpop_mod!(grammar, "/assembly/grammar.rs");

pub use self::reader::{parse_module, ParseError};
pub use self::writer::Writer;

/// Emit a module as human-readable assembly into a string.
pub fn write_string(module: &crate::ir::Module) -> String {
    let mut asm = vec![];
    // Writing into a `Vec` cannot fail.
    let _ = Writer::new(&mut asm).write_module(module);
    String::from_utf8_lossy(&asm).into_owned()
}
