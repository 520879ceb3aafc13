// Copyright (c) 2017-2021 Fabian Schuiki

//! Emitting assembly from IR.

use crate::ir::{Function, Module};
use std::io::{Result, Write};

/// Emits a module as human-readable assembly code that can be parsed again
/// later.
pub struct Writer<T> {
    sink: T,
}

impl<T: Write> Writer<T> {
    /// Create a new assembly writer that will emit code into the provided
    /// sink.
    pub fn new(sink: T) -> Self {
        Self { sink }
    }

    /// Emit assembly for a module.
    pub fn write_module(&mut self, module: &Module) -> Result<()> {
        write!(self.sink, "{}", module.dump())
    }

    /// Emit assembly for a function.
    pub fn write_function(&mut self, func: &Function) -> Result<()> {
        writeln!(self.sink, "{}", func)
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> T {
        self.sink
    }
}
