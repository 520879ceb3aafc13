// Copyright (c) 2017-2021 Fabian Schuiki

//! Temporary representation of IR assembly after parsing.
//!
//! The grammar produces a list of `Unit`s which are then built into a
//! `Module`. Blocks are created before any instruction is built, and values
//! may be used before their definition, such that phi nodes in loops can refer
//! to values computed further down.

use crate::{
    ir::{self, ExtFunc, Function, FunctionBuilder, Module, Opcode, Signature},
    ty::{int_ty, Type},
};
use std::collections::{BTreeMap, HashMap};

/// An error encountered while parsing assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The line on which the error occurred, starting at 1.
    pub line: usize,
    /// A description of the error.
    pub message: String,
}

impl ParseError {
    fn at(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(input.len());
        Self {
            line: input.as_bytes()[..offset]
                .iter()
                .filter(|&&c| c == b'\n')
                .count()
                + 1,
            message: message.into(),
        }
    }

    fn from_syntax<T: std::fmt::Display>(input: &str, err: SyntaxError<T>) -> Self {
        use lalrpop_util::ParseError::*;
        match err {
            InvalidToken { location } => Self::at(input, location, "invalid token"),
            UnrecognizedEOF { location, expected } => Self::at(
                input,
                location,
                format!("unexpected end of input; expected {}", expected.join(", ")),
            ),
            UnrecognizedToken {
                token: (location, token, _),
                expected,
            } => Self::at(
                input,
                location,
                format!("unexpected `{}`; expected {}", token, expected.join(", ")),
            ),
            ExtraToken {
                token: (location, token, _),
            } => Self::at(input, location, format!("extra token `{}`", token)),
            User {
                error: (location, message),
            } => Self::at(input, location, message),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

type SyntaxError<T> = lalrpop_util::ParseError<usize, T, (usize, String)>;

type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Parse a module from a string.
pub fn parse_module(input: &str) -> Result<Module> {
    let units = ModuleParser::new()
        .parse(input)
        .map_err(|err| ParseError::from_syntax(input, err))?;
    let mut module = Module::new();
    for unit in units {
        unit.build(&mut module, input)?;
    }
    Ok(module)
}

/// A function definition or an external declaration.
pub enum Unit<'a> {
    Declare {
        name: &'a str,
        sig: Signature,
        loc: usize,
    },
    Function {
        name: &'a str,
        args: Vec<(Type, &'a str, usize)>,
        return_type: Type,
        blocks: Vec<Block<'a>>,
        loc: usize,
    },
}

impl<'a> Unit<'a> {
    fn build(self, module: &mut Module, input: &'a str) -> Result<()> {
        match self {
            Unit::Declare { name, sig, loc } => {
                check_unique_global(module, input, name, loc)?;
                module.declare(name, sig);
                Ok(())
            }
            Unit::Function {
                name,
                args,
                return_type,
                blocks,
                loc,
            } => {
                check_unique_global(module, input, name, loc)?;
                let mut sig = Signature::new();
                let args: Vec<_> = args
                    .into_iter()
                    .map(|(ty, name, loc)| (sig.add_input(ty), name, loc))
                    .collect();
                sig.set_return_type(return_type);

                let mut func = Function::new(name, sig);
                let mut context = Context::new(input);
                {
                    let mut builder = FunctionBuilder::new(&mut func);
                    for (arg, name, loc) in args {
                        let value = builder.arg_value(arg);
                        if context.values.insert(name, value).is_some() {
                            return context.error(loc, format!("argument %{} defined twice", name));
                        }
                        builder.set_name(value, name.to_owned());
                    }
                    for block in &blocks {
                        if context.blocks.contains_key(block.name) {
                            return context
                                .error(block.loc, format!("block %{} defined twice", block.name));
                        }
                        let bb = builder.named_block(block.name);
                        context.blocks.insert(block.name, bb);
                    }
                    for block in blocks {
                        block.build(module, &mut builder, &mut context)?;
                    }
                }

                if let Some((name, &(_, loc))) = context.placeholders.iter().next() {
                    return context.error(loc, format!("use of undefined value %{}", name));
                }
                module.add_function(func);
                Ok(())
            }
        }
    }
}

fn check_unique_global(module: &Module, input: &str, name: &str, loc: usize) -> Result<()> {
    if module.lookup_signature(name).is_some() {
        Err(ParseError::at(input, loc, format!("@{} defined twice", name)))
    } else {
        Ok(())
    }
}

/// Names visible while building a function body.
struct Context<'a> {
    input: &'a str,
    values: HashMap<&'a str, ir::Value>,
    placeholders: BTreeMap<&'a str, (ir::Value, usize)>,
    blocks: HashMap<&'a str, ir::Block>,
    externs: HashMap<&'a str, ExtFunc>,
}

impl<'a> Context<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            values: Default::default(),
            placeholders: Default::default(),
            blocks: Default::default(),
            externs: Default::default(),
        }
    }

    fn error<T>(&self, loc: usize, message: impl Into<String>) -> Result<T> {
        Err(ParseError::at(self.input, loc, message))
    }

    /// Bind a name to a value, resolving earlier forward references.
    fn define_value(
        &mut self,
        builder: &mut FunctionBuilder,
        name: &'a str,
        value: ir::Value,
        loc: usize,
    ) -> Result<()> {
        if self.values.contains_key(name) {
            return self.error(loc, format!("value %{} defined twice", name));
        }
        if let Some((placeholder, _)) = self.placeholders.remove(name) {
            let (expected, actual) = (builder.value_type(placeholder), builder.value_type(value));
            if expected != actual {
                return self.error(
                    loc,
                    format!("%{} has type {}, but was used as {}", name, actual, expected),
                );
            }
            builder.replace_use(placeholder, value);
            builder.remove_placeholder(placeholder);
        }
        builder.set_name(value, name.to_owned());
        self.values.insert(name, value);
        Ok(())
    }
}

/// A labelled block and its instructions.
pub struct Block<'a> {
    pub name: &'a str,
    pub insts: Vec<Inst<'a>>,
    pub loc: usize,
}

impl<'a> Block<'a> {
    fn build(
        self,
        module: &Module,
        builder: &mut FunctionBuilder,
        context: &mut Context<'a>,
    ) -> Result<()> {
        builder.append_to(context.blocks[self.name]);
        for inst in self.insts {
            inst.build(module, builder, context)?;
        }
        Ok(())
    }
}

/// An instruction with an optional result name.
pub struct Inst<'a> {
    pub name: Option<&'a str>,
    pub data: InstData<'a>,
    pub loc: usize,
}

pub enum InstData<'a> {
    Unary(Opcode, Type, Operand<'a>),
    Binary(Opcode, Type, Operand<'a>, Operand<'a>),
    Phi(Type, Vec<(Operand<'a>, Label<'a>)>),
    Call(Type, &'a str, Vec<Operand<'a>>),
    Branch(Option<Operand<'a>>, Label<'a>, Option<Label<'a>>),
    Return(Option<(Type, Operand<'a>)>),
}

impl<'a> Inst<'a> {
    fn build(
        self,
        module: &Module,
        builder: &mut FunctionBuilder,
        context: &mut Context<'a>,
    ) -> Result<()> {
        let result = match self.data {
            InstData::Unary(opcode, ty, x) => {
                let x = x.build(builder, context, ty)?;
                Some(match opcode {
                    Opcode::Neg => builder.ins().neg(x),
                    Opcode::Not => builder.ins().not(x),
                    op => unreachable!("unary {}", op),
                })
            }
            InstData::Binary(opcode, ty, x, y) => {
                let x = x.build(builder, context, ty)?;
                let y = y.build(builder, context, ty)?;
                Some(builder.ins().binary_op(opcode, x, y))
            }
            InstData::Phi(ty, edges) => {
                let mut args = vec![];
                let mut bbs = vec![];
                for (arg, bb) in edges {
                    args.push(arg.build(builder, context, ty)?);
                    bbs.push(bb.build(context)?);
                }
                Some(builder.ins().phi_with_type(ty, args, bbs))
            }
            InstData::Call(ty, name, args) => {
                let sig = match module.lookup_signature(name) {
                    Some(sig) => sig.clone(),
                    None if name == builder.name() => builder.sig().clone(),
                    None => {
                        return context.error(self.loc, format!("call to unknown function @{}", name))
                    }
                };
                if sig.return_type() != ty {
                    return context.error(
                        self.loc,
                        format!(
                            "@{} returns {}, but call expects {}",
                            name,
                            sig.return_type(),
                            ty
                        ),
                    );
                }
                let input_tys: Vec<Type> = sig.inputs().map(|arg| sig.arg_type(arg)).collect();
                if input_tys.len() != args.len() {
                    return context.error(
                        self.loc,
                        format!(
                            "@{} takes {} arguments, but {} were given",
                            name,
                            input_tys.len(),
                            args.len()
                        ),
                    );
                }
                let ext = match context.externs.get(name) {
                    Some(&ext) => ext,
                    None => {
                        let ext = builder.add_extern(name, sig);
                        context.externs.insert(name, ext);
                        ext
                    }
                };
                let mut values = vec![];
                for (arg, ty) in args.into_iter().zip(input_tys) {
                    values.push(arg.build(builder, context, ty)?);
                }
                let inst = builder.ins().call(ext, values);
                builder.get_inst_result(inst)
            }
            InstData::Branch(Some(cond), bb0, Some(bb1)) => {
                let cond = cond.build(builder, context, int_ty(1))?;
                let bb0 = bb0.build(context)?;
                let bb1 = bb1.build(context)?;
                builder.ins().br_cond(cond, bb0, bb1);
                None
            }
            InstData::Branch(_, bb, _) => {
                let bb = bb.build(context)?;
                builder.ins().br(bb);
                None
            }
            InstData::Return(None) => {
                builder.ins().ret();
                None
            }
            InstData::Return(Some((ty, x))) => {
                let x = x.build(builder, context, ty)?;
                builder.ins().ret_value(x);
                None
            }
        };
        match (self.name, result) {
            (Some(name), Some(value)) => context.define_value(builder, name, value, self.loc),
            (Some(name), None) => context.error(
                self.loc,
                format!("%{} is assigned an instruction without result", name),
            ),
            (None, _) => Ok(()),
        }
    }
}

/// A value operand: either `%name` or an integer literal.
pub enum Operand<'a> {
    Local(&'a str, usize),
    Literal(i64, usize),
}

impl<'a> Operand<'a> {
    /// Resolve the operand as a value of type `ty`.
    fn build(
        self,
        builder: &mut FunctionBuilder,
        context: &mut Context<'a>,
        ty: Type,
    ) -> Result<ir::Value> {
        match self {
            Operand::Literal(imm, loc) => {
                if !ty.is_int() {
                    return context.error(loc, format!("literal {} cannot have type {}", imm, ty));
                }
                Ok(builder.const_int(ty, imm))
            }
            Operand::Local(name, loc) => {
                let value = match context.values.get(name) {
                    Some(&value) => value,
                    None => match context.placeholders.get(name) {
                        Some(&(value, _)) => value,
                        None => {
                            let value = builder.add_placeholder(ty);
                            context.placeholders.insert(name, (value, loc));
                            value
                        }
                    },
                };
                let value_ty = builder.value_type(value);
                if value_ty != ty {
                    return context.error(
                        loc,
                        format!("%{} has type {}, expected {}", name, value_ty, ty),
                    );
                }
                Ok(value)
            }
        }
    }
}

/// A reference to a block.
pub struct Label<'a>(pub &'a str, pub usize);

impl<'a> Label<'a> {
    fn build(self, context: &Context<'a>) -> Result<ir::Block> {
        match context.blocks.get(self.0) {
            Some(&bb) => Ok(bb),
            None => context.error(self.1, format!("unknown block %{}", self.0)),
        }
    }
}

use super::grammar::ModuleParser;
