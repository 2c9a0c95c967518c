//! Compiler library for the Crux programming language.
//!
//! Compilation runs in four stages. The AST builder folds the parse tree
//! into an AST while resolving every identifier against a lexically scoped
//! symbol table. The type checker attaches a type to every expression. The
//! lowerer turns the typed AST into a per-function control-flow graph of
//! three-address instructions. The code generator linearises each graph into
//! AT&T-syntax x86-64 assembly.
#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod typechecker;

use std::fmt::Display;

use ast::{AstBuilder, CruxParser, Rule};
use codegen::CodeGenerator;
use error::Diagnostic;
use ir::Lowerer;
use typechecker::Typechecker;

/// Failure modes of [`compile`].
#[derive(Debug)]
pub enum CompileError {
    /// The source text did not match the grammar.
    Parse(Box<pest::error::Error<Rule>>),
    /// The program parsed but is ill-formed; contains every diagnostic
    /// collected by the AST builder and the type checker.
    Invalid(Vec<Diagnostic>),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Parse(err) => write!(f, "{err}"),
            CompileError::Invalid(diagnostics) => {
                for diagnostic in diagnostics {
                    writeln!(f, "{diagnostic}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Compile Crux source text into an x86-64 assembly listing.
///
/// All diagnostics are collected before the pipeline gives up, so an invalid
/// program reports every declaration, resolution and type error it contains.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let program = CruxParser::parse_program(source).map_err(CompileError::Parse)?;

    let (ast, mut diagnostics) = AstBuilder::build(program);
    let (typed, type_diagnostics) = Typechecker::check(&ast);
    diagnostics.extend(type_diagnostics);

    if !diagnostics.is_empty() {
        return Err(CompileError::Invalid(diagnostics));
    }

    let program = Lowerer::lower(&typed);
    Ok(CodeGenerator::generate(&program))
}
