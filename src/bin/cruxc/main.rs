//! # Cruxc
//!
//! This binary is the compiler of Crux. It combines parser, AST builder,
//! type checker, IR lowerer and code generator into a single application.
//! On success it writes the assembly of the compiled program to `a.s` in
//! the current directory.
mod cli;

use cli::*;

use std::{error::Error, fs};

use log::{error, info};

use crux::{
    ast::{AstBuilder, CruxParser},
    codegen::CodeGenerator,
    ir::Lowerer,
    typechecker::Typechecker,
};

const OUTPUT_FILE: &str = "a.s";

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    let source = fs::read_to_string(&args.file)?;

    let program = match CruxParser::parse_program(&source) {
        Ok(program) => program,
        Err(err) => {
            error!(
                "Failed to parse '{}' ({err})",
                args.file.to_string_lossy()
            );
            std::process::exit(-1);
        }
    };

    let (ast, mut diagnostics) = AstBuilder::build(program);

    if args.dump_parsed {
        info!("Resolved AST:\n{ast:#?}");
    }

    let (typed, type_diagnostics) = Typechecker::check(&ast);
    diagnostics.extend(type_diagnostics);

    if args.dump_typed {
        info!("Typed AST:\n{typed:#?}");
    }

    if !diagnostics.is_empty() {
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        std::process::exit(-1);
    }

    let program = Lowerer::lower(&typed);

    if args.dump_ir {
        info!("IR:\n{program}");
    }

    info!("Generating code...");
    let assembly = CodeGenerator::generate(&program);
    fs::write(OUTPUT_FILE, assembly)?;

    Ok(())
}
