use std::rc::Rc;

use super::{Position, StmtList, Symbol};

/// Top level declarations of a Crux program.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration<T> {
    Variable(VariableDecl),
    Array(ArrayDecl),
    Function(FunctionDefn<T>),
}

/// A scalar variable declaration, either global or local to a function.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub symbol: Rc<Symbol>,
    pub position: Position,
}

/// A global array declaration with a fixed extent.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDecl {
    pub symbol: Rc<Symbol>,
    pub extent: u64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefn<T> {
    pub symbol: Rc<Symbol>,
    pub params: Vec<Rc<Symbol>>,
    pub body: StmtList<T>,
    pub position: Position,
}
