use std::rc::Rc;

use super::{Operation, Position, Symbol};

/// Expressions of Crux. `T` is the info slot the type checker fills with the
/// inferred type of the node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression<T> {
    LiteralInt(LiteralInt<T>),
    LiteralBool(LiteralBool<T>),
    VarAccess(VarAccess<T>),
    ArrayAccess(ArrayAccess<T>),
    Call(Call<T>),
    Op(OpExpr<T>),
}

impl<T> Expression<T>
where
    T: Clone,
{
    pub fn info(&self) -> T {
        match self {
            Expression::LiteralInt(LiteralInt { info, .. })
            | Expression::LiteralBool(LiteralBool { info, .. })
            | Expression::VarAccess(VarAccess { info, .. })
            | Expression::ArrayAccess(ArrayAccess { info, .. })
            | Expression::Call(Call { info, .. })
            | Expression::Op(OpExpr { info, .. }) => info.clone(),
        }
    }
}

impl<T> Expression<T> {
    pub fn position(&self) -> Position {
        match self {
            Expression::LiteralInt(LiteralInt { position, .. })
            | Expression::LiteralBool(LiteralBool { position, .. })
            | Expression::VarAccess(VarAccess { position, .. })
            | Expression::ArrayAccess(ArrayAccess { position, .. })
            | Expression::Call(Call { position, .. })
            | Expression::Op(OpExpr { position, .. }) => *position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralInt<T> {
    pub value: i64,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralBool<T> {
    pub value: bool,
    pub position: Position,
    pub info: T,
}

/// A bare identifier use.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAccess<T> {
    pub symbol: Rc<Symbol>,
    pub position: Position,
    pub info: T,
}

/// An element access `a[index]` on a global array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAccess<T> {
    pub symbol: Rc<Symbol>,
    pub index: Box<Expression<T>>,
    pub position: Position,
    pub info: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call<T> {
    pub callee: Rc<Symbol>,
    pub args: Vec<Expression<T>>,
    pub position: Position,
    pub info: T,
}

/// An operator application. `rhs` is `None` exactly for the unary `!`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpExpr<T> {
    pub op: Operation,
    pub lhs: Box<Expression<T>>,
    pub rhs: Option<Box<Expression<T>>>,
    pub position: Position,
    pub info: T,
}

/// An lvalue: either a bare variable or an element of a global array.
#[derive(Debug, Clone, PartialEq)]
pub enum Designator<T> {
    Variable(VarAccess<T>),
    Array(ArrayAccess<T>),
}

impl<T> Designator<T>
where
    T: Clone,
{
    pub fn info(&self) -> T {
        match self {
            Designator::Variable(VarAccess { info, .. })
            | Designator::Array(ArrayAccess { info, .. }) => info.clone(),
        }
    }
}

impl<T> Designator<T> {
    pub fn position(&self) -> Position {
        match self {
            Designator::Variable(VarAccess { position, .. })
            | Designator::Array(ArrayAccess { position, .. }) => *position,
        }
    }
}
