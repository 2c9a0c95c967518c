use super::{Call, Designator, Expression, Position, VariableDecl};

/// Statements of Crux function bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<T> {
    VariableDecl(VariableDecl),
    Assignment(Assignment<T>),
    Call(Call<T>),
    IfElse(IfElse<T>),
    For(For<T>),
    Break(Break),
    Return(Return<T>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<T> {
    pub target: Designator<T>,
    pub value: Expression<T>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfElse<T> {
    pub condition: Expression<T>,
    pub then_block: StmtList<T>,
    pub else_block: Option<StmtList<T>>,
    pub position: Position,
}

/// `for (init cond; incr) body`. The init and increment are full
/// assignments; the condition is re-evaluated before every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct For<T> {
    pub init: Assignment<T>,
    pub condition: Expression<T>,
    pub increment: Assignment<T>,
    pub body: StmtList<T>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Break {
    pub position: Position,
}

/// `return;` or `return expr;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Return<T> {
    pub value: Option<Expression<T>>,
    pub position: Position,
}

/// An ordered sequence of statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtList<T> {
    pub statements: Vec<Statement<T>>,
}
