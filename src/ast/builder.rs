//! Folding of the pest parse tree into the AST.
//!
//! The builder walks the parse tree top down, maintaining the symbol table.
//! Entering a function body, a for body or an if/else branch pushes a scope;
//! leaving it pops. Declaration collisions and unresolved uses are recorded
//! as diagnostics and substitute a sentinel so later passes can keep
//! collecting errors.
use std::rc::Rc;

use pest::iterators::Pair;

use crate::{error::Diagnostic, typechecker::Type};

use super::{
    ArrayAccess, ArrayDecl, Assignment, Ast, Break, Call, Declaration, Designator, Expression,
    For, FunctionDefn, IfElse, LiteralBool, LiteralInt, OpExpr, Operation, Position, Return, Rule,
    Statement, StmtList, Symbol, SymbolTable, VarAccess, VariableDecl,
};

pub struct AstBuilder {
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl AstBuilder {
    /// Fold a `program` pair into an AST, collecting every declaration and
    /// resolution error on the way.
    pub fn build(program: Pair<Rule>) -> (Ast<()>, Vec<Diagnostic>) {
        let mut builder = AstBuilder {
            table: SymbolTable::new(),
            diagnostics: vec![],
        };

        let mut declarations = vec![];
        for pair in program.into_inner() {
            match pair.as_rule() {
                Rule::varDecl => {
                    declarations.push(Declaration::Variable(builder.build_var_decl(pair)));
                }
                Rule::arrayDecl => {
                    declarations.push(Declaration::Array(builder.build_array_decl(pair)));
                }
                Rule::funcDefn => {
                    declarations.push(Declaration::Function(builder.build_func_defn(pair)));
                }
                Rule::EOI => {}
                rule => unreachable!("unexpected declaration rule {rule:?}"),
            }
        }

        (Ast::from_declarations(declarations), builder.diagnostics)
    }

    /// Map an identifier-form type to its type. Anything but the three
    /// builtin names is an error type carrying the offending identifier.
    fn build_type(pair: Pair<Rule>) -> Type {
        match pair.as_str() {
            "int" => Type::Int,
            "bool" => Type::Bool,
            "void" => Type::Void,
            other => Type::Error(format!("Invalid Type: {other}")),
        }
    }

    fn declare(&mut self, name: &str, ty: Type, position: Position) -> Rc<Symbol> {
        if self.table.declared_in_current_scope(name) {
            self.diagnostics.push(Diagnostic::declaration(
                position,
                format!("{name} has already been declared in this scope"),
            ));
        }
        self.table.declare(name, ty, position)
    }

    fn resolve(&mut self, name: &str, position: Position) -> Rc<Symbol> {
        match self.table.lookup(name) {
            Some(symbol) => symbol,
            None => {
                self.diagnostics.push(Diagnostic::resolve(
                    position,
                    format!("use of undeclared identifier '{name}'"),
                ));
                self.table.error_symbol(name, position)
            }
        }
    }

    fn build_var_decl(&mut self, pair: Pair<Rule>) -> VariableDecl {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let ty = Self::build_type(inner.next().expect("variable declaration has a type"));
        let name = inner
            .next()
            .expect("variable declaration has a name")
            .as_str();

        VariableDecl {
            symbol: self.declare(name, ty, position),
            position,
        }
    }

    fn build_array_decl(&mut self, pair: Pair<Rule>) -> ArrayDecl {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let base = Self::build_type(inner.next().expect("array declaration has a base type"));
        let name = inner.next().expect("array declaration has a name").as_str();
        let extent = inner
            .next()
            .expect("array declaration has an extent")
            .as_str()
            .parse::<u64>()
            .expect("array extent fits in 64 bits");

        let ty = Type::Array {
            base: Box::new(base),
            extent,
        };

        ArrayDecl {
            symbol: self.declare(name, ty, position),
            extent,
            position,
        }
    }

    fn build_func_defn(&mut self, pair: Pair<Rule>) -> FunctionDefn<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let ret = Self::build_type(inner.next().expect("function has a return type"));
        let name = inner.next().expect("function has a name").as_str();

        let param_pairs: Vec<(Type, String, Position)> = inner
            .next()
            .expect("function has a parameter list")
            .into_inner()
            .map(|param| {
                let param_position = param.line_col();
                let mut param_inner = param.into_inner();
                let ty = Self::build_type(param_inner.next().expect("parameter has a type"));
                let param_name = param_inner.next().expect("parameter has a name").as_str();
                (ty, param_name.to_owned(), param_position)
            })
            .collect();

        let ty = Type::Func {
            params: param_pairs.iter().map(|(ty, ..)| ty.clone()).collect(),
            ret: Box::new(ret),
        };

        // the function name lands in the enclosing scope before the
        // parameters shadow it
        let symbol = self.declare(name, ty, position);

        self.table.push();
        let params = param_pairs
            .into_iter()
            .map(|(ty, param_name, param_position)| {
                self.declare(&param_name, ty, param_position)
            })
            .collect();
        let body = self.build_statements(inner.next().expect("function has a body"));
        self.table.pop();

        FunctionDefn {
            symbol,
            params,
            body,
            position,
        }
    }

    /// Fold a `stmtBlock` inside a scope of its own.
    fn build_stmt_block(&mut self, pair: Pair<Rule>) -> StmtList<()> {
        self.table.push();
        let list = self.build_statements(pair);
        self.table.pop();
        list
    }

    /// Fold the statements of a `stmtBlock` into the current scope. Function
    /// bodies use this directly so that parameters and locals share a scope.
    fn build_statements(&mut self, pair: Pair<Rule>) -> StmtList<()> {
        StmtList {
            statements: pair
                .into_inner()
                .map(|statement| self.build_statement(statement))
                .collect(),
        }
    }

    fn build_statement(&mut self, pair: Pair<Rule>) -> Statement<()> {
        let position = pair.line_col();
        match pair.as_rule() {
            Rule::varDecl => Statement::VariableDecl(self.build_var_decl(pair)),
            Rule::callStmt => {
                let call = pair.into_inner().next().expect("call statement has a call");
                Statement::Call(self.build_call(call))
            }
            Rule::assignStmt => Statement::Assignment(self.build_assignment(pair)),
            Rule::ifStmt => Statement::IfElse(self.build_if(pair)),
            Rule::forStmt => Statement::For(self.build_for(pair)),
            Rule::breakStmt => Statement::Break(Break { position }),
            Rule::returnStmt => Statement::Return(Return {
                value: pair
                    .into_inner()
                    .next()
                    .map(|value| self.build_expression(value)),
                position,
            }),
            rule => unreachable!("unexpected statement rule {rule:?}"),
        }
    }

    fn build_assignment(&mut self, pair: Pair<Rule>) -> Assignment<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let target = self.build_designator(inner.next().expect("assignment has a target"));
        let value = self.build_expression(inner.next().expect("assignment has a value"));

        Assignment {
            target,
            value,
            position,
        }
    }

    fn build_designator(&mut self, pair: Pair<Rule>) -> Designator<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let name = inner.next().expect("designator has a name").as_str();
        let symbol = self.resolve(name, position);

        match inner.next() {
            Some(index) => Designator::Array(ArrayAccess {
                symbol,
                index: Box::new(self.build_expression(index)),
                position,
                info: (),
            }),
            None => Designator::Variable(VarAccess {
                symbol,
                position,
                info: (),
            }),
        }
    }

    fn build_if(&mut self, pair: Pair<Rule>) -> IfElse<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let condition = self.build_expression(inner.next().expect("if has a condition"));
        let then_block = self.build_stmt_block(inner.next().expect("if has a then block"));
        let else_block = inner.next().map(|block| self.build_stmt_block(block));

        IfElse {
            condition,
            then_block,
            else_block,
            position,
        }
    }

    fn build_for(&mut self, pair: Pair<Rule>) -> For<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let init = self.build_assignment(inner.next().expect("for has an init assignment"));
        let condition = self.build_expression(inner.next().expect("for has a condition"));
        let increment = self.build_assignment(inner.next().expect("for has an increment"));

        let body_pair = inner.next().expect("for has a body");
        let body = if body_pair.as_rule() == Rule::stmtBlock {
            self.build_stmt_block(body_pair)
        } else {
            // a bare statement body still gets a scope of its own
            self.table.push();
            let statement = self.build_statement(body_pair);
            self.table.pop();
            StmtList {
                statements: vec![statement],
            }
        };

        For {
            init,
            condition,
            increment,
            body,
            position,
        }
    }

    fn build_call(&mut self, pair: Pair<Rule>) -> Call<()> {
        let position = pair.line_col();
        let mut inner = pair.into_inner();
        let name = inner.next().expect("call has a callee").as_str();
        let callee = self.resolve(name, position);
        let args = inner
            .next()
            .expect("call has an argument list")
            .into_inner()
            .map(|arg| self.build_expression(arg))
            .collect();

        Call {
            callee,
            args,
            position,
            info: (),
        }
    }

    fn build_expression(&mut self, pair: Pair<Rule>) -> Expression<()> {
        match pair.as_rule() {
            Rule::expr0 => self.build_comparison(pair),
            Rule::expr1 | Rule::expr2 => self.build_binary_chain(pair),
            Rule::notExpr => {
                let position = pair.line_col();
                let operand = pair.into_inner().next().expect("'!' has an operand");
                Expression::Op(OpExpr {
                    op: Operation::Not,
                    lhs: Box::new(self.build_expression(operand)),
                    rhs: None,
                    position,
                    info: (),
                })
            }
            Rule::integer => Expression::LiteralInt(LiteralInt {
                value: pair
                    .as_str()
                    .parse::<i64>()
                    .expect("integer literal fits in 64 bits"),
                position: pair.line_col(),
                info: (),
            }),
            Rule::boolean => Expression::LiteralBool(LiteralBool {
                value: pair.as_str() == "true",
                position: pair.line_col(),
                info: (),
            }),
            Rule::callExpr => Expression::Call(self.build_call(pair)),
            Rule::designator => match self.build_designator(pair) {
                Designator::Variable(access) => Expression::VarAccess(access),
                Designator::Array(access) => Expression::ArrayAccess(access),
            },
            rule => unreachable!("unexpected expression rule {rule:?}"),
        }
    }

    /// `expr0`: at most one comparison per chain.
    fn build_comparison(&mut self, pair: Pair<Rule>) -> Expression<()> {
        let mut inner = pair.into_inner();
        let lhs = self.build_expression(inner.next().expect("comparison has a left operand"));

        match inner.next() {
            None => lhs,
            Some(op) => {
                let position = op.line_col();
                let op = Operation::from_symbol(op.as_str());
                let rhs =
                    self.build_expression(inner.next().expect("comparison has a right operand"));
                Expression::Op(OpExpr {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Some(Box::new(rhs)),
                    position,
                    info: (),
                })
            }
        }
    }

    /// `expr1` and `expr2`: left-associative fold over the operator chain.
    fn build_binary_chain(&mut self, pair: Pair<Rule>) -> Expression<()> {
        let mut inner = pair.into_inner();
        let mut expression =
            self.build_expression(inner.next().expect("operator chain has a first operand"));

        while let Some(op) = inner.next() {
            let position = op.line_col();
            let rhs = self.build_expression(inner.next().expect("operator has a right operand"));
            expression = Expression::Op(OpExpr {
                op: Operation::from_symbol(op.as_str()),
                lhs: Box::new(expression),
                rhs: Some(Box::new(rhs)),
                position,
                info: (),
            });
        }

        expression
    }
}
