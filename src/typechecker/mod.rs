//! Type checker for Crux.
//!
//! Walks the AST produced by the builder and rebuilds it with the inferred
//! type attached to every expression node. Violations are collected as
//! `TypeError` diagnostics; the offending node gets a sentinel error type so
//! checking continues. An operation over an operand that is already an error
//! stays silent, so each root cause is reported once.
mod types;

pub use self::types::Type;

use std::rc::Rc;

use crate::{
    ast::{
        ArrayAccess, ArrayDecl, Assignment, Ast, Call, Declaration, Designator, Expression, For,
        FunctionDefn, IfElse, LiteralBool, LiteralInt, OpExpr, Operation, Position, Return,
        Statement, StmtList, VarAccess, VariableDecl,
    },
    error::Diagnostic,
};

pub struct Typechecker {
    diagnostics: Vec<Diagnostic>,
    loop_depth: usize,
    return_type: Option<Type>,
}

impl Typechecker {
    /// Check a whole program and return the typed AST together with every
    /// diagnostic found.
    pub fn check(ast: &Ast<()>) -> (Ast<Type>, Vec<Diagnostic>) {
        let mut checker = Typechecker {
            diagnostics: vec![],
            loop_depth: 0,
            return_type: None,
        };

        let declarations = ast
            .declarations()
            .iter()
            .map(|declaration| checker.check_declaration(declaration))
            .collect();

        (Ast::from_declarations(declarations), checker.diagnostics)
    }

    fn type_error(&mut self, position: Position, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::type_error(position, message));
    }

    /// Report `result` if it is an error that is not a downstream effect of
    /// an operand that already failed.
    fn report_fresh(&mut self, result: &Type, operands: &[&Type], position: Position) {
        if let Type::Error(message) = result {
            if operands.iter().all(|operand| !operand.is_error()) {
                self.type_error(position, message.clone());
            }
        }
    }

    fn check_declaration(&mut self, declaration: &Declaration<()>) -> Declaration<Type> {
        match declaration {
            Declaration::Variable(decl) => {
                self.check_variable_decl(decl);
                Declaration::Variable(decl.clone())
            }
            Declaration::Array(decl) => {
                self.check_array_decl(decl);
                Declaration::Array(decl.clone())
            }
            Declaration::Function(defn) => Declaration::Function(self.check_function(defn)),
        }
    }

    fn check_variable_decl(&mut self, decl: &VariableDecl) {
        match &decl.symbol.ty {
            Type::Error(message) => self.type_error(decl.position, message.clone()),
            Type::Void => self.type_error(
                decl.position,
                format!("variable {} may not be declared void", decl.symbol.name),
            ),
            _ => {}
        }
    }

    fn check_array_decl(&mut self, decl: &ArrayDecl) {
        let Type::Array { base, .. } = &decl.symbol.ty else {
            unreachable!("array declarations always carry an array type");
        };
        match base.as_ref() {
            Type::Error(message) => self.type_error(decl.position, message.clone()),
            Type::Void => self.type_error(
                decl.position,
                format!("array {} may not be declared void", decl.symbol.name),
            ),
            _ => {}
        }
    }

    fn check_function(&mut self, defn: &FunctionDefn<()>) -> FunctionDefn<Type> {
        let Type::Func { ret, .. } = &defn.symbol.ty else {
            unreachable!("function symbols always carry a function type");
        };

        for param in &defn.params {
            match &param.ty {
                Type::Int | Type::Bool => {}
                Type::Error(message) => self.type_error(param.position, message.clone()),
                other => self.type_error(
                    param.position,
                    format!("parameter {} must be int or bool, not {other}", param.name),
                ),
            }
        }

        if let Type::Error(message) = ret.as_ref() {
            self.type_error(defn.position, message.clone());
        }

        if defn.symbol.name == "main" {
            if !defn.params.is_empty() {
                self.type_error(defn.position, "function main must not take parameters");
            }
            if **ret != Type::Void {
                self.type_error(defn.position, "function main must return void");
            }
        }

        let previous = self.return_type.replace((**ret).clone());
        let body = self.check_stmt_list(&defn.body);
        self.return_type = previous;

        FunctionDefn {
            symbol: Rc::clone(&defn.symbol),
            params: defn.params.clone(),
            body,
            position: defn.position,
        }
    }

    fn check_stmt_list(&mut self, list: &StmtList<()>) -> StmtList<Type> {
        StmtList {
            statements: list
                .statements
                .iter()
                .map(|statement| self.check_statement(statement))
                .collect(),
        }
    }

    fn check_statement(&mut self, statement: &Statement<()>) -> Statement<Type> {
        match statement {
            Statement::VariableDecl(decl) => {
                self.check_variable_decl(decl);
                Statement::VariableDecl(decl.clone())
            }
            Statement::Assignment(assignment) => {
                Statement::Assignment(self.check_assignment(assignment))
            }
            Statement::Call(call) => Statement::Call(self.check_call(call)),
            Statement::IfElse(if_else) => Statement::IfElse(self.check_if(if_else)),
            Statement::For(for_loop) => Statement::For(self.check_for(for_loop)),
            Statement::Break(break_statement) => {
                if self.loop_depth == 0 {
                    self.type_error(break_statement.position, "break outside of a loop");
                }
                Statement::Break(break_statement.clone())
            }
            Statement::Return(ret) => Statement::Return(self.check_return(ret)),
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment<()>) -> Assignment<Type> {
        let target = self.check_designator(&assignment.target);
        let value = self.check_expression(&assignment.value);

        let target_type = target.info();
        let value_type = value.info();
        let result = target_type.assign(&value_type);
        self.report_fresh(&result, &[&target_type, &value_type], assignment.position);

        Assignment {
            target,
            value,
            position: assignment.position,
        }
    }

    fn check_designator(&mut self, designator: &Designator<()>) -> Designator<Type> {
        match designator {
            Designator::Variable(access) => Designator::Variable(self.check_var_access(access)),
            Designator::Array(access) => Designator::Array(self.check_array_access(access)),
        }
    }

    fn check_var_access(&mut self, access: &VarAccess<()>) -> VarAccess<Type> {
        VarAccess {
            symbol: Rc::clone(&access.symbol),
            position: access.position,
            info: access.symbol.ty.clone(),
        }
    }

    fn check_array_access(&mut self, access: &ArrayAccess<()>) -> ArrayAccess<Type> {
        let index = self.check_expression(&access.index);
        let index_type = index.info();
        let result = access.symbol.ty.index(&index_type);
        self.report_fresh(&result, &[&access.symbol.ty, &index_type], access.position);

        ArrayAccess {
            symbol: Rc::clone(&access.symbol),
            index: Box::new(index),
            position: access.position,
            info: result,
        }
    }

    fn check_call(&mut self, call: &Call<()>) -> Call<Type> {
        let args: Vec<Expression<Type>> = call
            .args
            .iter()
            .map(|arg| self.check_expression(arg))
            .collect();
        let arg_types: Vec<Type> = args.iter().map(Expression::info).collect();

        let result = call.callee.ty.call(&arg_types);
        let mut operands: Vec<&Type> = vec![&call.callee.ty];
        operands.extend(arg_types.iter());
        self.report_fresh(&result, &operands, call.position);

        Call {
            callee: Rc::clone(&call.callee),
            args,
            position: call.position,
            info: result,
        }
    }

    fn check_condition(&mut self, condition: &Expression<()>, construct: &str) -> Expression<Type> {
        let condition = self.check_expression(condition);
        let ty = condition.info();
        if !ty.is_error() && ty != Type::Bool {
            self.type_error(
                condition.position(),
                format!("condition of {construct} must be bool, found {ty}"),
            );
        }
        condition
    }

    fn check_if(&mut self, if_else: &IfElse<()>) -> IfElse<Type> {
        IfElse {
            condition: self.check_condition(&if_else.condition, "if"),
            then_block: self.check_stmt_list(&if_else.then_block),
            else_block: if_else
                .else_block
                .as_ref()
                .map(|block| self.check_stmt_list(block)),
            position: if_else.position,
        }
    }

    fn check_for(&mut self, for_loop: &For<()>) -> For<Type> {
        let init = self.check_assignment(&for_loop.init);
        let condition = self.check_condition(&for_loop.condition, "for");
        let increment = self.check_assignment(&for_loop.increment);

        self.loop_depth += 1;
        let body = self.check_stmt_list(&for_loop.body);
        self.loop_depth -= 1;

        For {
            init,
            condition,
            increment,
            body,
            position: for_loop.position,
        }
    }

    fn check_return(&mut self, ret: &Return<()>) -> Return<Type> {
        let value = ret.value.as_ref().map(|value| self.check_expression(value));
        let expected = self
            .return_type
            .clone()
            .expect("statements only occur inside function bodies");

        match &value {
            Some(value) => {
                let value_type = value.info();
                if expected == Type::Void {
                    if !value_type.is_error() {
                        self.type_error(ret.position, "cannot return a value from a void function");
                    }
                } else if !value_type.is_error()
                    && !expected.is_error()
                    && !value_type.equivalent(&expected)
                {
                    self.type_error(
                        ret.position,
                        format!("return type mismatch: expected {expected}, found {value_type}"),
                    );
                }
            }
            None => {
                if expected != Type::Void && !expected.is_error() {
                    self.type_error(
                        ret.position,
                        format!("return statement requires a value of type {expected}"),
                    );
                }
            }
        }

        Return {
            value,
            position: ret.position,
        }
    }

    fn check_expression(&mut self, expression: &Expression<()>) -> Expression<Type> {
        match expression {
            Expression::LiteralInt(literal) => Expression::LiteralInt(LiteralInt {
                value: literal.value,
                position: literal.position,
                info: Type::Int,
            }),
            Expression::LiteralBool(literal) => Expression::LiteralBool(LiteralBool {
                value: literal.value,
                position: literal.position,
                info: Type::Bool,
            }),
            Expression::VarAccess(access) => Expression::VarAccess(self.check_var_access(access)),
            Expression::ArrayAccess(access) => {
                Expression::ArrayAccess(self.check_array_access(access))
            }
            Expression::Call(call) => Expression::Call(self.check_call(call)),
            Expression::Op(op_expr) => Expression::Op(self.check_op(op_expr)),
        }
    }

    fn check_op(&mut self, op_expr: &OpExpr<()>) -> OpExpr<Type> {
        let lhs = self.check_expression(&op_expr.lhs);
        let lhs_type = lhs.info();

        let Some(rhs) = &op_expr.rhs else {
            // unary '!'
            let result = lhs_type.not();
            self.report_fresh(&result, &[&lhs_type], op_expr.position);
            return OpExpr {
                op: op_expr.op,
                lhs: Box::new(lhs),
                rhs: None,
                position: op_expr.position,
                info: result,
            };
        };

        let rhs = self.check_expression(rhs);
        let rhs_type = rhs.info();

        let result = match op_expr.op {
            Operation::Add => lhs_type.add(&rhs_type),
            Operation::Sub => lhs_type.sub(&rhs_type),
            Operation::Mul => lhs_type.mul(&rhs_type),
            Operation::Div => lhs_type.div(&rhs_type),
            Operation::And => lhs_type.and(&rhs_type),
            Operation::Or => lhs_type.or(&rhs_type),
            Operation::Ge
            | Operation::Gt
            | Operation::Le
            | Operation::Lt
            | Operation::Eq
            | Operation::Ne => lhs_type.compare(op_expr.op, &rhs_type),
            Operation::Not => unreachable!("'!' is unary"),
        };
        self.report_fresh(&result, &[&lhs_type, &rhs_type], op_expr.position);

        OpExpr {
            op: op_expr.op,
            lhs: Box::new(lhs),
            rhs: Some(Box::new(rhs)),
            position: op_expr.position,
            info: result,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AstBuilder, CruxParser};
    use crate::error::DiagnosticKind;

    use super::*;

    fn check(source: &str) -> (Ast<Type>, Vec<Diagnostic>) {
        let program = CruxParser::parse_program(source).expect("test source parses");
        let (ast, diagnostics) = AstBuilder::build(program);
        assert!(diagnostics.is_empty(), "unexpected builder diagnostics");
        Typechecker::check(&ast)
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(Diagnostic::to_string).collect()
    }

    #[test]
    fn every_expression_gets_a_type() {
        let (typed, diagnostics) =
            check("func void main() { int x; x = 1 + 2 * 3; printBool(x == 7); }");
        assert!(diagnostics.is_empty());

        let Declaration::Function(defn) = &typed.declarations()[0] else {
            panic!("expected a function definition");
        };
        let Statement::Assignment(assignment) = &defn.body.statements[1] else {
            panic!("expected an assignment");
        };
        assert_eq!(assignment.value.info(), Type::Int);
        let Statement::Call(call) = &defn.body.statements[2] else {
            panic!("expected a call statement");
        };
        assert_eq!(call.args[0].info(), Type::Bool);
    }

    #[test]
    fn arithmetic_on_booleans_is_rejected() {
        let (_, diagnostics) = check("func void main() { int x; x = 1 + true; }");
        assert_eq!(
            messages(&diagnostics),
            vec!["TypeError(line: 1)[cannot add int with bool]"]
        );
    }

    #[test]
    fn error_operands_do_not_cascade() {
        // one root cause, one diagnostic
        let (_, diagnostics) = check("func void main() { int x; x = (1 + true) * 2 + 3; }");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let (_, diagnostics) = check("func void main() { break; }");
        assert_eq!(
            messages(&diagnostics),
            vec!["TypeError(line: 1)[break outside of a loop]"]
        );

        let (_, diagnostics) =
            check("func void main() { int i; for (i = 0; i < 3; i = i + 1;) { break; } }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn main_constraints() {
        let (_, diagnostics) = check("func int main(int x) { return; }");
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.kind == DiagnosticKind::Type));
        assert!(messages(&diagnostics)
            .iter()
            .any(|message| message.contains("main must not take parameters")));
        assert!(messages(&diagnostics)
            .iter()
            .any(|message| message.contains("main must return void")));
        assert!(messages(&diagnostics)
            .iter()
            .any(|message| message.contains("requires a value of type int")));
    }

    #[test]
    fn return_rules() {
        let (_, diagnostics) = check("func int f() { return 1; } func void main() { }");
        assert!(diagnostics.is_empty());

        let (_, diagnostics) = check("func int f() { return true; } func void main() { }");
        assert_eq!(diagnostics.len(), 1);

        let (_, diagnostics) = check("func void f() { return 1; } func void main() { }");
        assert_eq!(
            messages(&diagnostics),
            vec!["TypeError(line: 1)[cannot return a value from a void function]"]
        );
    }

    #[test]
    fn conditions_must_be_boolean() {
        let (_, diagnostics) = check("func void main() { if 1 { } }");
        assert_eq!(
            messages(&diagnostics),
            vec!["TypeError(line: 1)[condition of if must be bool, found int]"]
        );
    }

    #[test]
    fn invalid_declaration_types_are_reported() {
        let (_, diagnostics) = check("float x; func void main() { }");
        assert_eq!(
            messages(&diagnostics),
            vec!["TypeError(line: 1)[Invalid Type: float]"]
        );

        let (_, diagnostics) = check("func void main() { void x; }");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn undeclared_callee_reports_only_resolution() {
        let program =
            CruxParser::parse_program("func void main() { bool t; t = true || crash(); }").unwrap();
        let (ast, builder_diagnostics) = AstBuilder::build(program);
        assert_eq!(builder_diagnostics.len(), 1);
        assert_eq!(builder_diagnostics[0].kind, DiagnosticKind::ResolveSymbol);

        // the checker stays silent about everything downstream of the
        // unresolved callee
        let (_, type_diagnostics) = Typechecker::check(&ast);
        assert!(type_diagnostics.is_empty());
    }
}
