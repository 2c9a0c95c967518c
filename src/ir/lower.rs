//! Lowering from the typed AST to the IR.
//!
//! Every AST fragment lowers to a [`Chunk`]: an entry instruction and a
//! unique exit instruction with no branch out of it. Sequential composition
//! wires the exit of one fragment to the entry of the next on edge 0.
//! Expression fragments additionally name the value temporary holding their
//! result. Lowering assumes a well typed program.
use std::collections::HashMap;
use std::rc::Rc;

use crate::{
    ast::{
        ArrayAccess, Assignment, Ast, Call, Declaration, Designator, Expression, For,
        FunctionDefn, IfElse, OpExpr, Operation, Return, Statement, StmtList, VarAccess,
    },
    typechecker::Type,
};

use super::{
    BinaryOp, Function, GlobalDecl, Inst, InstId, LocalVar, Predicate, Program, Value,
};

/// Entry and exit of a lowered fragment.
#[derive(Debug, Clone, Copy)]
struct Chunk {
    start: InstId,
    end: InstId,
}

pub struct Lowerer;

impl Lowerer {
    /// Lower a whole typed program.
    pub fn lower(ast: &Ast<Type>) -> Program {
        let mut program = Program::default();

        for declaration in ast.declarations() {
            match declaration {
                Declaration::Variable(decl) => program.globals.push(GlobalDecl {
                    symbol: Rc::clone(&decl.symbol),
                    num_elements: 1,
                }),
                Declaration::Array(decl) => program.globals.push(GlobalDecl {
                    symbol: Rc::clone(&decl.symbol),
                    num_elements: decl.extent,
                }),
                Declaration::Function(_) => {}
            }
        }

        for declaration in ast.declarations() {
            if let Declaration::Function(defn) = declaration {
                program.functions.push(FunctionLowerer::lower(defn));
            }
        }

        program
    }
}

/// Per-function lowering state: the arena under construction, the binding of
/// local symbols to value temporaries, and the exit of the innermost loop
/// for `break` to target.
struct FunctionLowerer {
    func: Function,
    locals: HashMap<usize, LocalVar>,
    loop_exit: Option<InstId>,
}

impl FunctionLowerer {
    fn lower(defn: &FunctionDefn<Type>) -> Function {
        let mut lowerer = FunctionLowerer {
            func: Function::new(&defn.symbol.name, defn.symbol.ty.clone()),
            locals: HashMap::new(),
            loop_exit: None,
        };

        for param in &defn.params {
            let local = lowerer.func.new_temp(param.ty.clone());
            lowerer.locals.insert(param.id, local.clone());
            lowerer.func.params.push(local);
        }

        let body = lowerer.lower_stmt_list(&defn.body);
        lowerer.func.start = body.start;
        lowerer.func
    }

    fn nop(&mut self) -> Chunk {
        let id = self.func.add(Inst::Nop);
        Chunk { start: id, end: id }
    }

    fn single(&mut self, inst: Inst) -> Chunk {
        let id = self.func.add(inst);
        Chunk { start: id, end: id }
    }

    fn seq(&mut self, first: Chunk, second: Chunk) -> Chunk {
        self.func.connect(first.end, 0, second.start);
        Chunk {
            start: first.start,
            end: second.end,
        }
    }

    fn lower_stmt_list(&mut self, list: &StmtList<Type>) -> Chunk {
        // a leading nop keeps empty blocks composable
        let mut chunk = self.nop();
        for statement in &list.statements {
            let next = self.lower_statement(statement);
            chunk = self.seq(chunk, next);
        }
        chunk
    }

    fn lower_statement(&mut self, statement: &Statement<Type>) -> Chunk {
        match statement {
            Statement::VariableDecl(decl) => {
                let local = self.func.new_temp(decl.symbol.ty.clone());
                self.locals.insert(decl.symbol.id, local);
                self.nop()
            }
            Statement::Assignment(assignment) => self.lower_assignment(assignment),
            Statement::Call(call) => self.lower_call(call).0,
            Statement::IfElse(if_else) => self.lower_if(if_else),
            Statement::For(for_loop) => self.lower_for(for_loop),
            Statement::Break(_) => {
                // the break itself is the loop exit; the dangling nop lets
                // any following dead statements chain onto an unreachable
                // node
                let exit = self
                    .loop_exit
                    .expect("the type checker rejects break outside of loops");
                Chunk {
                    start: exit,
                    end: self.func.add(Inst::Nop),
                }
            }
            Statement::Return(ret) => self.lower_return(ret),
        }
    }

    fn lower_assignment(&mut self, assignment: &Assignment<Type>) -> Chunk {
        match &assignment.target {
            Designator::Variable(access) => {
                match self.locals.get(&access.symbol.id).cloned() {
                    Some(local) => {
                        let (value_chunk, value) = self.lower_expression(&assignment.value);
                        let copy = self.single(Inst::Copy {
                            dst: local,
                            src: Value::Local(value),
                        });
                        self.seq(value_chunk, copy)
                    }
                    None => {
                        // global scalar
                        let (value_chunk, value) = self.lower_expression(&assignment.value);
                        let addr = self.func.new_address(access.symbol.ty.clone());
                        let at = self.func.add(Inst::AddressAt {
                            dst: addr.clone(),
                            base: Rc::clone(&access.symbol),
                            offset: None,
                        });
                        let store = self.func.add(Inst::Store {
                            src: value,
                            dst: addr,
                        });
                        self.func.connect(at, 0, store);
                        self.seq(
                            value_chunk,
                            Chunk {
                                start: at,
                                end: store,
                            },
                        )
                    }
                }
            }
            Designator::Array(access) => {
                let (index_chunk, index) = self.lower_expression(&access.index);
                let (value_chunk, value) = self.lower_expression(&assignment.value);
                let addr = self.func.new_address(access.info.clone());
                let at = self.func.add(Inst::AddressAt {
                    dst: addr.clone(),
                    base: Rc::clone(&access.symbol),
                    offset: Some(index),
                });
                let store = self.func.add(Inst::Store {
                    src: value,
                    dst: addr,
                });
                self.func.connect(at, 0, store);
                let chunk = self.seq(index_chunk, value_chunk);
                self.seq(
                    chunk,
                    Chunk {
                        start: at,
                        end: store,
                    },
                )
            }
        }
    }

    fn lower_if(&mut self, if_else: &IfElse<Type>) -> Chunk {
        let (cond_chunk, cond) = self.lower_expression(&if_else.condition);
        let jump = self.func.add(Inst::Jump {
            pred: Value::Local(cond),
        });
        self.func.connect(cond_chunk.end, 0, jump);
        let exit = self.func.add(Inst::Nop);

        let then_chunk = self.lower_stmt_list(&if_else.then_block);
        self.func.connect(jump, 1, then_chunk.start);
        self.func.connect(then_chunk.end, 0, exit);

        match &if_else.else_block {
            Some(block) => {
                let else_chunk = self.lower_stmt_list(block);
                self.func.connect(jump, 0, else_chunk.start);
                self.func.connect(else_chunk.end, 0, exit);
            }
            None => {
                let bypass = self.func.add(Inst::Nop);
                self.func.connect(jump, 0, bypass);
                self.func.connect(bypass, 0, exit);
            }
        }

        Chunk {
            start: cond_chunk.start,
            end: exit,
        }
    }

    fn lower_for(&mut self, for_loop: &For<Type>) -> Chunk {
        let init = self.lower_assignment(&for_loop.init);
        let (cond_chunk, cond) = self.lower_expression(&for_loop.condition);
        self.func.connect(init.end, 0, cond_chunk.start);

        let jump = self.func.add(Inst::Jump {
            pred: Value::Local(cond),
        });
        self.func.connect(cond_chunk.end, 0, jump);
        let exit = self.func.add(Inst::Nop);
        self.func.connect(jump, 0, exit);

        let saved = self.loop_exit.replace(exit);
        let body = self.lower_stmt_list(&for_loop.body);
        self.loop_exit = saved;

        self.func.connect(jump, 1, body.start);
        let increment = self.lower_assignment(&for_loop.increment);
        self.func.connect(body.end, 0, increment.start);
        // back edge into the condition
        self.func.connect(increment.end, 0, cond_chunk.start);

        Chunk {
            start: init.start,
            end: exit,
        }
    }

    fn lower_return(&mut self, ret: &Return<Type>) -> Chunk {
        // the dangling nop keeps the return a zero-successor terminator even
        // when dead statements follow it
        match &ret.value {
            Some(expression) => {
                let (chunk, value) = self.lower_expression(expression);
                let id = self.func.add(Inst::Return { value: Some(value) });
                self.func.connect(chunk.end, 0, id);
                Chunk {
                    start: chunk.start,
                    end: self.func.add(Inst::Nop),
                }
            }
            None => {
                let id = self.func.add(Inst::Return { value: None });
                Chunk {
                    start: id,
                    end: self.func.add(Inst::Nop),
                }
            }
        }
    }

    fn lower_expression(&mut self, expression: &Expression<Type>) -> (Chunk, LocalVar) {
        match expression {
            Expression::LiteralInt(literal) => {
                self.lower_constant(Value::IntConstant(literal.value), Type::Int)
            }
            Expression::LiteralBool(literal) => {
                self.lower_constant(Value::BoolConstant(literal.value), Type::Bool)
            }
            Expression::VarAccess(access) => self.lower_var_access(access),
            Expression::ArrayAccess(access) => self.lower_array_read(access),
            Expression::Call(call) => {
                let (chunk, value) = self.lower_call(call);
                (chunk, value.expect("expression calls return a value"))
            }
            Expression::Op(op_expr) => self.lower_op(op_expr),
        }
    }

    fn lower_constant(&mut self, value: Value, ty: Type) -> (Chunk, LocalVar) {
        let dst = self.func.new_temp(ty);
        let chunk = self.single(Inst::Copy {
            dst: dst.clone(),
            src: value,
        });
        (chunk, dst)
    }

    fn lower_var_access(&mut self, access: &VarAccess<Type>) -> (Chunk, LocalVar) {
        match self.locals.get(&access.symbol.id).cloned() {
            Some(local) => (self.nop(), local),
            None => {
                // global scalar: compute its address, then load
                let addr = self.func.new_address(access.symbol.ty.clone());
                let dst = self.func.new_temp(access.symbol.ty.clone());
                let at = self.func.add(Inst::AddressAt {
                    dst: addr.clone(),
                    base: Rc::clone(&access.symbol),
                    offset: None,
                });
                let load = self.func.add(Inst::Load {
                    dst: dst.clone(),
                    src: addr,
                });
                self.func.connect(at, 0, load);
                (
                    Chunk {
                        start: at,
                        end: load,
                    },
                    dst,
                )
            }
        }
    }

    fn lower_array_read(&mut self, access: &ArrayAccess<Type>) -> (Chunk, LocalVar) {
        let (index_chunk, index) = self.lower_expression(&access.index);
        let addr = self.func.new_address(access.info.clone());
        let dst = self.func.new_temp(access.info.clone());
        let at = self.func.add(Inst::AddressAt {
            dst: addr.clone(),
            base: Rc::clone(&access.symbol),
            offset: Some(index),
        });
        let load = self.func.add(Inst::Load {
            dst: dst.clone(),
            src: addr,
        });
        self.func.connect(at, 0, load);
        let chunk = self.seq(
            index_chunk,
            Chunk {
                start: at,
                end: load,
            },
        );
        (chunk, dst)
    }

    fn lower_call(&mut self, call: &Call<Type>) -> (Chunk, Option<LocalVar>) {
        let mut chunk = self.nop();
        let mut args = vec![];
        for arg in &call.args {
            let (arg_chunk, value) = self.lower_expression(arg);
            chunk = self.seq(chunk, arg_chunk);
            args.push(value);
        }

        let Type::Func { ret, .. } = &call.callee.ty else {
            unreachable!("lowering requires a well typed program");
        };
        let dst = match ret.as_ref() {
            Type::Void => None,
            ty => Some(self.func.new_temp(ty.clone())),
        };

        let id = self.single(Inst::Call {
            dst: dst.clone(),
            callee: Rc::clone(&call.callee),
            args,
        });
        (self.seq(chunk, id), dst)
    }

    fn lower_op(&mut self, op_expr: &OpExpr<Type>) -> (Chunk, LocalVar) {
        match op_expr.op {
            Operation::Add => self.lower_arithmetic(op_expr, BinaryOp::Add),
            Operation::Sub => self.lower_arithmetic(op_expr, BinaryOp::Sub),
            Operation::Mul => self.lower_arithmetic(op_expr, BinaryOp::Mul),
            Operation::Div => self.lower_arithmetic(op_expr, BinaryOp::Div),
            Operation::Ge => self.lower_comparison(op_expr, Predicate::Ge),
            Operation::Gt => self.lower_comparison(op_expr, Predicate::Gt),
            Operation::Le => self.lower_comparison(op_expr, Predicate::Le),
            Operation::Lt => self.lower_comparison(op_expr, Predicate::Lt),
            Operation::Eq => self.lower_comparison(op_expr, Predicate::Eq),
            Operation::Ne => self.lower_comparison(op_expr, Predicate::Ne),
            Operation::Or => self.lower_short_circuit(op_expr, true),
            Operation::And => self.lower_short_circuit(op_expr, false),
            Operation::Not => {
                let (chunk, operand) = self.lower_expression(&op_expr.lhs);
                let dst = self.func.new_temp(Type::Bool);
                let not = self.single(Inst::Not {
                    dst: dst.clone(),
                    src: Value::Local(operand),
                });
                (self.seq(chunk, not), dst)
            }
        }
    }

    fn operands(&mut self, op_expr: &OpExpr<Type>) -> (Chunk, LocalVar, LocalVar) {
        let (lhs_chunk, lhs) = self.lower_expression(&op_expr.lhs);
        let rhs = op_expr.rhs.as_ref().expect("binary operator has two operands");
        let (rhs_chunk, rhs) = self.lower_expression(rhs);
        (self.seq(lhs_chunk, rhs_chunk), lhs, rhs)
    }

    fn lower_arithmetic(&mut self, op_expr: &OpExpr<Type>, op: BinaryOp) -> (Chunk, LocalVar) {
        let (chunk, lhs, rhs) = self.operands(op_expr);
        let dst = self.func.new_temp(Type::Int);
        let inst = self.single(Inst::Binary {
            op,
            dst: dst.clone(),
            lhs: Value::Local(lhs),
            rhs: Value::Local(rhs),
        });
        (self.seq(chunk, inst), dst)
    }

    fn lower_comparison(&mut self, op_expr: &OpExpr<Type>, pred: Predicate) -> (Chunk, LocalVar) {
        let (chunk, lhs, rhs) = self.operands(op_expr);
        let dst = self.func.new_temp(Type::Bool);
        let inst = self.single(Inst::Compare {
            pred,
            dst: dst.clone(),
            lhs: Value::Local(lhs),
            rhs: Value::Local(rhs),
        });
        (self.seq(chunk, inst), dst)
    }

    /// Short-circuit lowering for `||` and `&&`. The branch on the left
    /// value either skips the right operand and copies the left value out
    /// (`||` on true, `&&` on false) or evaluates the right operand and
    /// copies that.
    fn lower_short_circuit(&mut self, op_expr: &OpExpr<Type>, skip_on: bool) -> (Chunk, LocalVar) {
        let (lhs_chunk, lhs_value) = self.lower_expression(&op_expr.lhs);
        let result = self.func.new_temp(Type::Bool);
        let exit = self.func.add(Inst::Nop);

        let jump = self.func.add(Inst::Jump {
            pred: Value::Local(lhs_value.clone()),
        });
        self.func.connect(lhs_chunk.end, 0, jump);

        let shortcut = self.func.add(Inst::Copy {
            dst: result.clone(),
            src: Value::Local(lhs_value),
        });
        self.func.connect(shortcut, 0, exit);

        let rhs = op_expr.rhs.as_ref().expect("binary operator has two operands");
        let (rhs_chunk, rhs_value) = self.lower_expression(rhs);
        let copy_rhs = self.func.add(Inst::Copy {
            dst: result.clone(),
            src: Value::Local(rhs_value),
        });
        self.func.connect(rhs_chunk.end, 0, copy_rhs);
        self.func.connect(copy_rhs, 0, exit);

        let (on_true, on_false) = if skip_on {
            (shortcut, rhs_chunk.start)
        } else {
            (rhs_chunk.start, shortcut)
        };
        self.func.connect(jump, 1, on_true);
        self.func.connect(jump, 0, on_false);

        (
            Chunk {
                start: lhs_chunk.start,
                end: exit,
            },
            result,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AstBuilder, CruxParser};
    use crate::typechecker::Typechecker;

    use super::*;

    fn lower(source: &str) -> Program {
        let pairs = CruxParser::parse_program(source).expect("test source parses");
        let (ast, diagnostics) = AstBuilder::build(pairs);
        assert!(diagnostics.is_empty());
        let (typed, diagnostics) = Typechecker::check(&ast);
        assert!(diagnostics.is_empty());
        Lowerer::lower(&typed)
    }

    fn reachable(function: &Function) -> Vec<InstId> {
        let mut seen = vec![false; function.len()];
        let mut stack = vec![function.start];
        let mut order = vec![];
        while let Some(id) = stack.pop() {
            if seen[id.0] {
                continue;
            }
            seen[id.0] = true;
            order.push(id);
            for succ in function.successors(id).iter().flatten() {
                stack.push(*succ);
            }
        }
        order
    }

    #[test]
    fn globals_are_declared_with_their_extent() {
        let program = lower("int g; bool flags[10]; func void main() { }");
        assert_eq!(program.globals.len(), 2);
        assert_eq!(program.globals[0].num_elements, 1);
        assert_eq!(program.globals[1].num_elements, 10);
    }

    #[test]
    fn branches_come_exclusively_from_jumps() {
        let program = lower(
            "func void main() { int i; for (i = 0; i < 9; i = i + 1;) { if i == 3 { break; } } }",
        );
        let main = &program.functions[0];
        for id in reachable(main) {
            let is_jump = matches!(main.inst(id), Inst::Jump { .. });
            let successor_count = main.successors(id).iter().flatten().count();
            if is_jump {
                assert_eq!(successor_count, 2, "jump at {id:?} must have two successors");
            } else {
                assert!(successor_count <= 1, "only jumps may branch, {id:?} does");
            }
        }
    }

    #[test]
    fn return_is_a_zero_successor_terminator() {
        let program = lower("func int f() { return 1; printInt(2); } func void main() { }");
        let f = &program.functions[0];
        let mut returns = 0;
        for id in reachable(f) {
            if matches!(f.inst(id), Inst::Return { .. }) {
                returns += 1;
                assert_eq!(f.successors(id).iter().flatten().count(), 0);
            }
        }
        assert_eq!(returns, 1);
        // the dead call after the return never becomes reachable
        assert!(!reachable(f)
            .iter()
            .any(|id| matches!(f.inst(*id), Inst::Call { .. })));
    }

    #[test]
    fn short_circuit_or_skips_the_right_operand() {
        let program =
            lower("func bool f() { return true; } func void main() { bool t; t = true || f(); }");
        let main = &program.functions[1];

        // from the true edge of the branch, the call to f is unreachable
        let jump = reachable(main)
            .into_iter()
            .find(|id| matches!(main.inst(*id), Inst::Jump { .. }))
            .expect("short circuit lowers to a branch");
        let true_edge = main.successors(jump)[1].expect("branch has a true successor");

        let mut stack = vec![true_edge];
        let mut seen = vec![false; main.len()];
        while let Some(id) = stack.pop() {
            if seen[id.0] {
                continue;
            }
            seen[id.0] = true;
            assert!(
                !matches!(main.inst(id), Inst::Call { .. }),
                "the right operand must not run when the left one is true"
            );
            for succ in main.successors(id).iter().flatten() {
                stack.push(*succ);
            }
        }
    }

    #[test]
    fn break_leaves_the_loop_for_good() {
        let program = lower(
            "func void main() { int i; for (i = 0; i < 3; i = i + 1;) { break; printInt(i); } }",
        );
        let main = &program.functions[0];
        // the statement after the break is dead, so no call is reachable
        assert!(!reachable(main)
            .iter()
            .any(|id| matches!(main.inst(*id), Inst::Call { .. })));
    }

    #[test]
    fn value_and_address_temps_count_separately() {
        let program = lower("int a[4]; func void main() { a[1] = 2; }");
        let main = &program.functions[0];

        let mut local_ids = vec![];
        let mut address_ids = vec![];
        for id in reachable(main) {
            match main.inst(id) {
                Inst::Copy { dst, .. } => local_ids.push(dst.id),
                Inst::AddressAt {
                    dst,
                    offset: Some(_),
                    ..
                } => address_ids.push(dst.id),
                _ => {}
            }
        }
        // both counters start at zero
        assert!(local_ids.contains(&0));
        assert!(address_ids.contains(&0));
    }
}
