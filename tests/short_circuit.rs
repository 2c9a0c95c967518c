use crux::{
    ast::{AstBuilder, CruxParser},
    ir::{Function, Inst, InstId, Lowerer, Program},
    typechecker::Typechecker,
    CompileError,
};

fn lower(source: &str) -> Program {
    let pairs = CruxParser::parse_program(source).expect("source parses");
    let (ast, diagnostics) = AstBuilder::build(pairs);
    assert!(diagnostics.is_empty());
    let (typed, diagnostics) = Typechecker::check(&ast);
    assert!(diagnostics.is_empty());
    Lowerer::lower(&typed)
}

fn reachable_from(function: &Function, entry: InstId) -> Vec<InstId> {
    let mut seen = vec![false; function.len()];
    let mut stack = vec![entry];
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

fn find_jump(function: &Function) -> InstId {
    reachable_from(function, function.start)
        .into_iter()
        .find(|id| matches!(function.inst(*id), Inst::Jump { .. }))
        .expect("short circuit lowers to a branch")
}

fn calls_on_path(function: &Function, entry: InstId, callee: &str) -> usize {
    reachable_from(function, entry)
        .into_iter()
        .filter(|id| match function.inst(*id) {
            Inst::Call { callee: symbol, .. } => symbol.name == callee,
            _ => false,
        })
        .count()
}

#[test]
fn or_skips_the_right_operand_when_true() {
    let program = lower(
        "func bool f() { return true; } \
         func void main() { bool t; t = true || f(); }",
    );
    let main = &program.functions[1];
    let jump = find_jump(main);

    let true_edge = main.successors(jump)[1].expect("branch has a true successor");
    let false_edge = main.successors(jump)[0].expect("branch has a false successor");

    assert_eq!(calls_on_path(main, true_edge, "f"), 0);
    assert_eq!(calls_on_path(main, false_edge, "f"), 1);
}

#[test]
fn and_skips_the_right_operand_when_false() {
    let program = lower(
        "func bool f() { return true; } \
         func void main() { bool t; t = false && f(); }",
    );
    let main = &program.functions[1];
    let jump = find_jump(main);

    let true_edge = main.successors(jump)[1].expect("branch has a true successor");
    let false_edge = main.successors(jump)[0].expect("branch has a false successor");

    assert_eq!(calls_on_path(main, false_edge, "f"), 0);
    assert_eq!(calls_on_path(main, true_edge, "f"), 1);
}

#[test]
fn resolution_errors_beat_short_circuiting() {
    // even though the right operand would never run, the undeclared callee
    // still fails compilation and nothing is emitted
    let result = crux::compile("func void main() { bool t; t = true || crash(); }");
    let Err(CompileError::Invalid(diagnostics)) = result else {
        panic!("expected the compilation to fail");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "ResolveSymbolError(line: 1)[use of undeclared identifier 'crash']"
    );
}
