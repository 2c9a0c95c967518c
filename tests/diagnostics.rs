use crux::{error::DiagnosticKind, CompileError};

fn diagnostics_of(source: &str) -> Vec<crux::error::Diagnostic> {
    match crux::compile(source) {
        Err(CompileError::Invalid(diagnostics)) => diagnostics,
        Err(CompileError::Parse(err)) => panic!("source does not parse: {err}"),
        Ok(_) => panic!("expected the compilation to fail"),
    }
}

#[test]
fn duplicate_declarations() {
    let diagnostics = diagnostics_of("int x; bool x; func void main() { }");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::Declaration);
    assert_eq!(
        diagnostics[0].to_string(),
        "DeclarationError(line: 1)[x has already been declared in this scope]"
    );
}

#[test]
fn undeclared_identifiers() {
    let diagnostics = diagnostics_of("func void main() {\n    y = 1;\n}");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "ResolveSymbolError(line: 2)[use of undeclared identifier 'y']"
    );
}

#[test]
fn invalid_type_names() {
    let diagnostics = diagnostics_of("float x; func void main() { }");
    assert_eq!(
        diagnostics[0].to_string(),
        "TypeError(line: 1)[Invalid Type: float]"
    );
}

#[test]
fn ill_typed_operations_point_at_the_line() {
    let diagnostics = diagnostics_of("func void main() {\n    int x;\n    x = 1 + true;\n}");
    assert_eq!(
        diagnostics[0].to_string(),
        "TypeError(line: 3)[cannot add int with bool]"
    );
}

#[test]
fn no_output_for_invalid_programs() {
    // compile returns only diagnostics, never a listing, for bad input
    assert!(matches!(
        crux::compile("func void main() { break; }"),
        Err(CompileError::Invalid(_))
    ));
}

#[test]
fn all_errors_are_collected_in_one_run() {
    let diagnostics = diagnostics_of(
        "int x;\nint x;\nfunc void main() {\n    y = 1;\n    x = true;\n}",
    );
    let kinds: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DiagnosticKind::Declaration));
    assert!(kinds.contains(&DiagnosticKind::ResolveSymbol));
    assert!(kinds.contains(&DiagnosticKind::Type));
}
