const SRC: &str = "func void main() { printInt(1 + 2 * 3); }";

#[test]
fn compile_arithmetic() {
    let listing = crux::compile(SRC).expect("program is valid");

    assert!(listing.contains("\t.globl main"));
    assert!(listing.contains("main:"));
    // the product folds before the sum
    assert!(listing.contains("\timulq"));
    assert!(listing.contains("\taddq"));
    assert!(listing.contains("\tcall printInt"));
    assert!(listing.ends_with('\n'));
}

#[test]
fn precedence_is_respected() {
    // 1 + 2 * 3 multiplies first, so the multiply reads the 2 and 3 temps
    let listing = crux::compile(SRC).expect("program is valid");
    let imul = listing.find("\timulq").expect("multiply is emitted");
    let add = listing.find("\taddq").expect("add is emitted");
    assert!(imul < add);
}
