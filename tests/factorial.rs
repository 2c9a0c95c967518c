const SRC: &str = "\
func int f(int x) {
    if x == 0 {
        return 1;
    } else {
        return x * f(x - 1);
    }
}
func void main() {
    printInt(f(5));
}";

#[test]
fn compile_recursive_factorial() {
    let listing = crux::compile(SRC).expect("program is valid");

    assert!(listing.contains("\t.globl f"));
    assert!(listing.contains("\t.globl main"));
    // the recursive call passes its argument in %rdi
    assert!(listing.contains(", %rdi\n\tcall f"));
    // both branches return, so f tears down its frame more than once
    let frames = listing.matches("\tleave\n\tret").count();
    assert!(frames >= 3, "expected returns in f (twice) and main");
}
