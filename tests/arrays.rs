const SRC: &str = "\
int a[5];
func void main() {
    int i;
    for (i = 0; i < 5; i = i + 1;) a[i] = i * i;
    printInt(a[3]);
}";

#[test]
fn compile_array_program() {
    let listing = crux::compile(SRC).expect("program is valid");

    // five elements of 8 bytes each
    assert!(listing.contains("\t.comm a, 40, 8"));
    // element addresses scale the index by the element size
    assert!(listing.contains("\timulq $8, %r10"));
    assert!(listing.contains("\taddq %r10, %r11"));
    // the loop produces a backwards jump
    assert!(listing.contains("\tjmp .L"));
    assert!(listing.contains("\tje .L"));
}
