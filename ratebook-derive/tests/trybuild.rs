#[test]
fn trybuild_suite() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/pass_basic.rs");
    t.pass("tests/trybuild/pass_roundtrip.rs");
}
