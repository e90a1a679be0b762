use crate::{DeclName, Interner};

#[test]
fn display_simple_and_compound() {
    let mut interner = Interner::new();
    let init = interner.intern("init");
    let x = interner.intern("x");

    let simple = DeclName::simple(x);
    let compound = DeclName::compound(init, vec![Some(x), None]);

    assert_eq!(simple.display(&interner).to_string(), "x");
    assert_eq!(compound.display(&interner).to_string(), "init(x:_:)");
}

#[test]
fn simple_name_matches_any_compound_with_same_base() {
    let mut interner = Interner::new();
    let f = interner.intern("f");
    let a = interner.intern("a");
    let b = interner.intern("b");

    let simple = DeclName::simple(f);
    let fa = DeclName::compound(f, vec![Some(a)]);
    let fb = DeclName::compound(f, vec![Some(b)]);

    assert!(simple.matches(&fa));
    assert!(fa.matches(&simple));
    assert!(!fa.matches(&fb));
    assert_eq!(fa.base_name(), simple);
}

#[test]
fn arity_of_names() {
    let mut interner = Interner::new();
    let init = interner.intern("init");

    assert_eq!(DeclName::simple(init).arity(), None);
    assert_eq!(DeclName::compound(init, vec![]).arity(), Some(0));
    assert!(DeclName::compound(init, vec![]).labels().is_empty());
}
