use crate::diagnostics::DiagnosticKind;
use crate::{checked, shot_diagnostics};

#[test]
fn redeclared_type() {
    shot_diagnostics!(r"
        struct S {}
        struct S {}
    ", @r"
    struct S {}
    struct S {}
    ---
    error[2] `S`: invalid redeclaration of 'S'
      note[1] `S`: 'S' previously declared here
    ");
}

#[test]
fn redeclared_method() {
    shot_diagnostics!(r"
        struct S {
            func f() {}
            func f() {}
        }
    ", @r"
    struct S {
        func f() {}
        func f() {}
    }
    ---
    error[3] `f`: invalid redeclaration of 'f()'
      note[2] `f`: 'f()' previously declared here
    ");
}

#[test]
fn overloads_by_type_are_distinct() {
    let c = checked!("
        struct S {
            func f(x: Int) {}
            func f(x: String) {}
            func f() {}
        }
        func g(x: Int) {}
        func g(x: Bool) {}
    ");

    assert!(c.is_valid());
}

#[test]
fn static_and_instance_methods_do_not_conflict() {
    let c = checked!("
        struct S {
            func f() {}
            static func f() {}
        }
    ");

    assert_eq!(c.count(DiagnosticKind::InvalidRedecl), 0);
}

#[test]
fn property_and_method_share_a_name() {
    let c = checked!("
        struct S {
            var x: Int = 0
            func x() {}
        }
    ");

    assert_eq!(c.count(DiagnosticKind::InvalidRedecl), 1);
    assert!(c.ast().decl(c.decl(&["S", "x()"])).invalid);
    assert!(!c.ast().decl(c.decl(&["S", "x"])).invalid);
}

#[test]
fn redeclaration_is_reported_once() {
    let c = checked!("
        class C {}
        class C {}
        class C {}
    ");

    assert_eq!(c.count(DiagnosticKind::InvalidRedecl), 2);
}

#[test]
fn property_and_method_with_arguments_coexist() {
    let c = checked!("
        struct S {
            var x: Int = 0
            func x(y: Int) {}
        }
        var g: Int = 0
        func g() {}
    ");

    assert_eq!(c.count(DiagnosticKind::InvalidRedecl), 1);
    assert!(!c.ast().decl(c.decl(&["S", "x(y:)"])).invalid);
    assert!(c.ast().decl(c.decl(&["g()"])).invalid);
}
