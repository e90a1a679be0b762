use crate::diagnostics::{DiagnosticKind, Severity};
use crate::test_utils::Fixture;
use crate::{checked, shot_diagnostics};

#[test]
fn pattern_without_type() {
    shot_diagnostics!(r"
        var x
    ", @r"
    var x
    ---
    error[1] `x`: type annotation missing in pattern
    ");
}

#[test]
fn let_requires_initializer() {
    shot_diagnostics!(r"
        let x: Int
    ", @r"
    let x: Int
    ---
    error[1] `x`: 'let' declarations require an initializer expression
    ");
}

#[test]
fn let_members_may_be_initialized_later() {
    let c = checked!("
        struct S {
            let x: Int
        }
    ");

    assert!(c.is_valid());
}

#[test]
fn optional_let_is_default_initialized() {
    let c = checked!("let x: Int?");

    assert!(c.is_valid());
    assert_eq!(c.kinds(), vec![DiagnosticKind::LetDefaultInit]);
    assert_eq!(c.module.diagnostics().iter().next().map(|d| d.severity()), Some(Severity::Warning));
    let binding = c.ast().decl(c.decl(&["x"])).as_var().and_then(|v| v.binding).expect("bound");
    assert!(c.ast().decl(binding).as_binding().is_some_and(|b| b.init.is_some()));
}

#[test]
fn globals_in_library_files_need_initializers() {
    let c = Fixture::library("var x: Int\nvar y: Int?\nvar z: Int = 0").check();

    insta::assert_snapshot!(c.diagnostics(), @"error[1] `x`: global variables require an initializer");
}

#[test]
fn globals_in_main_file_may_be_uninitialized() {
    let c = checked!("var x: Int");

    assert!(c.is_valid());
}

#[test]
fn static_outside_type() {
    shot_diagnostics!(r#"
        static var x: Int = 0
    "#, @r#"
    static var x: Int = 0
    ---
    error[1] `static`: static properties may only be declared on a type
      fix[1] "": remove 'static'
    "#);
}

#[test]
fn static_cleared_outside_type() {
    let c = checked!("static var x: Int = 0");

    let x = c.ast().decl(c.decl(&["x"]));
    assert!(x.as_var().is_some_and(|v| !v.is_static));
}

#[test]
fn class_var_in_value_type() {
    shot_diagnostics!(r#"
        struct S {
            class var x: Int = 0
        }
    "#, @r#"
    struct S {
        class var x: Int = 0
    }
    ---
    error[2] `class`: class properties are only allowed within classes and protocols
      fix[2] "static": replace 'class' with 'static'
    "#);
}

#[test]
fn inferred_type_from_initializer() {
    let c = checked!("
        var x = 1
        var s = \"text\"
    ");

    assert!(c.is_valid());
    assert_eq!(c.type_of(&["x"]), "Int");
    assert_eq!(c.type_of(&["s"]), "String");
}

#[test]
fn tuple_pattern_binds_each_element() {
    let c = checked!("var (a, b): (Int, Bool) = (1, true)");

    assert!(c.is_valid());
    assert_eq!(c.type_of(&["a"]), "Int");
    assert_eq!(c.type_of(&["b"]), "Bool");
}
