use crate::diagnostics::DiagnosticKind;
use crate::{checked, shot_diagnostics};

#[test]
fn superclass_not_first() {
    shot_diagnostics!(r#"
        protocol P {}
        class B {}
        class C: P, B {}
    "#, @r#"
    protocol P {}
    class B {}
    class C: P, B {}
    ---
    error[3] `B`: superclass 'B' must appear first in the inheritance clause
      fix[3] "": move 'B' to the front
      fix[3] "B, ": insert 'B' first
    "#);
}

#[test]
fn superclass_not_first_is_still_recorded() {
    let c = checked!("
        protocol P {}
        class B {}
        class C: P, B {}
    ");

    let summary = c.module.summary();
    let class = summary.find(&["C"]).expect("summarized");
    assert_eq!(class.superclass.as_deref(), Some("B"));
    assert_eq!(class.protocols, vec!["P".to_string()]);
}

#[test]
fn multiple_superclasses() {
    shot_diagnostics!(r"
        class A {}
        class B {}
        class C: A, B {}
    ", @r"
    class A {}
    class B {}
    class C: A, B {}
    ---
    error[3] `B`: multiple inheritance from classes 'A' and 'B'
    ");
}

#[test]
fn struct_inherits_class() {
    shot_diagnostics!(r"
        class A {}
        struct S: A {}
    ", @r"
    class A {}
    struct S: A {}
    ---
    error[2] `A`: non-class type 'S' cannot inherit from class 'A'
    ");
}

#[test]
fn class_inherits_struct() {
    shot_diagnostics!(r"
        struct T {}
        class C: T {}
    ", @r"
    struct T {}
    class C: T {}
    ---
    error[2] `T`: inheritance from non-protocol, non-class type 'T'
    ");
}

#[test]
fn struct_inherits_struct() {
    shot_diagnostics!(r"
        struct T {}
        struct S: T {}
    ", @r"
    struct T {}
    struct S: T {}
    ---
    error[2] `T`: inheritance from non-protocol type 'T'
    ");
}

#[test]
fn extension_adds_superclass() {
    shot_diagnostics!(r"
        class A {}
        struct S {}
        extension S: A {}
    ", @r"
    class A {}
    struct S {}
    extension S: A {}
    ---
    error[3] `A`: extension of type 'S' cannot inherit from class 'A'
    ");
}

#[test]
fn struct_inherits_any_object() {
    shot_diagnostics!(r"
        struct S: AnyObject {}
    ", @r"
    struct S: AnyObject {}
    ---
    error[1] `AnyObject`: only protocols can inherit from 'AnyObject'
    ");
}

#[test]
fn protocol_may_inherit_any_object() {
    let c = checked!("protocol P: AnyObject {}");

    assert!(c.is_valid());
}

#[test]
fn inheritance_from_final_class() {
    let c = checked!("
        final class A {}
        class B: A {}
    ");

    let diag = c
        .module
        .diagnostics()
        .iter()
        .find(|d| d.kind == DiagnosticKind::InheritanceFromFinalClass)
        .expect("final class diagnosed");
    assert_eq!(diag.message, "inheritance from a final class 'A'");
}

#[test]
fn enum_raw_type_not_first() {
    let c = checked!("
        protocol P {}
        enum E: P, Int {
            case a
        }
    ");

    assert_eq!(c.kinds(), vec![DiagnosticKind::RawTypeNotFirst]);
    let summary = c.module.summary();
    assert_eq!(summary.find(&["E"]).and_then(|e| e.raw_type.as_deref()), Some("Int"));
}

#[test]
fn multiple_enum_raw_types() {
    shot_diagnostics!(r"
        enum E: Int, String {
            case a
        }
    ", @r"
    enum E: Int, String {
        case a
    }
    ---
    error[1] `String`: multiple enum raw types 'Int' and 'String'
    ");
}

#[test]
fn enum_with_raw_type_conforms_to_raw_representable() {
    let c = checked!("
        enum E: Int {
            case a
        }
    ");

    let summary = c.module.summary();
    let e = summary.find(&["E"]).expect("summarized");
    assert_eq!(e.protocols, vec!["RawRepresentable".to_string()]);
}

#[test]
fn objc_protocol_refines_plain_protocol() {
    shot_diagnostics!(r"
        protocol P {}
        @objc protocol Q: P {}
    ", @r"
    protocol P {}
    @objc protocol Q: P {}
    ---
    error[2] `Q`: @objc protocol 'Q' cannot refine non-@objc protocol 'P'
    ");
}

#[test]
fn undeclared_type_in_clause() {
    shot_diagnostics!(r"
        class C: Missing {}
    ", @r"
    class C: Missing {}
    ---
    error[1] `Missing`: use of undeclared type 'Missing'
    ");
}

#[test]
fn protocol_refinements_are_recorded() {
    let c = checked!("
        protocol P {}
        protocol Q: P {}
    ");

    let summary = c.module.summary();
    assert_eq!(summary.find(&["Q"]).expect("summarized").protocols, vec!["P".to_string()]);
}
