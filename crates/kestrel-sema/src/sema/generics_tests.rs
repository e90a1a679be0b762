use crate::ast::DeclId;
use crate::test_utils::Checked;
use crate::{checked, shot_diagnostics};

fn generic_params(c: &Checked, path: &[&str]) -> Vec<DeclId> {
    c.ast()
        .decl(c.decl(path))
        .generic_params()
        .map(|list| list.params.clone())
        .unwrap_or_default()
}

fn archetype(c: &Checked, param: DeclId) -> Option<crate::types::TypeId> {
    c.ast().decl(param).as_type_param().and_then(|p| p.archetype)
}

#[test]
fn generic_params_get_archetypes() {
    let c = checked!("
        struct S<T> {
            var x: T
        }
    ");

    assert!(c.is_valid());
    let params = generic_params(&c, &["S"]);
    assert_eq!(params.len(), 1);
    assert!(archetype(&c, params[0]).is_some());
    assert_eq!(c.interface_type_of(&["S", "x"]), "T");
    assert_eq!(c.type_of(&["S", "x"]), "T");
}

#[test]
fn same_type_requirement_shares_an_archetype() {
    let c = checked!("
        struct S<T, U where T == U> {
            var x: U
        }
    ");

    assert!(c.is_valid());
    let params = generic_params(&c, &["S"]);
    assert_eq!(archetype(&c, params[0]), archetype(&c, params[1]));
    assert_eq!(c.interface_type_of(&["S", "x"]), "U");
    assert_eq!(c.type_of(&["S", "x"]), "T");

    let list = c.ast().decl(c.decl(&["S"])).generic_params().expect("generic");
    assert_eq!(list.archetypes.len(), 1);
}

#[test]
fn conformance_to_a_struct() {
    shot_diagnostics!(r"
        func f<T where T: Int>(x: T) {}
    ", @r"
    func f<T where T: Int>(x: T) {}
    ---
    error[1] `T: Int`: type 'T' constrained to non-protocol, non-class type 'Int'
    ");
}

#[test]
fn requirement_on_a_concrete_type() {
    shot_diagnostics!(r"
        protocol P {}
        func f<T where Int: P>(x: T) {}
    ", @r"
    protocol P {}
    func f<T where Int: P>(x: T) {}
    ---
    error[2] `Int: P`: requirement subject 'Int' is not a generic parameter or associated type
    ");
}

#[test]
fn same_type_as_a_concrete_type() {
    shot_diagnostics!(r"
        func f<T where T == Int>(x: T) {}
    ", @r"
    func f<T where T == Int>(x: T) {}
    ---
    error[1] `T == Int`: same-type requirement makes generic parameter 'T' non-generic
    ");
}

#[test]
fn invalid_requirements_are_marked() {
    let c = checked!("func f<T where T == Int>(x: T) {}");

    let list = c.ast().decl(c.decl(&["f(x:)"])).generic_params().expect("generic");
    assert!(list.requirements[0].invalid);
}

#[test]
fn generic_param_inherits_a_struct() {
    shot_diagnostics!(r"
        struct S<T: Int> {}
    ", @r"
    struct S<T: Int> {}
    ---
    error[1] `Int`: inheritance from non-protocol, non-class type 'Int'
    ");
}

#[test]
fn generic_param_with_protocol_bound() {
    let c = checked!("
        protocol P {}
        class B {}
        func f<T: P, U: B>(x: T, y: U) {}
    ");

    assert!(c.is_valid());
    let params = generic_params(&c, &["f(x:y:)"]);
    let t = c.ast().decl(params[0]).as_type_param().expect("type param");
    assert_eq!(t.protocols.len(), 1);
    let u = c.ast().decl(params[1]).as_type_param().expect("type param");
    assert!(u.superclass.is_some());
}

#[test]
fn nested_generic_function_sees_outer_params() {
    let c = checked!("
        struct S<T> {
            func f<U>(x: T, y: U) {}
        }
    ");

    assert!(c.is_valid());
    assert!(archetype(&c, generic_params(&c, &["S"])[0]).is_some());
    assert!(archetype(&c, generic_params(&c, &["S", "f(x:y:)"])[0]).is_some());
}

#[test]
fn protocol_associated_types_get_archetypes() {
    let c = checked!("
        protocol P {
            associatedtype A
            func f(x: A)
        }
    ");

    assert!(c.is_valid());
    let a = c.ast().decl(c.decl(&["P", "A"]));
    assert!(a.as_type_param().and_then(|p| p.archetype).is_some());
}
