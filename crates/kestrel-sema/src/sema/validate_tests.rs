use crate::Error;
use crate::test_utils::Fixture;
use crate::checked;

#[test]
fn function_signature() {
    let c = checked!("
        func f(x: Int, _ y: String) -> Bool {}
        func g() {}
    ");

    assert!(c.is_valid());
    assert_eq!(c.interface_type_of(&["f(x:_:)"]), "(x: Int, String) -> Bool");
    assert_eq!(c.interface_type_of(&["g()"]), "() -> ()");
}

#[test]
fn methods_are_curried_over_self() {
    let c = checked!("
        struct S {
            func f() {}
            mutating func g() {}
            static func h() {}
        }
        class C {
            func f() {}
        }
    ");

    assert!(c.is_valid());
    assert_eq!(c.interface_type_of(&["S", "f()"]), "(S) -> () -> ()");
    assert_eq!(c.interface_type_of(&["S", "g()"]), "(inout S) -> () -> ()");
    assert_eq!(c.interface_type_of(&["S", "h()"]), "(S.Type) -> () -> ()");
    assert_eq!(c.interface_type_of(&["C", "f()"]), "(C) -> () -> ()");
}

#[test]
fn initializer_signatures() {
    let c = checked!("
        struct S {
            init(x: Int) {}
            init?() {}
        }
    ");

    assert_eq!(c.interface_type_of(&["S", "init(x:)"]), "(S.Type) -> (x: Int) -> S");
    assert_eq!(c.interface_type_of(&["S", "init()"]), "(S.Type) -> () -> S?");
}

#[test]
fn noreturn_function() {
    let c = checked!("
        @noreturn func fail() {}
    ");

    assert_eq!(c.interface_type_of(&["fail()"]), "@noreturn () -> ()");
}

#[test]
fn enum_case_constructors() {
    let c = checked!("
        enum E {
            case a
            case b(Int)
        }
    ");

    assert!(c.is_valid());
    assert_eq!(c.interface_type_of(&["E", "a"]), "(E.Type) -> E");
    assert_eq!(c.interface_type_of(&["E", "b"]), "(E.Type) -> (Int) -> E");
}

#[test]
fn nominal_types_are_metatypes() {
    let c = checked!("
        struct S {}
        typealias T = S
    ");

    assert_eq!(c.interface_type_of(&["S"]), "S.Type");
    assert_eq!(c.interface_type_of(&["T"]), "T.Type");
}

#[test]
fn weak_variable_wraps_its_type() {
    let c = checked!("
        class C {}
        class D {
            weak var c: C?
        }
    ");

    assert_eq!(c.type_of(&["D", "c"]), "weak C?");
}

#[test]
fn undeclared_parameter_type_invalidates_the_function() {
    let c = checked!("
        func f(x: Missing) {}
    ");

    assert_eq!(c.interface_type_of(&["f(x:)"]), "<<error type>>");
    assert!(c.ast().decl(c.decl(&["f(x:)"])).invalid);
}

#[test]
fn validation_depth_limit_aborts_checking() {
    let result = Fixture::new("func f(x: Int) {}")
        .config(|c| c.max_validation_depth = 1)
        .builder()
        .check();

    assert!(matches!(result, Err(Error::ValidationDepthExceeded(1))));
}
