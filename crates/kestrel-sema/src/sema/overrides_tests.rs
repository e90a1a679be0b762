use crate::ast::{AccessorKind, AttrKind};
use crate::diagnostics::{DiagnosticKind, DiagnosticMessage};
use crate::test_utils::Checked;
use crate::{checked, shot_diagnostics};

fn find(c: &Checked, kind: DiagnosticKind) -> DiagnosticMessage {
    c.module
        .diagnostics()
        .iter()
        .find(|d| d.kind == kind)
        .unwrap_or_else(|| panic!("no {kind:?} in\n{}", c.diagnostics()))
        .clone()
}

#[test]
fn override_of_nothing() {
    shot_diagnostics!(r#"
        class B {}
        class D: B { override func g() {} }
    "#, @r"
    class B {}
    class D: B { override func g() {} }
    ---
    error[2] `g`: method does not override any method from its superclass
    ");
}

#[test]
fn override_outside_a_class() {
    let c = checked!("
        struct S {
            override func f() {}
        }
    ");

    assert_eq!(c.count(DiagnosticKind::MethodDoesNotOverride), 1);
    let f = c.ast().decl(c.decl(&["S", "f()"]));
    assert!(!f.attrs.has(&AttrKind::Override));
}

#[test]
fn explicit_override_is_linked() {
    let c = checked!("
        class B { func f(x: Int) {} }
        class D: B { override func f(x: Int) {} }
    ");

    assert!(c.is_valid());
    let base = c.decl(&["B", "f(x:)"]);
    assert_eq!(c.ast().decl(c.decl(&["D", "f(x:)"])).overridden, Some(base));
}

#[test]
fn overrides_through_two_levels_pick_the_nearest() {
    let c = checked!("
        class A { func f() {} }
        class B: A { override func f() {} }
        class C: B { override func f() {} }
    ");

    assert!(c.is_valid());
    assert_eq!(
        c.ast().decl(c.decl(&["C", "f()"])).overridden,
        Some(c.decl(&["B", "f()"]))
    );
    let summary = c.module.summary();
    let f = summary.find(&["C", "f()"]).expect("summarized");
    assert_eq!(f.overrides.as_deref(), Some("B.f()"));
}

#[test]
fn covariant_method_result() {
    let c = checked!("
        class A {}
        class A2: A {}
        class B { func f() -> A {} }
        class D: B { override func f() -> A2 {} }
    ");

    assert!(c.is_valid());
    assert_eq!(
        c.ast().decl(c.decl(&["D", "f()"])).overridden,
        Some(c.decl(&["B", "f()"]))
    );
}

#[test]
fn argument_labels_differ() {
    let c = checked!("
        class B { func f(x: Int) {} }
        class D: B { override func f(y: Int) {} }
    ");

    let diag = find(&c, DiagnosticKind::OverrideArgumentNameMismatch);
    assert_eq!(
        diag.message,
        "argument names for method 'f(y:)' do not match those of overridden method 'f(x:)'"
    );
    let replacements: Vec<&str> = diag.fixes.iter().map(|f| f.replacement.as_str()).collect();
    assert_eq!(replacements, vec!["x y"]);
    assert_eq!(c.ast().text(diag.fixes[0].span), "y");
    assert_eq!(
        c.ast().decl(c.decl(&["D", "f(y:)"])).overridden,
        Some(c.decl(&["B", "f(x:)"]))
    );
}

#[test]
fn override_of_final_method() {
    let c = checked!("
        class B { final func f() {} }
        class D: B { override func f() {} }
    ");

    let diag = find(&c, DiagnosticKind::OverrideFinal);
    assert_eq!(diag.message, "method overrides a 'final' method");
    assert_eq!(diag.related.len(), 1);
}

#[test]
fn override_in_extension() {
    let c = checked!("
        class B { func f() {} }
        class D: B {}
        extension D { override func f() {} }
    ");

    assert_eq!(c.count(DiagnosticKind::OverrideDeclExtension), 1);
    assert_eq!(c.ast().decl(c.decl(&["extension", "f()"])).overridden, None);
}

#[test]
fn override_of_unavailable_method() {
    let c = checked!("
        class B { @unavailable func f() {} }
        class D: B { override func f() {} }
    ");

    let diag = find(&c, DiagnosticKind::OverrideUnavailable);
    assert_eq!(diag.message, "cannot override 'f()' which has been marked unavailable");
}

#[test]
fn override_of_noreturn_method() {
    let c = checked!("
        class B { @noreturn func f() {} }
        class D: B { override func f() {} }
    ");

    assert_eq!(c.count(DiagnosticKind::OverrideNoReturnWithReturn), 1);
}

#[test]
fn dynamic_is_inherited_by_overrides() {
    let c = checked!("
        class B { dynamic func f() {} }
        class D: B { override func f() {} }
    ");

    assert!(c.is_valid());
    let f = c.ast().decl(c.decl(&["D", "f()"]));
    assert!(f.attrs.has(&AttrKind::Dynamic));
}

#[test]
fn override_less_accessible_than_base() {
    let c = checked!("
        public class B { public func f() {} }
        public class D: B { override func f() {} }
    ");

    let diag = find(&c, DiagnosticKind::OverrideNotAccessible);
    assert_eq!(
        diag.message,
        "overriding method must be as accessible as the declaration it overrides"
    );
    assert_eq!(diag.fixes.len(), 1);
    assert_eq!(diag.fixes[0].replacement, "public ");
}

#[test]
fn stored_property_cannot_override() {
    let c = checked!("
        class B { var x: Int { return 1 } }
        class D: B { override var x: Int = 2 }
    ");

    let diag = find(&c, DiagnosticKind::OverrideWithStoredProperty);
    assert_eq!(diag.message, "cannot override with a stored property 'x'");
    assert_eq!(c.ast().decl(c.decl(&["D", "x"])).overridden, None);
}

#[test]
fn observing_a_read_only_property() {
    let c = checked!("
        class B { var x: Int { return 1 } }
        class D: B { override var x: Int { didSet {} } }
    ");

    let diag = find(&c, DiagnosticKind::ObservingReadonlyProperty);
    assert_eq!(diag.message, "cannot observe read-only property 'x'; it can't change");
}

#[test]
fn read_only_override_of_mutable_property() {
    let c = checked!("
        class B { var x: Int = 0 }
        class D: B { override var x: Int { return 1 } }
    ");

    assert_eq!(c.count(DiagnosticKind::OverrideMutableWithReadonlyProperty), 1);
}

#[test]
fn override_of_let_property() {
    let c = checked!("
        class B { let x: Int = 0 }
        class D: B { override var x: Int { return 1 } }
    ");

    let diag = find(&c, DiagnosticKind::OverrideLetProperty);
    assert_eq!(
        diag.message,
        "cannot override immutable 'let' property 'x' with the getter of a 'var'"
    );
}

#[test]
fn property_type_mismatch() {
    let c = checked!(r#"
        class B { var x: Int { return 1 } }
        class D: B { override var x: String { return "" } }
    "#);

    let diag = find(&c, DiagnosticKind::OverridePropertyTypeMismatch);
    assert_eq!(
        diag.message,
        "property 'x' with type 'String' cannot override a property with type 'Int'"
    );
}

#[test]
fn covariant_override_of_mutable_property() {
    let c = checked!("
        class A {}
        class A2: A {}
        class B { var a: A { get {} set {} } }
        class D: B { override var a: A2 { return A2() } }
    ");

    assert_eq!(c.count(DiagnosticKind::OverrideMutableCovariantProperty), 1);
}

#[test]
fn accessors_override_accessors() {
    let c = checked!("
        class B { var x: Int { get {} set {} } }
        class D: B { override var x: Int { get {} set {} } }
    ");

    assert!(c.is_valid());
    for kind in [AccessorKind::Getter, AccessorKind::Setter] {
        let base = c.accessor(&["B", "x"], kind).expect("base accessor");
        let own = c.accessor(&["D", "x"], kind).expect("own accessor");
        assert_eq!(c.ast().decl(own).overridden, Some(base), "{kind:?}");
        assert!(c.ast().decl(own).attrs.has(&AttrKind::Override));
    }
}

#[test]
fn missing_override_on_property_has_no_fix() {
    let c = checked!("
        class B { var x: Int { return 1 } }
        class D: B { var x: Int { return 2 } }
    ");

    let diag = find(&c, DiagnosticKind::MissingOverride);
    assert!(diag.fixes.is_empty());
    assert_eq!(
        c.ast().decl(c.decl(&["D", "x"])).overridden,
        Some(c.decl(&["B", "x"]))
    );
}

#[test]
fn required_init_overridden_without_required() {
    shot_diagnostics!(r#"
        class B { required init() {} }
        class D: B { init() {} }
    "#, @r#"
    class B { required init() {} }
    class D: B { init() {} }
    ---
    error[2] `init`: 'required' modifier must be present on all overrides of a required initializer
      fix[2] "required ": insert 'required'
    "#);
}

#[test]
fn required_init_overridden_with_override() {
    let c = checked!("
        class B { required init() {} }
        class D: B { override init() {} }
    ");

    let diag = find(&c, DiagnosticKind::RequiredInitializerOverrideWrongKeyword);
    assert_eq!(diag.fixes[0].replacement, "required");
    let init = c.ast().decl(c.decl(&["D", "init()"]));
    assert!(init.attrs.has(&AttrKind::Required));
}

#[test]
fn required_init_with_redundant_override() {
    let c = checked!("
        class B { required init() {} }
        class D: B { required override init() {} }
    ");

    let diag = find(&c, DiagnosticKind::RequiredInitializerOverrideKeyword);
    assert_eq!(diag.fixes[0].replacement, "");
    assert_eq!(diag.fixes[0].description, "remove 'override'");
}

#[test]
fn failable_init_overrides_non_failable() {
    let c = checked!("
        class B { init() {} }
        class D: B { override init?() {} }
    ");

    let diag = find(&c, DiagnosticKind::FailableInitializerOverride);
    assert_eq!(diag.related.len(), 1);
}

#[test]
fn initializer_does_not_override() {
    let c = checked!("
        class B { init() {} }
        class D: B { override init(x: Int) {} }
    ");

    assert_eq!(c.count(DiagnosticKind::InitializerDoesNotOverride), 1);
}

#[test]
fn label_fix_keeps_the_parameter_type() {
    let c = checked!("
        class B { func f(_ a: Int, x b: Int) {} }
        class D: B { override func f(y a: Int, x b: Int) {} }
    ");

    let diag = find(&c, DiagnosticKind::OverrideArgumentNameMismatch);
    let fixes: Vec<(&str, &str)> = diag
        .fixes
        .iter()
        .map(|f| (c.ast().text(f.span), f.replacement.as_str()))
        .collect();
    assert_eq!(fixes, vec![("y a", "_ a")]);
}
