use crate::ast::AttrKind;
use crate::diagnostics::DiagnosticKind;
use crate::{checked, shot_diagnostics};

#[test]
fn lazy_on_let() {
    shot_diagnostics!(r#"
        struct S {
            lazy let x: Int = 1
        }
    "#, @r#"
    struct S {
        lazy let x: Int = 1
    }
    ---
    error[2] `lazy`: 'lazy' cannot be used on a let
      fix[2] "": remove 'lazy'
    "#);
}

#[test]
fn lazy_requires_initializer() {
    shot_diagnostics!(r#"
        struct S {
            lazy var x: Int
        }
    "#, @r#"
    struct S {
        lazy var x: Int
    }
    ---
    error[2] `lazy`: lazy properties must have an initializer
      fix[2] "": remove 'lazy'
    "#);
}

#[test]
fn rejected_attribute_is_invalidated() {
    let c = checked!("
        struct S {
            lazy let x: Int = 1
        }
    ");

    let x = c.ast().decl(c.decl(&["S", "x"]));
    assert!(!x.attrs.has(&AttrKind::Lazy));
    assert!(x.as_var().is_some_and(|v| v.lazy_storage.is_none()));
}

#[test]
fn final_and_dynamic_conflict() {
    shot_diagnostics!(r"
        class C {
            final dynamic func f() {}
        }
    ", @r"
    class C {
        final dynamic func f() {}
    }
    ---
    error[2] `dynamic`: a declaration cannot be both 'final' and 'dynamic'
    ");
}

#[test]
fn mutating_in_class() {
    shot_diagnostics!(r#"
        class C {
            mutating func f() {}
        }
    "#, @r#"
    class C {
        mutating func f() {}
    }
    ---
    error[2] `mutating`: 'mutating' is only valid on methods of structs, enums and protocols
      fix[2] "": remove 'mutating'
    "#);
}

#[test]
fn mutating_in_struct_is_allowed() {
    let c = checked!("
        struct S {
            mutating func f() {}
        }
    ");

    assert!(c.is_valid());
}

#[test]
fn managed_outside_class() {
    shot_diagnostics!(r#"
        struct S {
            @managed var x: Int
        }
    "#, @r#"
    struct S {
        @managed var x: Int
    }
    ---
    error[2] `@managed`: '@managed' may only be used on class properties
      fix[2] "": remove '@managed'
    "#);
}

#[test]
fn attribute_on_wrong_declaration() {
    shot_diagnostics!(r#"
        class C {
            required func f() {}
        }
    "#, @r#"
    class C {
        required func f() {}
    }
    ---
    error[2] `required`: 'required' cannot be applied to this method
      fix[2] "": remove 'required'
    "#);
}

#[test]
fn objc_struct() {
    shot_diagnostics!(r#"
        @objc struct S {}
    "#, @r#"
    @objc struct S {}
    ---
    error[1] `@objc`: only classes, protocols and their members can be @objc, not this struct
      fix[1] "": remove '@objc'
    "#);
}

#[test]
fn objc_class_members_are_accepted() {
    let c = checked!("
        @objc class C {
            @objc func f() {}
            @objc var x: Int = 0
        }
    ");

    assert!(c.is_valid());
    assert!(c.ast().decl(c.decl(&["C", "f()"])).is_objc());
}

#[test]
fn objc_name_argument_count() {
    let c = checked!("
        class C {
            @objc(doThing:with:) func f(x: Int) {}
        }
    ");

    assert_eq!(c.kinds(), vec![DiagnosticKind::ObjCNameFuncMismatch]);
    insta::assert_snapshot!(
        c.module.diagnostics().iter().next().map(|d| d.message.clone()).unwrap_or_default(),
        @"@objc name provides 2 argument names, but the method has 1 parameter"
    );
}
