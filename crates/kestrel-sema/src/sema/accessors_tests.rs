use crate::ast::{AccessorKind, StorageKind};
use crate::diagnostics::DiagnosticKind;
use crate::{checked, shot_diagnostics};

fn storage_kind(c: &crate::test_utils::Checked, path: &[&str]) -> StorageKind {
    c.ast()
        .decl(c.decl(path))
        .storage()
        .map(|s| s.kind)
        .expect("storage declaration")
}

#[test]
fn class_stored_property_gets_trivial_accessors() {
    let c = checked!("
        class C {
            var x: Int = 0
        }
    ");

    assert!(c.is_valid());
    assert_eq!(storage_kind(&c, &["C", "x"]), StorageKind::StoredWithTrivialAccessors);
    assert!(c.accessor(&["C", "x"], AccessorKind::Getter).is_some());
    assert!(c.accessor(&["C", "x"], AccessorKind::Setter).is_some());
    assert!(c.accessor(&["C", "x"], AccessorKind::MaterializeForSet).is_some());
}

#[test]
fn final_class_property_has_no_materialize_for_set() {
    let c = checked!("
        final class C {
            var x: Int = 0
        }
    ");

    assert!(c.accessor(&["C", "x"], AccessorKind::Setter).is_some());
    assert!(c.accessor(&["C", "x"], AccessorKind::MaterializeForSet).is_none());
}

#[test]
fn class_let_is_final_and_read_only() {
    let c = checked!("
        class C {
            let x: Int = 0
        }
    ");

    assert!(c.ast().decl(c.decl(&["C", "x"])).is_final());
    assert!(c.accessor(&["C", "x"], AccessorKind::Getter).is_some());
    assert!(c.accessor(&["C", "x"], AccessorKind::Setter).is_none());
}

#[test]
fn struct_stored_property_stays_stored() {
    let c = checked!("
        struct S {
            var x: Int = 0
        }
    ");

    assert_eq!(storage_kind(&c, &["S", "x"]), StorageKind::Stored);
    assert!(c.accessor(&["S", "x"], AccessorKind::Getter).is_none());
}

#[test]
fn trivial_getter_reads_storage() {
    let c = checked!("
        class C {
            var x: Int = 0
        }
    ");

    let getter = c.accessor(&["C", "x"], AccessorKind::Getter).expect("getter");
    let body = c.ast().decl(getter).body().expect("getter body");
    insta::assert_snapshot!(
        crate::ast::dump::dump_body(c.ast(), c.module.types(), body),
        @"return self.x[storage]"
    );
}

#[test]
fn protocol_stored_property() {
    shot_diagnostics!(r"
        protocol P {
            var x: Int
        }
    ", @r"
    protocol P {
        var x: Int
    }
    ---
    error[2] `x`: protocol properties must be computed
    ");
}

#[test]
fn protocol_stored_property_becomes_computed() {
    let c = checked!("
        protocol P {
            var x: Int
        }
    ");

    assert_eq!(storage_kind(&c, &["P", "x"]), StorageKind::Computed);
    assert!(c.accessor(&["P", "x"], AccessorKind::Getter).is_some());
}

#[test]
fn protocol_computed_property_is_accepted() {
    let c = checked!("
        protocol P {
            var x: Int { get }
            var y: Int { get set }
        }
    ");

    assert!(c.is_valid());
    assert!(c.accessor(&["P", "y"], AccessorKind::MaterializeForSet).is_some());
    assert!(c.accessor(&["P", "x"], AccessorKind::MaterializeForSet).is_none());
}

#[test]
fn enum_stored_property() {
    let c = checked!("
        enum E {
            case a
            var x: Int = 0
        }
    ");

    assert_eq!(c.kinds(), vec![DiagnosticKind::EnumStoredProperty]);
    assert!(c.ast().decl(c.decl(&["E", "x"])).invalid);
}

#[test]
fn extension_stored_property() {
    let c = checked!("
        struct S {}
        extension S {
            var x: Int = 0
        }
    ");

    assert_eq!(c.kinds(), vec![DiagnosticKind::ExtensionStoredProperty]);
}

#[test]
fn static_stored_property_in_extension_is_allowed() {
    let c = checked!("
        struct S {}
        extension S {
            static var x: Int = 0
        }
    ");

    assert!(c.is_valid());
}

#[test]
fn observing_property_synthesizes_getter_and_setter() {
    let c = checked!("
        struct S {
            var x: Int = 0 {
                willSet {}
                didSet {}
            }
        }
    ");

    assert!(c.is_valid());
    assert_eq!(storage_kind(&c, &["S", "x"]), StorageKind::Observing);
    let setter = c.accessor(&["S", "x"], AccessorKind::Setter).expect("setter");
    assert!(c.ast().decl(setter).as_func().is_some_and(|f| f.is_mutating));
    let body = c.ast().decl(setter).body().expect("setter body");
    assert_eq!(body.stmts.len(), 4);
}
