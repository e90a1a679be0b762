//! End-to-end checking of small modules.

use super::Elaborator;
use crate::SemaConfig;
use crate::ast::dump::dump_body;
use crate::ast::{AccessorKind, Accessibility, DeclId, DeclKind, FileId, ImplicitCtorKind};
use crate::collab::{ArenaLookup, DefaultArchetypes, LiteralChecker};
use crate::diagnostics::DiagnosticKind;
use crate::prelude::{self, KnownDecls};
use crate::test_utils::{Checked, Fixture};
use crate::types::{TYPE_ERROR, TypeId};
use crate::{checked, shot_diagnostics};

/// Display names of the initializers of `path`, with their synthesis kind.
fn initializers(c: &Checked, path: &[&str]) -> Vec<(String, Option<ImplicitCtorKind>)> {
    let ast = c.ast();
    ast.decl(c.decl(path))
        .members()
        .iter()
        .filter_map(|&m| {
            let ctor = ast.decl(m).as_ctor()?;
            Some((ast.name_of(m), ctor.synthesized))
        })
        .collect()
}

#[test]
fn empty_module_is_valid() {
    let c = checked!("");

    assert!(c.is_valid());
    insta::assert_snapshot!(c.diagnostics(), @"<no diagnostics>");
}

#[test]
fn duplicate_inheritance_entry() {
    shot_diagnostics!(r#"
        protocol P {}
        class C: P, P {}
    "#, @r#"
    protocol P {}
    class C: P, P {}
    ---
    error[2] `P`: duplicate inheritance from 'P'
      fix[2] "": remove duplicate
    "#);
}

#[test]
fn duplicate_auto_incremented_raw_value() {
    shot_diagnostics!(r#"
        enum E: Int {
            case a = 1, b, c = 2
        }
    "#, @r"
    enum E: Int {
        case a = 1, b, c = 2
    }
    ---
    error[2] `2`: raw value for enum case is not unique
      note[2] `b`: raw value previously used here
      note[2] `1`: raw value auto-incremented from here
    ");
}

#[test]
fn duplicate_raw_value_marks_case_invalid() {
    let c = checked!("
        enum E: Int {
            case a = 1, b, c = 2
        }
    ");

    assert!(!c.ast().decl(c.decl(&["E", "a"])).invalid);
    assert!(!c.ast().decl(c.decl(&["E", "b"])).invalid);
    assert!(c.ast().decl(c.decl(&["E", "c"])).invalid);
    assert_eq!(c.count(DiagnosticKind::EnumRawValueNotUnique), 1);
}

#[test]
fn missing_override_keyword() {
    shot_diagnostics!(r#"
        class B { func f() {} }
        class D: B { func f() {} }
    "#, @r#"
    class B { func f() {} }
    class D: B { func f() {} }
    ---
    error[2] `f`: overriding declaration requires an 'override' keyword
      note[1] `f`: overridden declaration is here
      fix[2] "override ": insert 'override'
    "#);
}

#[test]
fn missing_override_still_links_the_override() {
    let c = checked!("
        class B { func f() {} }
        class D: B { func f() {} }
    ");
    let base = c.decl(&["B", "f()"]);
    let derived = c.decl(&["D", "f()"]);

    assert_eq!(c.ast().decl(derived).overridden, Some(base));
    assert!(c.ast().decl(base).overriders.contains(&derived));
    let summary = c.module.summary();
    let f = summary.find(&["D", "f()"]).expect("summarized");
    assert_eq!(f.overrides.as_deref(), Some("B.f()"));
}

#[test]
fn inherited_designated_initializers() {
    let c = checked!("
        class B {
            init(x: Int) {}
        }
        class D: B {}
    ");

    assert!(c.is_valid());
    let init = c.decl(&["D", "init(x:)"]);
    let decl = c.ast().decl(init);
    assert!(decl.implicit);
    assert_eq!(
        decl.as_ctor().and_then(|ctor| ctor.synthesized),
        Some(ImplicitCtorKind::Chaining)
    );
    assert_eq!(decl.overridden, Some(c.decl(&["B", "init(x:)"])));

    let body = decl.body().expect("chaining initializers have a body");
    insta::assert_snapshot!(dump_body(c.ast(), c.module.types(), body), @"super.init(x: x)");

    let summary = c.module.summary();
    let summarized = summary.find(&["D", "init(x:)"]).expect("summarized");
    assert_eq!(summarized.overrides.as_deref(), Some("B.init(x:)"));
    assert!(summarized.implicit);
}

#[test]
fn function_type_access() {
    shot_diagnostics!(r#"
        struct S {}
        public func f(x: S) {}
    "#, @r"
    struct S {}
    public func f(x: S) {}
    ---
    error[2] `f`: function cannot be declared public because its parameter uses an internal type
      note[1] `S`: type declared here
    ");
}

#[test]
fn function_type_access_poisons_the_function() {
    let c = checked!("
        struct S {}
        public func f(x: S) {}
    ");

    assert!(c.ast().decl(c.decl(&["f(x:)"])).invalid);
    assert_eq!(c.count(DiagnosticKind::FunctionTypeAccess), 1);
}

#[test]
fn lazy_property() {
    let c = checked!("
        struct S {
            lazy var x: Int = 1
        }
    ");
    assert!(c.is_valid());

    let storage = c.decl(&["S", "x.storage"]);
    assert!(c.ast().decl(storage).implicit);
    assert_eq!(
        c.ast().decl(storage).attrs.accessibility(),
        Some(Accessibility::Private)
    );
    assert_eq!(c.type_of(&["S", "x.storage"]), "Int?");

    let getter = c.accessor(&["S", "x"], AccessorKind::Getter).expect("getter");
    let getter = c.ast().decl(getter);
    assert!(getter.as_func().is_some_and(|f| f.is_mutating));
    let body = getter.body().expect("getter body");
    insta::assert_snapshot!(dump_body(c.ast(), c.module.types(), body), @r"
    let tmp1 = self.x.storage[storage]
    if tmp1
      return tmp1!
    let tmp2 = 1
    self.x.storage[storage] = tmp2
    return tmp2
    ");

    let setter = c.accessor(&["S", "x"], AccessorKind::Setter).expect("setter");
    let body = c.ast().decl(setter).body().expect("setter body");
    insta::assert_snapshot!(
        dump_body(c.ast(), c.module.types(), body),
        @"self.x.storage[storage] = value"
    );
}

#[test]
fn class_with_defaulted_properties_gets_one_default_init() {
    let c = checked!("
        class C {
            var x: Int = 1
            var y: Int? = nil
        }
    ");

    assert!(c.is_valid());
    assert_eq!(
        initializers(&c, &["C"]),
        vec![("init()".to_string(), Some(ImplicitCtorKind::Default))]
    );
}

#[test]
fn class_with_designated_init_gets_no_implicit_init() {
    let c = checked!("
        class C {
            var x: Int
            init(x: Int) {}
        }
    ");

    assert!(c.is_valid());
    assert_eq!(initializers(&c, &["C"]), vec![("init(x:)".to_string(), None)]);
}

#[test]
fn struct_gets_memberwise_and_default_init() {
    let c = checked!("
        struct S {
            var x: Int = 0
            var y: Int = 1
        }
        struct T {
            var x: Int
        }
    ");

    assert!(c.is_valid());
    assert_eq!(
        initializers(&c, &["S"]),
        vec![
            ("init(x:y:)".to_string(), Some(ImplicitCtorKind::Memberwise)),
            ("init()".to_string(), Some(ImplicitCtorKind::Default)),
        ]
    );
    assert_eq!(
        initializers(&c, &["T"]),
        vec![("init(x:)".to_string(), Some(ImplicitCtorKind::Memberwise))]
    );
}

#[test]
fn struct_with_designated_init_gets_no_memberwise_init() {
    let c = checked!("
        struct S {
            var x: Int
            init() {}
        }
    ");

    assert_eq!(initializers(&c, &["S"]), vec![("init()".to_string(), None)]);
}

#[test]
fn enum_with_raw_type_and_no_cases() {
    shot_diagnostics!(r"
        enum E: Int {}
    ", @r"
    enum E: Int {}
    ---
    error[1] `Int`: an enum with no cases cannot declare a raw type
    ");
}

#[test]
fn classes_get_an_implicit_destructor() {
    let c = checked!("class C {}");

    let deinit = c.decl(&["C", "deinit"]);
    assert!(c.ast().decl(deinit).implicit);
    assert!(matches!(c.ast().decl(deinit).kind, DeclKind::Destructor(_)));
}

#[test]
fn diagnostics_keep_emission_order() {
    let c = checked!("
        class C: Missing {}
        enum E: Int {}
    ");

    assert_eq!(
        c.kinds(),
        vec![DiagnosticKind::UndeclaredType, DiagnosticKind::EmptyEnumRawType]
    );
}

#[test]
fn library_files_are_checked() {
    let c = Fixture::new("class C {}")
        .file("lib.ks", "protocol P {}\nstruct S: P, P {}")
        .check();

    insta::assert_snapshot!(c.diagnostics(), @r#"
    error[lib.ks:2] `P`: duplicate inheritance from 'P'
      fix[lib.ks:2] "": remove duplicate
    "#);
}

#[test]
fn summary_of_a_small_module() {
    let c = checked!("
        protocol P {
            func f()
        }
        struct S: P {
            func f() {}
        }
    ");

    assert!(c.is_valid());
    let summary = c.module.summary();
    let s = summary.find(&["S"]).expect("summarized");
    assert_eq!(s.conformances.len(), 1);
    assert_eq!(s.conformances[0].protocol, "P");
    assert!(!s.conformances[0].invalid);
    assert_eq!(
        s.conformances[0].witnesses,
        vec![("f()".to_string(), "S.f()".to_string())]
    );
}

#[test]
fn summary_serializes_without_empty_fields() {
    let c = checked!("
        struct S {
            var x: Int
        }
    ");

    let json = serde_json::to_value(c.module.summary()).expect("serializable");
    let s = &json["files"][0]["decls"][0];
    assert_eq!(s["kind"], "struct");
    assert_eq!(s["name"], "S");
    assert_eq!(s["access"], "Internal");
    assert!(s.get("implicit").is_none());
    assert!(s.get("conformances").is_none());

    let members = s["members"].as_array().expect("members");
    let init = members
        .iter()
        .find(|m| m["name"] == "init(x:)")
        .expect("memberwise initializer");
    assert_eq!(init["synthesized"], "Memberwise");
    assert_eq!(init["implicit"], true);
}

#[test]
fn errors_fail_the_module() {
    let c = checked!("
        struct S {
            override func f() {}
        }
    ");

    let err = c.module.into_result().expect_err("module has errors");
    assert!(matches!(err, crate::Error::SemaFailed(_)));
    assert!(err.to_string().starts_with("declaration checking failed with"));
}

#[test]
fn clean_module_passes_through() {
    let c = checked!("
        struct S {}
    ");

    assert!(c.module.into_result().is_ok());
}

#[test]
fn rendering_an_unknown_file() {
    let c = checked!("
        struct S {}
    ");

    let missing = crate::ast::FileId(u32::MAX);
    assert!(matches!(
        c.module.render(missing),
        Err(crate::Error::UnknownFile(f)) if f == missing
    ));
}

const MIXED_MODULE: &str = "
protocol P { func p() }
class B {
    func f() {}
    var x: Int = 0
}
class D: B, P {
    override func f() {}
    override var x: Int { didSet {} }
    func p() {}
}
struct S {
    var a: Int
    lazy var b: Int = 1
}
enum E: Int { case a, b = 5, c }
extension S { func g() -> Int {} }
";

/// An elaborator over `src` with extensions bound but nothing checked yet.
fn elaborator(src: &str) -> (Elaborator, FileId) {
    let fixture = Fixture::new(src);
    let main = fixture.main();
    let mut ast = fixture.into_ast();
    prelude::install(&mut ast);
    let known = KnownDecls::resolve(&ast);
    let mut e = Elaborator::new(
        ast,
        SemaConfig::default(),
        known,
        Box::new(ArenaLookup::new()),
        Box::new(LiteralChecker::new()),
        Box::new(DefaultArchetypes),
    );
    e.bind_extensions();
    (e, main)
}

#[derive(Debug, Clone, PartialEq)]
struct Slots {
    ty: Option<TypeId>,
    interface_ty: Option<TypeId>,
    overridden: Option<DeclId>,
    protocols: Option<Vec<DeclId>>,
    invalid: bool,
}

fn slots(e: &Elaborator, d: DeclId) -> Slots {
    let decl = e.ast.decl(d);
    Slots {
        ty: decl.ty,
        interface_ty: decl.interface_ty,
        overridden: decl.overridden,
        protocols: decl.protocols().map(|p| p.iter().copied().collect()),
        invalid: decl.invalid,
    }
}

fn all_slots(e: &Elaborator) -> Vec<(DeclId, Slots)> {
    e.ast.decls().map(|(d, _)| (d, slots(e, d))).collect()
}

#[test]
fn validating_again_changes_nothing() {
    let (mut e, _) = elaborator(MIXED_MODULE);
    e.check_files();
    let before = all_slots(&e);
    let diagnostics = e.diag.len();

    let validated: Vec<DeclId> = e
        .ast
        .decls()
        .filter(|(_, d)| d.state.validation.is_checked())
        .map(|(d, _)| d)
        .collect();
    assert!(!validated.is_empty());
    for d in validated {
        e.validate_decl(d);
    }
    e.check_files();

    assert_eq!(all_slots(&e), before);
    assert_eq!(e.diag.len(), diagnostics);
}

#[test]
fn on_demand_validation_agrees_with_the_sweeps() {
    let (mut e, main) = elaborator(MIXED_MODULE);
    let mut written: Vec<DeclId> = e
        .ast
        .decls()
        .filter(|(_, d)| d.file == main)
        .map(|(d, _)| d)
        .collect();
    written.reverse();
    for &d in &written {
        e.validate_decl(d);
    }
    let early: Vec<(DeclId, Slots)> = written.iter().map(|&d| (d, slots(&e, d))).collect();

    e.check_files();

    let settled = |ty: Option<TypeId>| ty.filter(|&t| t != TYPE_ERROR);
    for (d, first) in early {
        let last = slots(&e, d);
        let name = e.ast.name_of(d);
        if let Some(ty) = settled(first.ty) {
            assert_eq!(last.ty, Some(ty), "type of {name}");
        }
        if let Some(ty) = settled(first.interface_ty) {
            assert_eq!(last.interface_ty, Some(ty), "interface type of {name}");
        }
        if let Some(base) = first.overridden {
            assert_eq!(last.overridden, Some(base), "override of {name}");
        }
    }
}

#[test]
fn removing_an_added_protocol_restores_the_inheritance() {
    let plain = checked!("
        protocol P {}
        protocol Q {}
        class B {}
        class C: B, P {}
    ");
    let extended = checked!("
        protocol P {}
        protocol Q {}
        class B {}
        class C: B, P, Q {}
    ");
    let reordered = checked!("
        protocol P {}
        protocol Q {}
        class B {}
        class C: B, Q, P {}
    ");

    let plain = plain.module.summary();
    let extended = extended.module.summary();
    let reordered = reordered.module.summary();
    let plain = plain.find(&["C"]).expect("summarized");
    let extended = extended.find(&["C"]).expect("summarized");
    let reordered = reordered.find(&["C"]).expect("summarized");

    assert_eq!(plain.superclass.as_deref(), Some("B"));
    assert_eq!(extended.superclass, plain.superclass);
    assert_eq!(plain.protocols, vec!["P".to_string()]);
    assert_eq!(extended.protocols, vec!["P".to_string(), "Q".to_string()]);

    let mut sorted = reordered.protocols.clone();
    sorted.sort();
    assert_eq!(sorted, extended.protocols);
    assert_eq!(reordered.superclass, plain.superclass);
}

#[test]
fn explicit_and_inferred_overrides_record_the_same_link() {
    let explicit = checked!("
        class B { func f() {} }
        class D: B { override func f() {} }
    ");
    let inferred = checked!("
        class B { func f() {} }
        class D: B { func f() {} }
    ");

    for c in [&explicit, &inferred] {
        let base = c.decl(&["B", "f()"]);
        assert_eq!(c.ast().decl(c.decl(&["D", "f()"])).overridden, Some(base));
    }
    let explicit = explicit.module.summary();
    let inferred = inferred.module.summary();
    assert_eq!(
        explicit.find(&["D", "f()"]).and_then(|f| f.overrides.clone()),
        inferred.find(&["D", "f()"]).and_then(|f| f.overrides.clone()),
    );
}
