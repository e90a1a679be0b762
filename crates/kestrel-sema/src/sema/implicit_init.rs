//! Implicit initializers and destructors.
//!
//! Structs get a memberwise initializer and possibly a default one. Classes
//! inherit the designated initializers of their superclass through
//! chaining overrides when they declare none of their own, and get stub
//! overrides for the ones they do not override otherwise.

use indexmap::IndexSet;
use kestrel_core::{DeclName, Symbol};
use rowan::{TextRange, TextSize};
use tracing::{debug, instrument};

use super::Elaborator;
use crate::ast::{
    AccessSemantics, Accessibility, Arg, AttrKind, Body, ConstructorData, CtorKind, Decl,
    DeclContext, DeclId, DeclKind, DefaultArgKind, DestructorData, Expr, ExprKind,
    Failability, ImplicitCtorKind, ParamData, Span, Stmt, TypeLoc,
};
use crate::diagnostics::DiagnosticKind;
use crate::types::{TypeId, TypeShape};

/// What the members of a nominal say about implicit initializers.
#[derive(Debug, Default)]
struct MemberSurvey {
    found_designated: bool,
    found_instance_var: bool,
    found_uninitialized: bool,
    /// Canonical parameter types of the declared initializers.
    param_types: IndexSet<TypeId>,
}

/// A synthesized initializer parameter.
struct NewParam {
    label: Option<Symbol>,
    name: Symbol,
    ty: TypeId,
    variadic: bool,
    default_arg: DefaultArgKind,
}

impl Elaborator {
    /// Add the implicit initializers of struct or class `n` once.
    #[instrument(level = "debug", skip(self), fields(nominal = %self.name(n)))]
    pub(super) fn add_implicit_constructors(&mut self, n: DeclId) {
        if !matches!(self.ast.decl(n).kind, DeclKind::Struct(_) | DeclKind::Class(_)) {
            return;
        }
        let Some(data) = self.ast.decl(n).as_nominal() else {
            return;
        };
        if data.added_implicit_inits || self.is_invalid(n) {
            return;
        }
        if let Some(data) = self.ast.decl_mut(n).as_nominal_mut() {
            data.added_implicit_inits = true;
        }

        let survey = self.survey_members(n);
        if survey.found_designated {
            return;
        }

        if matches!(self.ast.decl(n).kind, DeclKind::Struct(_)) {
            self.create_implicit_constructor(n, ImplicitCtorKind::Memberwise);
            if survey.found_instance_var && !survey.found_uninitialized {
                self.create_implicit_constructor(n, ImplicitCtorKind::Default);
            }
            return;
        }

        let superclass = self.ast.decl(n).as_nominal().and_then(|d| d.superclass);
        let specialized = superclass.is_some_and(|s| {
            matches!(self.types.get(s), TypeShape::Nominal { args, .. } if !args.is_empty())
        });
        let generic = self.ast.is_generic_context(DeclContext::Nominal(n));
        if let Some(superclass) = superclass
            && !generic
            && !specialized
        {
            if survey.found_uninitialized {
                self.diagnose_class_without_init(n);
                return;
            }
            let Some(super_decl) = self.types.class_decl(superclass) else {
                return;
            };
            let mut param_types = survey.param_types;
            for base in self.lookup.lookup_constructors(&self.ast, super_decl) {
                if self.ast.decl(base).attrs.has(&AttrKind::Unavailable) {
                    continue;
                }
                self.validate_decl(base);
                let designated = self
                    .ast
                    .decl(base)
                    .as_ctor()
                    .is_some_and(|c| c.kind == CtorKind::Designated);
                if !designated || self.is_invalid(base) {
                    continue;
                }
                let param_ty = self.initializer_param_type(base);
                if !param_types.insert(param_ty) {
                    continue;
                }
                self.create_designated_override(n, base, ImplicitCtorKind::Chaining);
            }
            return;
        }

        if survey.found_uninitialized {
            self.diagnose_class_without_init(n);
            return;
        }
        self.create_implicit_constructor(n, ImplicitCtorKind::Default);
    }

    fn survey_members(&mut self, n: DeclId) -> MemberSurvey {
        let mut survey = MemberSurvey::default();
        for m in self.ast.decl(n).members().to_vec() {
            match &self.ast.decl(m).kind {
                DeclKind::Constructor(c) => {
                    let designated = c.kind == CtorKind::Designated;
                    self.validate_decl(m);
                    survey.found_designated |= designated;
                    if !self.is_invalid(m) {
                        let ty = self.initializer_param_type(m);
                        survey.param_types.insert(ty);
                    }
                }
                DeclKind::Var(v) => {
                    if v.storage.has_storage() && !v.is_static {
                        survey.found_instance_var = true;
                    }
                }
                DeclKind::PatternBinding(b) => {
                    let is_static = b.is_static;
                    let vars = b.pattern.bound_vars();
                    let has_storage = vars
                        .iter()
                        .any(|&v| self.ast.decl(v).storage().is_some_and(|s| s.has_storage()));
                    if has_storage && !is_static && !self.binding_default_initializable(m) {
                        survey.found_uninitialized = true;
                    }
                }
                _ => {}
            }
        }
        survey
    }

    /// Canonical parameter tuple of initializer `ctor`.
    fn initializer_param_type(&mut self, ctor: DeclId) -> TypeId {
        let ty = self.interface_type_of(ctor);
        let input = self
            .types
            .function_result(ty)
            .and_then(|method| self.types.function_parts(method))
            .map(|(input, _, _)| input)
            .unwrap_or(ty);
        self.types.canonical(input)
    }

    fn create_implicit_constructor(&mut self, n: DeclId, kind: ImplicitCtorKind) -> DeclId {
        let mut access = self.accessibility_of(n).min(Accessibility::Internal);
        let mut params = Vec::new();
        let mut stores = Vec::new();
        if kind == ImplicitCtorKind::Memberwise {
            for var in self.stored_properties(n) {
                self.validate_decl(var);
                access = access.min(self.accessibility_of(var));
                let interface = self.interface_type_of(var);
                let mut ty = self.types.reference_storage_referent(interface);
                if self.ast.decl(var).attrs.has(&AttrKind::Lazy) {
                    ty = self.types.optional(ty);
                }
                let name = self.ast.decl(var).name.base();
                params.push(NewParam {
                    label: Some(name),
                    name,
                    ty,
                    variadic: false,
                    default_arg: DefaultArgKind::None,
                });
                stores.push(var);
            }
        }

        let ctor = self.alloc_constructor(n, &params, Failability::None, kind);
        self.ast.decl_mut(ctor).access = Some(access);
        if self.ast.decl(n).as_nominal().is_some_and(|d| d.superclass.is_some()) {
            self.ast.decl_mut(ctor).attrs.add_implicit(AttrKind::Override);
        }

        let ctor_params = self.ast.decl(ctor).params().to_vec();
        let body = stores
            .into_iter()
            .zip(ctor_params)
            .map(|(var, param)| {
                let dest = Expr::member(
                    Expr::implicit(ExprKind::SelfRef),
                    var,
                    AccessSemantics::DirectToStorage,
                );
                Stmt::Expr(Expr::assign(dest, Expr::decl_ref(param, AccessSemantics::Ordinary)))
            })
            .collect();
        self.ast.decl_mut(ctor).set_body(Body::implicit(body));
        self.validate_decl(ctor);
        debug!(ctor = %self.name(ctor), ?kind, "implicit initializer");
        ctor
    }

    /// Stored instance properties written in source, in order.
    pub(super) fn stored_properties(&self, n: DeclId) -> Vec<DeclId> {
        self.ast
            .decl(n)
            .members()
            .iter()
            .copied()
            .filter(|&m| {
                let decl = self.ast.decl(m);
                !decl.implicit
                    && decl.as_var().is_some_and(|v| {
                        !v.is_static
                            && (v.storage.has_storage() || v.lazy_storage.is_some())
                    })
            })
            .collect()
    }

    /// Allocate an implicit initializer of `n` with `params`, appended to
    /// its members.
    fn alloc_constructor(
        &mut self,
        n: DeclId,
        params: &[NewParam],
        failability: Failability,
        kind: ImplicitCtorKind,
    ) -> DeclId {
        let loc = self.span(n);
        let init = self.intern("init");
        let name = DeclName::compound(init, params.iter().map(|p| p.label).collect());
        let data = ConstructorData {
            failability,
            synthesized: Some(kind),
            ..ConstructorData::default()
        };
        let ctor = self.ast.alloc(Decl::implicit(
            DeclKind::Constructor(data),
            name,
            DeclContext::Nominal(n),
            loc,
        ));
        let ids = params
            .iter()
            .map(|p| {
                let data = ParamData {
                    api_label: p.label,
                    annotation: TypeLoc::without_loc(p.ty),
                    variadic: p.variadic,
                    inout: false,
                    default_arg: p.default_arg,
                    names_range: None,
                };
                self.ast.alloc(Decl::implicit(
                    DeclKind::Param(data),
                    DeclName::simple(p.name),
                    DeclContext::Function(ctor),
                    loc,
                ))
            })
            .collect();
        if let Some(c) = self.ast.decl_mut(ctor).as_ctor_mut() {
            c.params = ids;
        }
        self.ast.insert_member_after(None, ctor);
        ctor
    }

    /// Override of superclass initializer `base` in class `n`: a chaining
    /// one that forwards to `super.init`, or a stub that traps.
    pub(super) fn create_designated_override(
        &mut self,
        n: DeclId,
        base: DeclId,
        kind: ImplicitCtorKind,
    ) -> Option<DeclId> {
        let base_params = self.ast.decl(base).params().to_vec();
        if self.ast.decl(base).generic_params().is_some() {
            return None;
        }
        if kind == ImplicitCtorKind::Chaining
            && base_params
                .iter()
                .any(|&p| self.ast.decl(p).as_param().is_some_and(|p| p.variadic))
        {
            let span = self.span(n);
            let base_span = self.span(base);
            self.report(DiagnosticKind::UnsupportedSynthesizeInitVariadic, span)
                .related_to("variadic initializer is declared here", base_span)
                .emit();
            return None;
        }

        let mut params = Vec::with_capacity(base_params.len());
        for &p in &base_params {
            let ty = self.interface_type_of(p);
            let decl = self.ast.decl(p);
            let Some(data) = decl.as_param() else {
                continue;
            };
            params.push(NewParam {
                label: data.api_label,
                name: decl.name.base(),
                ty,
                variadic: data.variadic,
                default_arg: match data.default_arg {
                    DefaultArgKind::None => DefaultArgKind::None,
                    _ => DefaultArgKind::Inherited,
                },
            });
        }
        let failability = self
            .ast
            .decl(base)
            .as_ctor()
            .map_or(Failability::None, |c| c.failability);

        let ctor = self.alloc_constructor(n, &params, failability, kind);
        let full_name = self.ast.decl(base).name.clone();
        self.ast.decl_mut(ctor).name = full_name;
        let access = self.accessibility_of(n).min(self.accessibility_of(base));
        self.ast.decl_mut(ctor).access = Some(access);
        if let Some(objc) = self.ast.decl(base).attrs.objc().map(|a| a.kind.clone()) {
            self.ast.decl_mut(ctor).attrs.add_implicit(objc);
        }
        self.ast.decl_mut(ctor).attrs.add_implicit(AttrKind::Override);
        self.validate_decl(ctor);
        self.check_overrides(ctor);

        let body = match kind {
            ImplicitCtorKind::Stub => self.stub_body(n),
            _ => {
                let args = self
                    .ast
                    .decl(ctor)
                    .params()
                    .iter()
                    .map(|&p| {
                        let label = self.ast.decl(p).as_param().and_then(|p| p.api_label);
                        Arg::new(label, Expr::decl_ref(p, AccessSemantics::Ordinary))
                    })
                    .collect();
                let callee = Expr::member(
                    Expr::implicit(ExprKind::SuperRef),
                    base,
                    AccessSemantics::Ordinary,
                );
                Body::implicit(vec![Stmt::Expr(Expr::call(callee, args))])
            }
        };
        self.ast.decl_mut(ctor).set_body(body);
        debug!(class = %self.name(n), base = %self.name(base), ?kind, "initializer override");
        Some(ctor)
    }

    /// `_unimplemented_initializer("<Module>.<Class>")`.
    fn stub_body(&mut self, n: DeclId) -> Body {
        let Some(trap) = self.known.unimplemented_initializer else {
            let span = self.span(n);
            self.report(DiagnosticKind::MissingUnimplementedInitRuntime, span)
                .emit();
            return Body::implicit(Vec::new());
        };
        self.validate_decl(trap);
        let label = self
            .ast
            .decl(trap)
            .params()
            .first()
            .and_then(|&p| self.ast.decl(p).as_param())
            .and_then(|p| p.api_label);
        let class_name = format!("{}.{}", self.config.module_name, self.name(n));
        let arg = Expr::implicit(ExprKind::StringLiteral(class_name));
        let call = Expr::call(Expr::decl_ref(trap, AccessSemantics::Ordinary), vec![Arg::new(label, arg)]);
        Body::implicit(vec![Stmt::Expr(call)])
    }

    /// `ClassWithoutInit` with a note per binding that lacks a value.
    fn diagnose_class_without_init(&mut self, n: DeclId) {
        let mut notes = Vec::new();
        for m in self.ast.decl(n).members().to_vec() {
            let Some(b) = self.ast.decl(m).as_binding() else {
                continue;
            };
            let vars = b.pattern.bound_vars();
            let after = self.span_of(m, b.pattern.range).end();
            let has_storage = vars
                .iter()
                .any(|&v| self.ast.decl(v).storage().is_some_and(|s| s.has_storage()));
            if b.is_static || !has_storage || self.binding_default_initializable(m) || self.is_invalid(m) {
                continue;
            }
            let names: Vec<String> = vars.iter().map(|&v| format!("'{}'", self.name(v))).collect();
            let message = match names.as_slice() {
                [] => continue,
                [one] => format!("stored property {one} without initial value prevents synthesized initializers"),
                [a, b] => format!("stored properties {a} and {b} without initial values prevent synthesized initializers"),
                [a, b, c] => format!("stored properties {a}, {b}, and {c} without initial values prevent synthesized initializers"),
                [a, b, c, ..] => format!("stored properties {a}, {b}, {c}, and others without initial values prevent synthesized initializers"),
            };
            let span = if vars.len() == 1 { self.span(vars[0]) } else { self.ast.decl(m).full_span() };
            self.validate_decl(m);
            let suggestion = self
                .ast
                .decl(m)
                .as_binding()
                .and_then(|b| b.pattern.annotation())
                .and_then(|loc| loc.ty)
                .and_then(|ty| self.default_value_text(ty));
            notes.push((message, span, suggestion, after));
        }

        let span = self.span(n);
        let shown = self.name(n);
        let mut diag = self
            .report(DiagnosticKind::ClassWithoutInit, span)
            .message(shown);
        for (message, note_span, suggestion, after) in notes {
            diag = diag.related_to(message, note_span);
            if let Some(text) = suggestion {
                diag = diag.fix(format!("add an initial value '{text}'"), after, format!(" = {text}"));
            }
        }
        diag.emit();
    }

    /// Source text of a value of `ty` usable as an initial value.
    fn default_value_text(&mut self, ty: TypeId) -> Option<String> {
        let ty = self.types.desugar(ty);
        if self.types.optional_object(ty).is_some() {
            return Some("nil".to_string());
        }
        if let Some(elements) = self.types.tuple_elements(ty) {
            let elements: Vec<TypeId> = elements.iter().map(|e| e.ty).collect();
            let mut parts = Vec::with_capacity(elements.len());
            for e in elements {
                parts.push(self.default_value_text(e)?);
            }
            return Some(format!("({})", parts.join(", ")));
        }
        let candidates = [
            (self.known.boolean_literal, "false"),
            (self.known.integer_literal, "0"),
            (self.known.float_literal, "0.0"),
            (self.known.string_literal, "\"\""),
        ];
        for (protocol, text) in candidates {
            if let Some(protocol) = protocol
                && self.type_conforms_to(ty, protocol)
            {
                return Some(text.to_string());
            }
        }
        None
    }

    /// Give class `n` an empty destructor unless it declares one.
    pub(super) fn add_implicit_destructor(&mut self, n: DeclId) {
        if !self.ast.decl(n).is_class() || self.is_invalid(n) {
            return;
        }
        let declared = self
            .ast
            .decl(n)
            .members()
            .iter()
            .any(|&m| matches!(self.ast.decl(m).kind, DeclKind::Destructor(_)));
        let has = self.ast.decl(n).as_nominal().is_some_and(|d| d.has_destructor);
        if has || declared {
            if let Some(data) = self.ast.decl_mut(n).as_nominal_mut() {
                data.has_destructor = true;
            }
            return;
        }
        let loc = self.span(n);
        let name = DeclName::simple(self.intern("deinit"));
        let data = DestructorData {
            body: Some(Body::implicit(Vec::new())),
        };
        let dtor = self.ast.alloc(Decl::implicit(
            DeclKind::Destructor(data),
            name,
            DeclContext::Nominal(n),
            loc,
        ));
        self.ast.insert_member_after(None, dtor);
        if let Some(data) = self.ast.decl_mut(n).as_nominal_mut() {
            data.has_destructor = true;
        }
        self.validate_decl(dtor);
    }

    /// Second-sweep consistency between the initializers of class `n` and
    /// those of its superclass.
    pub(super) fn check_class_initializers(&mut self, n: DeclId) {
        self.check_required_access(n);
        let Some(superclass) = self.ast.decl(n).as_nominal().and_then(|d| d.superclass) else {
            return;
        };
        let Some(super_decl) = self.types.class_decl(superclass) else {
            return;
        };
        let overridden: IndexSet<DeclId> = self
            .ast
            .decl(n)
            .members()
            .iter()
            .filter(|&&m| matches!(self.ast.decl(m).kind, DeclKind::Constructor(_)))
            .filter_map(|&m| self.ast.decl(m).overridden)
            .collect();

        for base in self.lookup.lookup_constructors(&self.ast, super_decl) {
            self.validate_decl(base);
            let decl = self.ast.decl(base);
            let required = decl.attrs.has(&AttrKind::Required);
            let designated = decl.as_ctor().is_some_and(|c| c.kind == CtorKind::Designated);
            if (!required && !designated) || decl.invalid || overridden.contains(&base) {
                continue;
            }
            if required {
                self.diagnose_missing_required(n, base);
                continue;
            }
            if decl.parent.is_extension_context() {
                continue;
            }
            self.create_designated_override(n, base, ImplicitCtorKind::Stub);
        }
    }

    /// `RequiredInitializerMissing`, offering the initializer text.
    fn diagnose_missing_required(&mut self, n: DeclId, base: DeclId) {
        let explicit_ctors: Vec<DeclId> = self
            .ast
            .decl(n)
            .members()
            .iter()
            .copied()
            .filter(|&m| {
                let decl = self.ast.decl(m);
                matches!(decl.kind, DeclKind::Constructor(_)) && !decl.implicit
            })
            .collect();
        let insertion = match explicit_ctors.last() {
            Some(&last) => self.ast.decl(last).full_span().end(),
            None => {
                let brace = self
                    .ast
                    .decl(n)
                    .as_nominal()
                    .map(|d| d.brace_range)
                    .unwrap_or_default();
                self.span_of(n, TextRange::empty(brace.start() + TextSize::from(1)))
            }
        };

        let signature = self.initializer_signature(base);
        let text = format!(
            "\n    required {signature} {{\n        fatalError(\"{} has not been implemented\")\n    }}\n",
            self.name(base)
        );
        let message = format!(
            "'required' initializer '{}' must be provided by subclass of '{}'",
            self.name(base),
            self.name(self.ast.nominal_of(self.ast.decl(base).parent).unwrap_or(base))
        );
        let span = self.span(n);
        let base_span = self.span(base);
        self.report(DiagnosticKind::RequiredInitializerMissing, span)
            .message(message)
            .fix("add the initializer", insertion, text)
            .related_to("'required' initializer is declared in superclass here", base_span)
            .emit();
    }

    /// `required init(x: Int)` style rendering of an initializer signature.
    fn initializer_signature(&mut self, ctor: DeclId) -> String {
        let mut out = String::from("init");
        match self.ast.decl(ctor).as_ctor().map(|c| c.failability) {
            Some(Failability::Optional) => out.push('?'),
            Some(Failability::ImplicitlyUnwrapped) => out.push('!'),
            _ => {}
        }
        let mut params = Vec::new();
        for p in self.ast.decl(ctor).params().to_vec() {
            let ty = self.interface_type_of(p);
            let shown = self.display(ty);
            let name = self.ast.base_name_of(p).to_string();
            let label = self
                .ast
                .decl(p)
                .as_param()
                .and_then(|d| d.api_label)
                .map(|l| self.ast.resolve(l).to_string());
            let head = match label {
                Some(label) if label == name => name,
                Some(label) => format!("{label} {name}"),
                None => format!("_ {name}"),
            };
            params.push(format!("{head}: {shown}"));
        }
        out.push('(');
        out.push_str(&params.join(", "));
        out.push(')');
        out
    }

    /// `required` initializers must be as accessible as their class.
    fn check_required_access(&mut self, n: DeclId) {
        let class_access = self.accessibility_of(n);
        for m in self.ast.decl(n).members().to_vec() {
            let decl = self.ast.decl(m);
            if !matches!(decl.kind, DeclKind::Constructor(_))
                || decl.implicit
                || !decl.attrs.has(&AttrKind::Required)
            {
                continue;
            }
            let access = self.accessibility_of(m);
            if access >= class_access {
                continue;
            }
            let message = format!(
                "'required' initializer must be as accessible as its enclosing type ({class_access})"
            );
            let existing = self.ast.decl(m).attrs.range_of(&AttrKind::Accessibility(access));
            let (fix_span, replacement) = match existing {
                Some(range) => (self.span_of(m, range), class_access.to_string()),
                None => (self.ast.decl(m).full_span().start(), format!("{class_access} ")),
            };
            let span = self.span(m);
            self.report(DiagnosticKind::RequiredInitializerNotAccessible, span)
                .message(message)
                .fix(format!("make it {class_access}"), fix_span, replacement)
                .emit();
        }
    }

    /// Initializer kind rules that depend on the declaration context.
    pub(super) fn check_initializer_kind(&mut self, ctor: DeclId) {
        let decl = self.ast.decl(ctor);
        let Some(data) = decl.as_ctor() else {
            return;
        };
        if decl.implicit {
            return;
        }
        let dc = decl.parent;
        let kind = data.kind;
        let in_class = self.ast.is_class_context(dc);
        let span = self.span(ctor);

        if kind == CtorKind::Convenience && !in_class {
            let attr = self.ast.decl(ctor).attrs.range_of(&AttrKind::Convenience);
            let mut diag = self.report(DiagnosticKind::NonClassConvenienceInit, span);
            if let Some(range) = attr {
                diag = diag.fix("remove 'convenience'", Span::new(span.file, range), "");
            }
            diag.emit();
            if let Some(c) = self.ast.decl_mut(ctor).as_ctor_mut() {
                c.kind = CtorKind::Designated;
            }
            self.ast.decl_mut(ctor).attrs.invalidate(&AttrKind::Convenience);
        } else if kind == CtorKind::Designated && in_class && dc.is_extension_context() {
            let start = self.ast.decl(ctor).full_span().start();
            self.report(DiagnosticKind::DesignatedInitInExtension, span)
                .fix("insert 'convenience'", start, "convenience ")
                .emit();
            if let Some(c) = self.ast.decl_mut(ctor).as_ctor_mut() {
                c.kind = CtorKind::Convenience;
            }
        }
    }
}
