//! Accessor prototypes and synthesized accessor bodies.
//!
//! Stored properties of classes get trivial accessors so they can be
//! overridden; observing properties get a getter and a setter that call
//! `willSet`/`didSet` around the store; settable storage in a polymorphic
//! context gets `materializeForSet`.

use kestrel_core::DeclName;
use tracing::{debug, trace};

use super::Elaborator;
use crate::ast::{
    AccessSemantics, AccessorInfo, AccessorKind, Arg, AttrKind, Body, Decl, DeclContext, DeclId,
    DeclKind, Expr, ExprKind, FuncData, ParamData, Stmt, StorageKind, TypeLoc, VarData,
    accessor_name,
};
use crate::diagnostics::DiagnosticKind;
use crate::state::Entry;
use crate::types::{TYPE_ERROR, TYPE_INT1, TYPE_RAW_POINTER, TYPE_UNIT, TupleElement, TypeId};

impl Elaborator {
    /// Give accessor `d` its implicit parameter types, result and
    /// mutability before its signature is validated.
    pub(super) fn accessor_prototype(&mut self, d: DeclId) {
        let Some(info) = self.ast.decl(d).accessor() else {
            return;
        };
        let value = self.storage_value_type(info.storage);
        let params = self.ast.decl(d).params().to_vec();
        match info.kind {
            AccessorKind::Setter | AccessorKind::WillSet | AccessorKind::DidSet => {
                if let Some(&p) = params.first() {
                    self.preset_param(p, value);
                }
            }
            AccessorKind::MaterializeForSet => {
                if let Some(&p) = params.first() {
                    self.preset_param(p, TYPE_RAW_POINTER);
                }
            }
            _ => {}
        }

        let result = match info.kind {
            AccessorKind::Getter => value,
            AccessorKind::MaterializeForSet => self.types.tuple(vec![
                TupleElement::new(None, TYPE_RAW_POINTER),
                TupleElement::new(None, TYPE_INT1),
            ]),
            AccessorKind::Addressor | AccessorKind::MutableAddressor => TYPE_RAW_POINTER,
            AccessorKind::Setter | AccessorKind::WillSet | AccessorKind::DidSet => TYPE_UNIT,
        };

        let dc = self.ast.decl(d).parent;
        let value_context = self.ast.is_value_type_context(dc) || self.ast.is_protocol_context(dc);
        let nonmutating = self.ast.decl(d).attrs.has(&AttrKind::NonMutating)
            || self.ast.decl(info.storage).attrs.has(&AttrKind::NonMutating);
        let mutates = matches!(
            info.kind,
            AccessorKind::Setter
                | AccessorKind::MaterializeForSet
                | AccessorKind::WillSet
                | AccessorKind::DidSet
                | AccessorKind::MutableAddressor
        );
        let is_static = self.ast.decl(info.storage).is_static();

        if let Some(f) = self.ast.decl_mut(d).as_func_mut() {
            if f.result.repr.is_none() && f.result.ty.is_none() {
                f.result = TypeLoc::without_loc(result);
            }
            f.is_static = is_static;
            if mutates && value_context && !nonmutating && !is_static {
                f.is_mutating = true;
            }
        }
    }

    /// Interface type of the value stored in `storage`.
    pub(super) fn storage_value_type(&mut self, storage: DeclId) -> TypeId {
        let ty = self.interface_type_of(storage);
        match self.ast.decl(storage).kind {
            DeclKind::Subscript(_) => self.types.function_result(ty).unwrap_or(TYPE_ERROR),
            _ => self.types.reference_storage_referent(ty),
        }
    }

    fn preset_param(&mut self, p: DeclId, interface: TypeId) {
        let unannotated = self
            .ast
            .decl(p)
            .as_param()
            .is_some_and(|param| param.annotation.repr.is_none() && param.annotation.ty.is_none());
        if !unannotated || self.ast.decl(p).interface_ty.is_some() {
            return;
        }
        let contextual = self.map_to_archetypes(interface);
        let decl = self.ast.decl_mut(p);
        decl.interface_ty = Some(interface);
        decl.ty = Some(contextual);
    }

    /// First-sweep storage work: conversions, diagnostics and accessor
    /// synthesis for a variable or subscript.
    pub(super) fn check_storage(&mut self, s: DeclId) {
        if self.ast.decl_mut(s).state.accessors.enter() != Entry::Fresh {
            return;
        }
        self.validate_decl(s);
        self.check_overrides(s);
        self.convert_storage(s);
        if !self.is_invalid(s) {
            self.synthesize_accessors(s);
            self.link_accessor_overrides(s);
        }
        self.ast.decl_mut(s).state.accessors.finish();
    }

    fn storage_kind(&self, s: DeclId) -> StorageKind {
        self.ast.decl(s).storage().map_or(StorageKind::Stored, |st| st.kind)
    }

    fn set_storage_kind(&mut self, s: DeclId, kind: StorageKind) {
        if let Some(storage) = self.ast.decl_mut(s).storage_mut() {
            storage.kind = kind;
        }
    }

    /// Storage kinds the declaration context or attributes force.
    fn convert_storage(&mut self, s: DeclId) {
        let decl = self.ast.decl(s);
        let Some(var) = decl.as_var() else {
            return;
        };
        let dc = decl.parent;
        let is_let = var.is_let;
        let is_static = var.is_static;
        let stored = var.storage.kind == StorageKind::Stored;
        let managed = decl.attrs.has(&AttrKind::Managed);
        let implicit = decl.implicit;

        if self.ast.is_protocol_context(dc) {
            if stored {
                let kind = if is_let {
                    DiagnosticKind::ProtocolPropertyMustBeComputedVar
                } else {
                    DiagnosticKind::ProtocolPropertyMustBeComputed
                };
                let span = self.span(s);
                self.report(kind, span).emit();
                self.set_storage_kind(s, StorageKind::Computed);
                self.create_accessor(s, AccessorKind::Getter, None);
            }
            return;
        }

        if managed && stored {
            self.set_storage_kind(s, StorageKind::Computed);
            self.create_accessor(s, AccessorKind::Getter, None);
            self.create_accessor(s, AccessorKind::Setter, None);
            return;
        }

        let has_storage = self.ast.decl(s).storage().is_some_and(|st| st.has_storage());
        if has_storage && !is_static && !implicit {
            let kind = if self.ast.is_value_type_context(dc)
                && self.ast.nominal_of(dc).is_some_and(|n| {
                    matches!(self.ast.decl(n).kind, DeclKind::Enum(_))
                }) {
                Some(DiagnosticKind::EnumStoredProperty)
            } else if dc.is_extension_context() {
                Some(DiagnosticKind::ExtensionStoredProperty)
            } else {
                None
            };
            if let Some(kind) = kind {
                let span = self.span(s);
                self.report(kind, span).emit();
                self.mark_invalid(s);
                return;
            }
        }

        if is_let && self.ast.is_class_context(dc) {
            self.ast.decl_mut(s).attrs.add_implicit(AttrKind::Final);
        }
    }

    fn synthesize_accessors(&mut self, s: DeclId) {
        if self.ast.decl(s).attrs.has(&AttrKind::Lazy) && self.storage_kind(s) == StorageKind::Stored {
            self.build_lazy_storage(s);
            return;
        }
        let dc = self.ast.decl(s).parent;
        match self.storage_kind(s) {
            StorageKind::Stored => {
                let in_class = self.ast.is_class_context(dc);
                if in_class && !self.ast.decl(s).is_static() && !self.ast.decl(s).implicit {
                    self.add_trivial_accessors(s);
                }
            }
            StorageKind::Observing => self.synthesize_observing(s),
            StorageKind::Computed => {
                if self.needs_materialize(s) {
                    self.add_materialize_for_set(s);
                }
            }
            StorageKind::StoredWithTrivialAccessors | StorageKind::Addressed => {}
        }
        self.mirror_storage_attrs(s);
    }

    /// Whether storage `s` can be assigned to.
    pub(super) fn is_settable(&self, s: DeclId) -> bool {
        let decl = self.ast.decl(s);
        let Some(storage) = decl.storage() else {
            return false;
        };
        match storage.kind {
            StorageKind::Computed => storage.accessors.setter.is_some(),
            StorageKind::Addressed => storage.accessors.mutable_addressor.is_some(),
            _ => decl.as_var().is_none_or(|v| !v.is_let),
        }
    }

    /// Settable storage in a context where it can be reached polymorphically.
    pub(super) fn needs_materialize(&mut self, s: DeclId) -> bool {
        if !self.is_settable(s) {
            return false;
        }
        let dc = self.ast.decl(s).parent;
        let Some(nominal) = self.ast.nominal_of(dc) else {
            return false;
        };
        let container = self.ast.decl(nominal);
        match container.kind {
            DeclKind::Protocol(_) => !container.is_objc(),
            DeclKind::Class(_) => {
                if !container.is_final() && !self.ast.decl(s).is_final() {
                    return true;
                }
                // Final overrides still need one when the base has one.
                self.ast.decl(s).overridden.is_some_and(|base| {
                    self.ast
                        .decl(base)
                        .storage()
                        .is_some_and(|st| st.accessors.materialize_for_set.is_some())
                })
            }
            _ => false,
        }
    }

    /// Turn a stored property into one with a trivial getter and setter.
    pub(super) fn add_trivial_accessors(&mut self, s: DeclId) {
        let Some(storage) = self.ast.decl(s).storage() else {
            return;
        };
        if storage.accessors.getter.is_some() {
            return;
        }
        trace!(storage = %self.name(s), "trivial accessors");
        self.set_storage_kind(s, StorageKind::StoredWithTrivialAccessors);

        let get = self.storage_ref(s, AccessSemantics::DirectToStorage);
        self.create_accessor(
            s,
            AccessorKind::Getter,
            Some(Body::implicit(vec![Stmt::Return(Some(get))])),
        );

        if self.is_settable(s) {
            let setter = self.create_accessor(s, AccessorKind::Setter, None);
            let body = self.trivial_setter_body(s, setter, AccessSemantics::DirectToStorage);
            self.ast.decl_mut(setter).set_body(body);
        }
        if self.needs_materialize(s) {
            self.add_materialize_for_set(s);
        }
        self.mirror_storage_attrs(s);
    }

    /// Accessors a witness needs: trivial ones for plain stored storage,
    /// or a missing `materializeForSet` next to an existing setter.
    pub(super) fn add_witness_accessors(&mut self, s: DeclId) {
        let Some(storage) = self.ast.decl(s).storage() else {
            return;
        };
        match storage.kind {
            StorageKind::Stored => self.add_trivial_accessors(s),
            _ if storage.accessors.setter.is_some()
                && storage.accessors.materialize_for_set.is_none() =>
            {
                self.add_materialize_for_set(s);
            }
            _ => {}
        }
    }

    /// Add `materializeForSet` to settable storage `s` once.
    pub(super) fn add_materialize_for_set(&mut self, s: DeclId) {
        let Some(storage) = self.ast.decl(s).storage() else {
            return;
        };
        if storage.accessors.materialize_for_set.is_some() {
            return;
        }
        let setter = storage.accessors.setter;
        let in_protocol = self.ast.is_protocol_context(self.ast.decl(s).parent);
        let acc = self.create_accessor(s, AccessorKind::MaterializeForSet, None);
        if let Some(setter) = setter
            && let Some(mutating) = self.ast.decl(setter).as_func().map(|f| f.is_mutating)
            && let Some(f) = self.ast.decl_mut(acc).as_func_mut()
        {
            f.is_mutating = mutating;
        }
        if !in_protocol {
            let body = self.materialize_body(s, acc);
            self.ast.decl_mut(acc).set_body(body);
        }
        debug!(storage = %self.name(s), "materializeForSet added");
    }

    /// Storage the address of which can be handed out directly.
    fn is_directly_addressable(&self, s: DeclId) -> bool {
        let decl = self.ast.decl(s);
        if matches!(decl.kind, DeclKind::Subscript(_)) {
            return true;
        }
        let trivial = decl
            .storage()
            .is_some_and(|st| st.kind == StorageKind::StoredWithTrivialAccessors);
        let reference_storage = decl
            .ty
            .is_some_and(|ty| self.types.is_reference_storage(ty));
        trivial && !reference_storage
    }

    fn materialize_body(&mut self, s: DeclId, acc: DeclId) -> Body {
        let flag = |value: bool| Expr::implicit(ExprKind::BooleanLiteral(value));
        if self.is_directly_addressable(s) {
            let storage = self.storage_ref(s, AccessSemantics::DirectToStorage);
            let address = Expr::implicit(ExprKind::AddressOf(Box::new(storage)));
            return Body::implicit(vec![Stmt::Return(Some(Expr::tuple(vec![
                Arg::new(None, address),
                Arg::new(None, flag(false)),
            ])))]);
        }

        // Initialize the buffer with the current value.
        let Some(&buffer) = self.ast.decl(acc).params().first() else {
            return Body::implicit(Vec::new());
        };
        let current = self.storage_ref(s, AccessSemantics::Ordinary);
        let buffer_ref = || Expr::decl_ref(buffer, AccessSemantics::Ordinary);
        Body::implicit(vec![
            Stmt::Expr(Expr::assign(buffer_ref(), current)),
            Stmt::Return(Some(Expr::tuple(vec![
                Arg::new(None, buffer_ref()),
                Arg::new(None, flag(true)),
            ]))),
        ])
    }

    /// Getter and setter of an observing property.
    fn synthesize_observing(&mut self, s: DeclId) {
        let Some(storage) = self.ast.decl(s).storage() else {
            return;
        };
        if storage.accessors.getter.is_some() {
            return;
        }
        let will_set = storage.accessors.will_set;
        let did_set = storage.accessors.did_set;
        let dc = self.ast.decl(s).parent;
        trace!(storage = %self.name(s), "observing accessors");

        let overriding = self.ast.decl(s).attrs.has(&AttrKind::Override);
        let semantics = if overriding {
            AccessSemantics::Ordinary
        } else {
            AccessSemantics::DirectToStorage
        };
        let read = self.observed_ref(s, overriding, semantics);
        self.create_accessor(
            s,
            AccessorKind::Getter,
            Some(Body::implicit(vec![Stmt::Return(Some(read))])),
        );

        let setter = self.create_accessor(s, AccessorKind::Setter, None);
        let value = self.ast.decl(setter).params().first().copied();
        let value_ref = || value.map_or(Expr::implicit(ExprKind::Error), |v| {
            Expr::decl_ref(v, AccessSemantics::Ordinary)
        });

        let mut stmts = Vec::new();
        let mut old_value = None;
        if did_set.is_some() {
            let tmp = self.local_var(setter, "tmp");
            let current = self.observed_ref(s, overriding, semantics);
            stmts.push(Stmt::Let {
                var: tmp,
                init: current,
            });
            old_value = Some(tmp);
        }
        if let Some(will_set) = will_set {
            stmts.push(Stmt::Expr(self.call_observer(will_set, value_ref())));
        }
        let dest = self.observed_ref(s, overriding, semantics);
        stmts.push(Stmt::Expr(Expr::assign(dest, value_ref())));
        if let (Some(did_set), Some(tmp)) = (did_set, old_value) {
            let old = Expr::decl_ref(tmp, AccessSemantics::Ordinary);
            stmts.push(Stmt::Expr(self.call_observer(did_set, old)));
        }
        self.ast.decl_mut(setter).set_body(Body::implicit(stmts));

        if self.ast.is_class_context(dc) {
            for observer in [will_set, did_set].into_iter().flatten() {
                self.ast.decl_mut(observer).attrs.add_implicit(AttrKind::Final);
            }
        }
        if self.needs_materialize(s) {
            self.add_materialize_for_set(s);
        }
    }

    /// Reference to observed storage: the inherited property when overriding.
    fn observed_ref(&mut self, s: DeclId, overriding: bool, semantics: AccessSemantics) -> Expr {
        if overriding {
            let base = Expr::implicit(ExprKind::SuperRef);
            let member = self.ast.decl(s).overridden.unwrap_or(s);
            return Expr::member(base, member, semantics);
        }
        self.storage_ref(s, semantics)
    }

    fn call_observer(&mut self, observer: DeclId, arg: Expr) -> Expr {
        let callee = Expr::member(
            Expr::implicit(ExprKind::SelfRef),
            observer,
            AccessSemantics::Ordinary,
        );
        Expr::call(callee, vec![Arg::new(None, arg)])
    }

    /// `self.x`, `self[i]` or a plain reference for non-member storage.
    pub(super) fn storage_ref(&mut self, s: DeclId, semantics: AccessSemantics) -> Expr {
        let decl = self.ast.decl(s);
        let member = decl.parent.is_type_context();
        match &decl.kind {
            DeclKind::Subscript(sub) => {
                let index = Expr::tuple(
                    sub.indices
                        .iter()
                        .map(|&i| {
                            let label = self.ast.decl(i).as_param().and_then(|p| p.api_label);
                            Arg::new(label, Expr::decl_ref(i, AccessSemantics::Ordinary))
                        })
                        .collect(),
                );
                Expr::implicit(ExprKind::SubscriptRef {
                    base: Box::new(Expr::implicit(ExprKind::SelfRef)),
                    index: Box::new(index),
                    decl: s,
                    semantics,
                })
            }
            _ if member => Expr::member(Expr::implicit(ExprKind::SelfRef), s, semantics),
            _ => Expr::decl_ref(s, semantics),
        }
    }

    /// `storage = value`, copying the value first for `@copying` storage.
    pub(super) fn trivial_setter_body(
        &mut self,
        s: DeclId,
        setter: DeclId,
        semantics: AccessSemantics,
    ) -> Body {
        let Some(&value) = self.ast.decl(setter).params().first() else {
            return Body::implicit(Vec::new());
        };
        let mut source = Expr::decl_ref(value, AccessSemantics::Ordinary);
        if self.ast.decl(s).attrs.has(&AttrKind::CopyOnAssign) {
            source = self.copied_value(s, source);
        }
        let dest = self.storage_ref(s, semantics);
        Body::implicit(vec![Stmt::Expr(Expr::assign(dest, source))])
    }

    /// `value.copy(zone: nil) as! T`, or a conditional cast through optionals.
    fn copied_value(&mut self, s: DeclId, value: Expr) -> Expr {
        let ty = self.storage_value_type(s);
        let ty = self.map_to_archetypes(ty);
        let object = self.types.optional_object(ty);
        let copyable = object.unwrap_or(ty);

        let copy = self.known.copying.and_then(|copying| {
            let name = self.ast.interner.get("copy")?;
            self.ast
                .members_named(DeclContext::Nominal(copying), name)
                .first()
                .copied()
                .map(|copy| (copying, copy))
        });
        let Some((copying, copy)) = copy else {
            return value;
        };
        if !self.type_conforms_to(copyable, copying) {
            let span = self.span(s);
            self.report(DiagnosticKind::CopyOnAssignDoesntConform, span)
                .emit();
            return value;
        }

        let receiver = match object {
            Some(_) => Expr::implicit(ExprKind::ForceUnwrap(Box::new(value))),
            None => value,
        };
        let zone = self.ast.intern("zone");
        let call = Expr::call(
            Expr::member(receiver, copy, AccessSemantics::Ordinary),
            vec![Arg::new(Some(zone), Expr::implicit(ExprKind::NilLiteral))],
        );
        let kind = match object {
            Some(object) => ExprKind::ConditionalCast {
                sub: Box::new(call),
                to: object,
            },
            None => ExprKind::ForcedCast {
                sub: Box::new(call),
                to: ty,
            },
        };
        Expr::implicit(kind)
    }

    /// Final storage makes its accessors final; dynamic storage makes its
    /// getter and setter dynamic.
    fn mirror_storage_attrs(&mut self, s: DeclId) {
        let decl = self.ast.decl(s);
        let Some(storage) = decl.storage() else {
            return;
        };
        let is_final = decl.is_final();
        let is_dynamic = decl.attrs.is_dynamic();
        let accessors: Vec<DeclId> = storage.accessors.all().collect();
        let (getter, setter) = (storage.accessors.getter, storage.accessors.setter);
        for acc in accessors {
            if is_final {
                self.ast.decl_mut(acc).attrs.add_implicit(AttrKind::Final);
            }
            if is_dynamic && (Some(acc) == getter || Some(acc) == setter) {
                self.ast.decl_mut(acc).attrs.add_implicit(AttrKind::Dynamic);
            }
        }
    }

    /// Create an implicit accessor of `kind` for `s`, placed after its
    /// existing accessors, and validate it.
    pub(super) fn create_accessor(
        &mut self,
        s: DeclId,
        kind: AccessorKind,
        body: Option<Body>,
    ) -> DeclId {
        let storage = self.ast.decl(s);
        let parent = storage.parent;
        let loc = storage.span();
        let is_static = storage.is_static();
        let hint = storage
            .storage()
            .and_then(|st| st.accessors.all().last())
            .unwrap_or(s);

        let name = DeclName::simple(self.intern(accessor_name(kind)));
        let data = FuncData {
            accessor: Some(AccessorInfo { kind, storage: s }),
            is_static,
            body,
            ..FuncData::default()
        };
        let id = self
            .ast
            .alloc(Decl::implicit(DeclKind::Func(data), name, parent, loc));

        let param = match kind {
            AccessorKind::Setter => Some("value"),
            AccessorKind::MaterializeForSet => Some("buffer"),
            _ => None,
        };
        if let Some(param) = param {
            let name = DeclName::simple(self.intern(param));
            let p = self.ast.alloc(Decl::implicit(
                DeclKind::Param(ParamData::default()),
                name,
                DeclContext::Function(id),
                loc,
            ));
            if let Some(f) = self.ast.decl_mut(id).as_func_mut() {
                f.params = vec![p];
            }
        }

        if let Some(st) = self.ast.decl_mut(s).storage_mut() {
            st.accessors.set(kind, id);
        }
        if !self.ast.is_protocol_context(parent) {
            self.ast.insert_member_after(Some(hint), id);
        }
        if self.ast.decl(s).attrs.has(&AttrKind::Transparent) || self.ast.decl(s).implicit {
            self.ast.decl_mut(id).attrs.add_implicit(AttrKind::Transparent);
        }
        trace!(storage = %self.name(s), accessor = accessor_name(kind), "accessor created");
        self.validate_decl(id);
        id
    }

    /// An implicit local `let` inside function `owner`.
    pub(super) fn local_var(&mut self, owner: DeclId, name: &str) -> DeclId {
        let loc = self.ast.decl(owner).span();
        let name = DeclName::simple(self.intern(name));
        let data = VarData {
            is_let: true,
            ..VarData::default()
        };
        self.ast.alloc(Decl::implicit(
            DeclKind::Var(data),
            name,
            DeclContext::Function(owner),
            loc,
        ))
    }
}
