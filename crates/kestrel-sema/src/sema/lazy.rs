//! `lazy` properties: an optional backing variable and a guarded getter.

use kestrel_core::DeclName;
use tracing::debug;

use super::Elaborator;
use crate::ast::{
    AccessSemantics, Accessibility, AccessorKind, AttrKind, Body, Decl, DeclContext, DeclId,
    DeclKind, Expr, ExprKind, Pattern, PatternBindingData, StaticSpelling, Stmt, StorageKind,
    TypeLoc, VarData,
};
use crate::state::CheckState;
use crate::types::TypeId;

impl Elaborator {
    /// Turn lazy property `s` into a computed property over `<name>.storage`.
    pub(super) fn build_lazy_storage(&mut self, s: DeclId) {
        let Some(binding) = self.ast.decl(s).as_var().and_then(|v| v.binding) else {
            return;
        };
        if self.ast.decl(s).as_var().is_some_and(|v| v.lazy_storage.is_some()) {
            return;
        }
        if self
            .ast
            .decl(binding)
            .as_binding()
            .is_some_and(|b| !b.init_checked && b.init.is_some())
        {
            self.type_check_binding(binding);
        }
        let Some(init) = self
            .ast
            .decl_mut(binding)
            .as_binding_mut()
            .and_then(|b| b.init.take())
        else {
            return;
        };

        let interface = self.interface_type_of(s);
        let value_ty = self.types.reference_storage_referent(interface);
        let storage_ty = self.types.optional(value_ty);
        let storage = self.add_lazy_backing(s, storage_ty);

        self.set_lazy_kind(s, storage);
        let getter = self.create_accessor(s, AccessorKind::Getter, None);
        for closure in init.direct_closures() {
            self.ast.closure_mut(closure).parent = DeclContext::Function(getter);
        }
        let body = self.lazy_getter_body(getter, storage, value_ty, init);
        self.ast.decl_mut(getter).set_body(body);

        let dc = self.ast.decl(s).parent;
        if self.ast.is_value_type_context(dc)
            && let Some(f) = self.ast.decl_mut(getter).as_func_mut()
        {
            f.is_mutating = true;
        }

        let setter = self.create_accessor(s, AccessorKind::Setter, None);
        let body = self.trivial_setter_body(storage, setter, AccessSemantics::DirectToStorage);
        self.ast.decl_mut(setter).set_body(body);
        if self.needs_materialize(s) {
            self.add_materialize_for_set(s);
        }
        debug!(property = %self.name(s), "lazy storage synthesized");
    }

    fn set_lazy_kind(&mut self, s: DeclId, storage: DeclId) {
        if let Some(var) = self.ast.decl_mut(s).as_var_mut() {
            var.storage.kind = StorageKind::Computed;
            var.lazy_storage = Some(storage);
        }
    }

    /// `private var <name>.storage: T? = nil`, inserted after `s`.
    fn add_lazy_backing(&mut self, s: DeclId, storage_ty: TypeId) -> DeclId {
        let decl = self.ast.decl(s);
        let parent = decl.parent;
        let loc = decl.span();
        let range = decl.range;
        let is_static = decl.is_static();
        let name = format!("{}.storage", self.ast.base_name_of(s));

        let data = VarData {
            is_static,
            ..VarData::default()
        };
        let name = DeclName::simple(self.intern(&name));
        let var = self
            .ast
            .alloc(Decl::implicit(DeclKind::Var(data), name, parent, loc));
        let attrs = &mut self.ast.decl_mut(var).attrs;
        attrs.add_implicit(AttrKind::Accessibility(Accessibility::Private));
        attrs.add_implicit(AttrKind::SetterAccessibility(Accessibility::Private));
        if self.ast.is_class_context(parent) {
            self.ast.decl_mut(var).attrs.add_implicit(AttrKind::Final);
        }

        let pattern = Pattern::typed(
            Pattern::named(var, loc.range),
            TypeLoc::without_loc(storage_ty),
        );
        let nil = Expr::implicit(ExprKind::NilLiteral);
        let data = PatternBindingData {
            pattern,
            init: Some(nil),
            init_checked: false,
            is_static,
            static_spelling: if is_static {
                StaticSpelling::Static
            } else {
                StaticSpelling::None
            },
            static_range: None,
        };
        let name = DeclName::simple(self.intern("_"));
        let storage_binding = self.ast.alloc(Decl::implicit(
            DeclKind::PatternBinding(data),
            name,
            parent,
            loc,
        ));
        self.ast.decl_mut(storage_binding).range = range;
        if let Some(v) = self.ast.decl_mut(var).as_var_mut() {
            v.binding = Some(storage_binding);
        }

        let hint = self
            .ast
            .decl(s)
            .storage()
            .and_then(|st| st.accessors.all().last())
            .unwrap_or(s);
        self.ast.insert_member_after(Some(hint), storage_binding);
        self.ast.insert_member_after(Some(storage_binding), var);

        self.validate_decl(storage_binding);
        self.validate_decl(var);
        var
    }

    /// ```text
    /// let tmp1 = storage
    /// if tmp1 { return tmp1! }
    /// let tmp2: T = <init>
    /// storage = tmp2
    /// return tmp2
    /// ```
    fn lazy_getter_body(
        &mut self,
        getter: DeclId,
        storage: DeclId,
        value_ty: TypeId,
        init: Expr,
    ) -> Body {
        let optional = self.types.optional(value_ty);
        let tmp1 = self.local_var(getter, "tmp1");
        self.set_local_type(tmp1, optional);
        let tmp2 = self.local_var(getter, "tmp2");
        self.set_local_type(tmp2, value_ty);

        let read = |id| Expr::decl_ref(id, AccessSemantics::Ordinary);
        let current = self.storage_ref(storage, AccessSemantics::DirectToStorage);
        let dest = self.storage_ref(storage, AccessSemantics::DirectToStorage);
        Body::implicit(vec![
            Stmt::Let {
                var: tmp1,
                init: current,
            },
            Stmt::If {
                cond: read(tmp1),
                then: vec![Stmt::Return(Some(Expr::implicit(ExprKind::ForceUnwrap(
                    Box::new(read(tmp1)),
                ))))],
            },
            Stmt::Let {
                var: tmp2,
                init,
            },
            Stmt::Expr(Expr::assign(dest, read(tmp2))),
            Stmt::Return(Some(read(tmp2))),
        ])
    }

    fn set_local_type(&mut self, var: DeclId, interface: TypeId) {
        let contextual = self.map_to_archetypes(interface);
        let decl = self.ast.decl_mut(var);
        decl.interface_ty = Some(interface);
        decl.ty = Some(contextual);
        decl.state.validation = CheckState::Checked;
    }
}
