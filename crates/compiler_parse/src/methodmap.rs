//! Method map: receiver-type identity → `(name → function)`.
//!
//! Kept as a side-table rather than embedded in the type node, so that
//! methods (which reference their receiver type) don't force a back-edge
//! into the type graph — receiver types reference methods only through this
//! map (§9, "Cyclic references"). The map is keyed by the receiver type's
//! pointer identity: since composite types are interned (§4.5), structurally
//! equal receivers always share the same key.

use std::collections::HashMap;

use compiler_base::Symbol;

use crate::ast::Expr;
use crate::types::TypeRef;

fn type_key(ty: TypeRef) -> usize {
    ty as *const _ as usize
}

/// A method lookup or insertion failure: the method name collides with an
/// existing field or method on the same receiver.
#[derive(Debug, Clone, Copy)]
pub struct Collision;

/// `type-node -> (name -> function)`, scoped to one parser/compilation
/// context the way `logicaffeine_kernel`'s side-tables scope to one
/// kernel instance rather than living fully process-wide: methods
/// themselves are arena-allocated per unit, so the map can't outlive `'a`.
pub struct MethodMap<'a> {
    by_type: HashMap<usize, HashMap<Symbol, &'a Expr<'a>>>,
}

impl<'a> MethodMap<'a> {
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// Registers `name` as a method of `receiver`, implemented by `fun_node`.
    /// Fails if `receiver` already has a method of that name.
    pub fn insert(
        &mut self,
        receiver: TypeRef,
        name: Symbol,
        fun_node: &'a Expr<'a>,
    ) -> Result<(), Collision> {
        let methods = self.by_type.entry(type_key(receiver)).or_default();
        if methods.contains_key(&name) {
            return Err(Collision);
        }
        methods.insert(name, fun_node);
        Ok(())
    }

    /// Looks up a method of `receiver` by name.
    pub fn lookup(&self, receiver: TypeRef, name: Symbol) -> Option<&'a Expr<'a>> {
        self.by_type
            .get(&type_key(receiver))
            .and_then(|methods| methods.get(&name))
            .copied()
    }
}

impl<'a> Default for MethodMap<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use crate::universe;
    use compiler_base::span::{SourceLocation, SourceRange};

    fn point() -> SourceRange {
        SourceRange::point(SourceLocation::new(compiler_base::intern::intern("t"), 1, 1))
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut map = MethodMap::new();
        let ty = universe::i32_type();
        let fun = Expr::new(point(), universe::void_type(), ExprKind::Bad);
        let name = compiler_base::intern::intern("bar");
        map.insert(ty, name, &fun).unwrap();
        assert!(std::ptr::eq(map.lookup(ty, name).unwrap(), &fun));
    }

    #[test]
    fn duplicate_method_name_collides() {
        let mut map = MethodMap::new();
        let ty = universe::i32_type();
        let fun1 = Expr::new(point(), universe::void_type(), ExprKind::Bad);
        let fun2 = Expr::new(point(), universe::void_type(), ExprKind::Bad);
        let name = compiler_base::intern::intern("bar");
        map.insert(ty, name, &fun1).unwrap();
        assert!(map.insert(ty, name, &fun2).is_err());
    }

    #[test]
    fn distinct_receivers_have_independent_namespaces() {
        let mut map = MethodMap::new();
        let a = universe::i32_type();
        let b = universe::bool_type();
        let fun = Expr::new(point(), universe::void_type(), ExprKind::Bad);
        let name = compiler_base::intern::intern("bar");
        map.insert(a, name, &fun).unwrap();
        assert!(map.lookup(b, name).is_none());
    }
}
