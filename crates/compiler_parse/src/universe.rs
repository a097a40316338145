//! The universe: built-in primitive types and constants, read-only and
//! initialized exactly once.
//!
//! Grounded on the reference implementation's `universe.c`, which builds
//! each primitive as a `static const` singleton via a `DEFTYPE` macro. This
//! version does the equivalent with [`once_cell::sync::Lazy`]-guarded
//! `Box::leak` calls the first time each primitive is touched, through the
//! same [`crate::types::intern_type`] path composite types use, so a
//! primitive's `tid` ends up in `typeidmap` exactly like everything else.
//!
//! `true` and `false` are not scanner keywords (see [`crate::token`]); they
//! are universe bindings, resolved the same way any other identifier
//! falling through scope and package scope would be (§4.4.5). The universe
//! map therefore holds two kinds of entry: a type, or a boolean constant
//! value the parser turns into a `BOOLLIT` expression node.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use compiler_base::Symbol;

use crate::types::{intern_type, Type, TypeKind, TypeRef, TypeShape};

/// What an identifier bound in the universe refers to.
#[derive(Debug, Clone, Copy)]
pub enum UniverseBinding {
    Type(TypeRef),
    Bool(bool),
}

macro_rules! prim {
    ($kind:expr, $size:expr, $align:expr, $unsigned:expr) => {
        intern_type($kind, $size, $align, $unsigned, TypeShape::Prim)
    };
}

pub fn void_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::Void, 0, 0, false));
    *T
}

pub fn unknown_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::Unknown, 0, 0, false));
    *T
}

pub fn bool_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::Bool, 1, 1, true));
    *T
}

pub fn i8_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::I8, 1, 1, false));
    *T
}
pub fn i16_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::I16, 2, 2, false));
    *T
}
pub fn i32_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::I32, 4, 4, false));
    *T
}
pub fn i64_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::I64, 8, 8, false));
    *T
}
pub fn u8_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::U8, 1, 1, true));
    *T
}
pub fn u16_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::U16, 2, 2, true));
    *T
}
pub fn u32_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::U32, 4, 4, true));
    *T
}
pub fn u64_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::U64, 8, 8, true));
    *T
}

/// Plain `int`: signed, target-independent default width (4 bytes, matching
/// the reference implementation's `type_int`).
pub fn int_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::Int, 4, 4, false));
    *T
}
pub fn uint_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::Uint, 4, 4, true));
    *T
}
pub fn f32_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::F32, 4, 4, false));
    *T
}
pub fn f64_type() -> TypeRef {
    static T: Lazy<TypeRef> = Lazy::new(|| prim!(TypeKind::F64, 8, 8, false));
    *T
}

static NAMES: Lazy<HashMap<&'static str, UniverseBinding>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("void", UniverseBinding::Type(void_type()));
    m.insert("bool", UniverseBinding::Type(bool_type()));
    m.insert("i8", UniverseBinding::Type(i8_type()));
    m.insert("i16", UniverseBinding::Type(i16_type()));
    m.insert("i32", UniverseBinding::Type(i32_type()));
    m.insert("i64", UniverseBinding::Type(i64_type()));
    m.insert("u8", UniverseBinding::Type(u8_type()));
    m.insert("u16", UniverseBinding::Type(u16_type()));
    m.insert("u32", UniverseBinding::Type(u32_type()));
    m.insert("u64", UniverseBinding::Type(u64_type()));
    m.insert("int", UniverseBinding::Type(int_type()));
    m.insert("uint", UniverseBinding::Type(uint_type()));
    m.insert("f32", UniverseBinding::Type(f32_type()));
    m.insert("f64", UniverseBinding::Type(f64_type()));
    m.insert("true", UniverseBinding::Bool(true));
    m.insert("false", UniverseBinding::Bool(false));
    m
});

/// Looks up `name` in the universe, the read-only parent of the package
/// scope (§4.4.5). Returns `None` for any name that is neither a built-in
/// type nor a built-in constant.
pub fn lookup(name: Symbol) -> Option<UniverseBinding> {
    NAMES.get(name.as_str()).copied()
}

/// An integer type's representable range as `(min, max)`, used by integer
/// literal range checking (§4.4.3) without reproducing the reference
/// implementation's suspect bit-masking (§9, Open Questions).
pub fn int_range(ty: &Type) -> (i128, u128) {
    let bits = (ty.size * 8) as u32;
    if ty.is_unsigned {
        let max = if bits >= 128 { u128::MAX } else { (1u128 << bits) - 1 };
        (0, max)
    } else {
        let max = if bits == 0 { 0 } else { (1i128 << (bits - 1)) - 1 };
        let min = if bits == 0 { 0 } else { -(1i128 << (bits - 1)) };
        (min, max as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_lookup_by_name() {
        match lookup(compiler_base::intern::intern("i32")) {
            Some(UniverseBinding::Type(t)) => assert_eq!(t.size, 4),
            _ => panic!("expected i32 type binding"),
        }
    }

    #[test]
    fn true_and_false_are_bool_constants() {
        assert!(matches!(
            lookup(compiler_base::intern::intern("true")),
            Some(UniverseBinding::Bool(true))
        ));
        assert!(matches!(
            lookup(compiler_base::intern::intern("false")),
            Some(UniverseBinding::Bool(false))
        ));
    }

    #[test]
    fn unknown_name_is_absent() {
        assert!(lookup(compiler_base::intern::intern("not_a_builtin")).is_none());
    }

    #[test]
    fn primitives_are_process_wide_singletons() {
        assert!(std::ptr::eq(i32_type(), i32_type()));
    }

    #[test]
    fn i32_range_is_symmetric_twos_complement() {
        let (min, max) = int_range(i32_type());
        assert_eq!(min, i32::MIN as i128);
        assert_eq!(max, i32::MAX as u128);
    }

    #[test]
    fn u8_range_is_unsigned() {
        let (min, max) = int_range(u8_type());
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }
}
