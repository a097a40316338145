//! Structural type interning ("typeid").
//!
//! Every composite type is assigned a canonical byte signature by a
//! deterministic encoder, interned as a [`Symbol`], and used as the key into
//! a process-wide `typeidmap : Symbol -> &'static Type`. Two structurally
//! identical types therefore resolve to the same `&'static Type` pointer —
//! equality is pointer equality, with no separate structural comparison ever
//! needed once a type has been interned.
//!
//! Grounded on the reference implementation's `typeid.c` (the byte-signature
//! encoder: one-byte primitives, `F`/`S`/`A`/`O`/`L` composite prefixes, hex
//! integers terminated by `;`) and `universe.c` (primitive singletons built
//! once at process start). The original keys off a raw `char*` tid on each
//! type struct; this version keys off an interned [`Symbol`] and stores the
//! process-wide map behind a [`once_cell::sync::Lazy`] + [`std::sync::Mutex`]
//! rather than a bespoke global initializer, matching how this workspace
//! guards its other shared, init-once tables.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Mutex;

use compiler_base::Symbol;

/// A type's structural classification, mirroring the node kinds §3 assigns
/// to the `Types` partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Unknown,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Int,
    Uint,
    F32,
    F64,
    Ptr,
    Ref,
    MutRef,
    Optional,
    Slice,
    MutSlice,
    Struct,
    Fun,
    Array,
    Alias,
}

impl TypeKind {
    /// The one-byte prefix used by primitive types as their entire typeid,
    /// and by composite kinds as the leading byte of their signature.
    fn typeid_prefix(self) -> u8 {
        match self {
            TypeKind::Void => b'v',
            TypeKind::Unknown => b'u',
            TypeKind::Bool => b'b',
            TypeKind::I8 => b'1',
            TypeKind::I16 => b'2',
            TypeKind::I32 => b'3',
            TypeKind::I64 => b'4',
            TypeKind::U8 => b'5',
            TypeKind::U16 => b'6',
            TypeKind::U32 => b'7',
            TypeKind::U64 => b'8',
            TypeKind::Int => b'i',
            TypeKind::Uint => b'w',
            TypeKind::F32 => b'f',
            TypeKind::F64 => b'd',
            TypeKind::Ptr => b'P',
            TypeKind::Ref => b'R',
            TypeKind::MutRef => b'M',
            TypeKind::Slice => b's',
            TypeKind::MutSlice => b'm',
            TypeKind::Optional => b'O',
            TypeKind::Struct => b'S',
            TypeKind::Fun => b'F',
            TypeKind::Array => b'A',
            TypeKind::Alias => b'L',
        }
    }

    fn is_primitive(self) -> bool {
        matches!(
            self,
            TypeKind::Void
                | TypeKind::Unknown
                | TypeKind::Bool
                | TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::U8
                | TypeKind::U16
                | TypeKind::U32
                | TypeKind::U64
                | TypeKind::Int
                | TypeKind::Uint
                | TypeKind::F32
                | TypeKind::F64
        )
    }

    /// `true` for the pointer-shaped kinds whose size/align equal the
    /// target's pointer size/align (§3, "Type invariants").
    pub fn is_pointer_shaped(self) -> bool {
        matches!(
            self,
            TypeKind::Ptr
                | TypeKind::Ref
                | TypeKind::MutRef
                | TypeKind::Slice
                | TypeKind::MutSlice
                | TypeKind::Fun
        )
    }
}

pub type TypeRef = &'static Type;

/// A struct field: name plus field type, in declaration order.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Symbol,
    pub ty: TypeRef,
}

/// The structure-specific payload of a [`Type`]. Primitive kinds carry
/// nothing beyond their `kind`.
#[derive(Debug)]
pub enum TypeShape {
    Prim,
    /// `Ptr`, `Ref`, `MutRef`, `Slice`, `MutSlice` all share this shape.
    Elem(TypeRef),
    Optional(TypeRef),
    Array { len: u64, elem: TypeRef },
    Fun { params: Vec<TypeRef>, result: TypeRef },
    Struct { fields: Vec<Field> },
    Alias { name: Symbol, underlying: TypeRef },
}

/// A process-wide, interned type node.
///
/// Once constructed through [`intern_type`], a `Type`'s address is stable
/// for the lifetime of the process and is never reclaimed — the same
/// discipline the symbol interner uses for strings (§5: "the interner is
/// never released within a process").
#[derive(Debug)]
pub struct Type {
    pub kind: TypeKind,
    pub size: u32,
    pub align: u32,
    pub is_unsigned: bool,
    pub tid: Symbol,
    pub shape: TypeShape,
}

impl Type {
    /// `true` if this type's runtime representation fits comfortably in a
    /// register pair — used by the `this`-parameter by-value optimization
    /// (§4.4.1): small structs and primitives are passed by value even for
    /// a non-`mut this` receiver.
    pub fn is_small(&self, ptr_size: u32) -> bool {
        self.align <= ptr_size && self.size <= 2 * ptr_size
    }
}

fn write_hex_u32(out: &mut String, v: u32) {
    let _ = write!(out, "{:x};", v);
}

fn write_hex_u64(out: &mut String, v: u64) {
    let _ = write!(out, "{:x};", v);
}

fn append_tid(out: &mut String, ty: TypeRef) {
    out.push_str(ty.tid.as_str());
}

fn signature_for(kind: TypeKind, build: impl FnOnce(&mut String)) -> String {
    let mut buf = String::new();
    buf.push(kind.typeid_prefix() as char);
    build(&mut buf);
    buf
}

static TYPEID_MAP: Lazy<Mutex<HashMap<Symbol, TypeRef>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Struct types that have already taken a name via `type NAME { ... }`,
/// keyed by pointer identity the same way [`crate::methodmap::MethodMap`]
/// keys off receiver identity. A second `type` declaration aliasing an
/// already-named struct must wrap it in `TypeShape::Alias` instead of
/// renaming it out from under its first owner.
static NAMED_STRUCTS: Lazy<Mutex<HashMap<usize, Symbol>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// `type NAME TYPE` (§4.4.1): a struct type with no name yet takes `name`
/// directly, rather than being wrapped in an alias node, so that defining a
/// struct and naming it in one declaration doesn't add a layer of
/// indirection. Returns `true` when `ty` took the name (the caller should
/// bind `name` straight to `ty`); `false` when `ty` isn't a struct or
/// already has a name (the caller should wrap it in `TypeShape::Alias`).
pub fn claim_struct_name(ty: TypeRef, name: Symbol) -> bool {
    if ty.kind != TypeKind::Struct {
        return false;
    }
    let key = ty as *const Type as usize;
    let mut named = NAMED_STRUCTS.lock().unwrap_or_else(|e| e.into_inner());
    if named.contains_key(&key) {
        false
    } else {
        named.insert(key, name);
        true
    }
}

/// Interns a fully-built, not-yet-canonical type, returning the canonical
/// (possibly pre-existing) node. Two calls describing structurally equal
/// types return the same `TypeRef`.
///
/// `kind`/`size`/`align`/`is_unsigned` describe the candidate; `shape`
/// supplies the structure the signature is computed from. Primitive kinds
/// should go through [`crate::universe`] instead, which installs them once
/// at process start rather than on every lookup.
pub fn intern_type(
    kind: TypeKind,
    size: u32,
    align: u32,
    is_unsigned: bool,
    shape: TypeShape,
) -> TypeRef {
    let signature = match &shape {
        TypeShape::Prim => {
            debug_assert!(kind.is_primitive());
            (kind.typeid_prefix() as char).to_string()
        }
        TypeShape::Elem(elem) => signature_for(kind, |buf| append_tid(buf, elem)),
        TypeShape::Optional(elem) => signature_for(kind, |buf| append_tid(buf, elem)),
        TypeShape::Array { len, elem } => signature_for(kind, |buf| {
            write_hex_u64(buf, *len);
            append_tid(buf, elem);
        }),
        TypeShape::Fun { params, result } => signature_for(kind, |buf| {
            write_hex_u32(buf, params.len() as u32);
            for p in params {
                append_tid(buf, p);
            }
            append_tid(buf, result);
        }),
        TypeShape::Struct { fields } => signature_for(kind, |buf| {
            write_hex_u32(buf, fields.len() as u32);
            for f in fields {
                append_tid(buf, f.ty);
            }
        }),
        TypeShape::Alias { name, underlying } => signature_for(kind, |buf| {
            let name_str = name.as_str();
            write_hex_u32(buf, name_str.len() as u32);
            buf.push_str(name_str);
            append_tid(buf, underlying);
        }),
    };

    let tid = compiler_base::intern::intern(&signature);

    let mut map = TYPEID_MAP.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = map.get(&tid) {
        return existing;
    }
    let leaked: TypeRef = Box::leak(Box::new(Type {
        kind,
        size,
        align,
        is_unsigned,
        tid,
        shape,
    }));
    map.insert(tid, leaked);
    leaked
}

/// Unwraps `Alias` nodes down to the concrete type they name (§4.5): an
/// alias is nominal sugar over its underlying structure, never its own
/// structural kind, so anything that needs to dispatch on `kind`/`shape`
/// (call dispatch, member resolution, literal type context, ...) should
/// look at `resolve_alias(ty)` rather than `ty` directly.
pub fn resolve_alias(ty: TypeRef) -> TypeRef {
    match &ty.shape {
        TypeShape::Alias { underlying, .. } => resolve_alias(*underlying),
        _ => ty,
    }
}

/// Look up a previously interned type by its typeid, without constructing a
/// candidate. Used by tests asserting `typeidmap[t.tid] == t` (§8).
pub fn lookup_by_tid(tid: Symbol) -> Option<TypeRef> {
    TYPEID_MAP
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(&tid)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe;

    #[test]
    fn equal_function_types_share_one_node() {
        let i32_ty = universe::i32_type();
        let a = intern_type(
            TypeKind::Fun,
            8,
            8,
            false,
            TypeShape::Fun {
                params: vec![i32_ty, i32_ty],
                result: i32_ty,
            },
        );
        let b = intern_type(
            TypeKind::Fun,
            8,
            8,
            false,
            TypeShape::Fun {
                params: vec![i32_ty, i32_ty],
                result: i32_ty,
            },
        );
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn distinct_struct_types_get_distinct_nodes() {
        let i32_ty = universe::i32_type();
        let bool_ty = universe::bool_type();
        let a = intern_type(
            TypeKind::Struct,
            4,
            4,
            false,
            TypeShape::Struct {
                fields: vec![Field {
                    name: compiler_base::intern::intern("x"),
                    ty: i32_ty,
                }],
            },
        );
        let b = intern_type(
            TypeKind::Struct,
            1,
            1,
            false,
            TypeShape::Struct {
                fields: vec![Field {
                    name: compiler_base::intern::intern("x"),
                    ty: bool_ty,
                }],
            },
        );
        assert!(!std::ptr::eq(a, b));
    }

    #[test]
    fn tid_round_trips_through_lookup() {
        let elem = universe::i32_type();
        let opt = intern_type(TypeKind::Optional, 4, 4, false, TypeShape::Optional(elem));
        assert_eq!(lookup_by_tid(opt.tid), Some(opt));
    }

    #[test]
    fn array_signature_encodes_length_and_element() {
        let elem = universe::u8_type();
        let a = intern_type(
            TypeKind::Array,
            16,
            1,
            false,
            TypeShape::Array { len: 16, elem },
        );
        assert!(a.tid.as_str().starts_with('A'));
        assert!(a.tid.as_str().contains("10;")); // 16 in hex
    }
}
