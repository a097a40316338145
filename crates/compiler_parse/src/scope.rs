//! A linear-scan scope stack for tracking bindings during parsing.
//!
//! Bindings are pushed onto a single contiguous buffer interleaved with
//! scope-base markers, and a whole scope is popped by rewinding one index —
//! no per-binding deallocation. Lookup walks the buffer tail-first, which
//! favors the common case of resolving a name to something bound nearby.
//! This beats a chained hash map in practice: most identifiers reference a
//! binding introduced a few lines up, and cache locality wins on a flat
//! buffer walked backwards.
//!
//! Grounded directly on the scope stack in the reference implementation's
//! scanner/parser support code (a `void*` array of interleaved base markers
//! and key/value pairs). This version trades the raw pointer array for a
//! small typed `Slot` enum, which costs one discriminant per slot but drops
//! the unsafe pointer casts entirely.

use compiler_base::Symbol;

enum Slot<V> {
    /// Marks the start of a scope; stores the previous scope's base index.
    Base(usize),
    Entry(Symbol, V),
}

/// A stack of lexical scopes, each holding `(Symbol, V)` bindings.
///
/// `V` is typically a reference into an [`compiler_base::AstArena`]-allocated
/// node, so the scope stack borrows the same lifetime as the AST it
/// describes.
pub struct ScopeStack<V> {
    slots: Vec<Slot<V>>,
    base: usize,
}

impl<V: Copy> ScopeStack<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            base: 0,
        }
    }

    /// Opens a new, empty scope nested inside the current one.
    pub fn push(&mut self) {
        self.slots.push(Slot::Base(self.base));
        self.base = self.slots.len() - 1;
    }

    /// Closes the innermost scope, discarding every binding defined in it.
    ///
    /// Panics if called with no open scope — callers must pair every
    /// `push` with a `pop`.
    pub fn pop(&mut self) {
        self.slots.truncate(self.base);
        match self.slots.pop() {
            Some(Slot::Base(parent)) => self.base = parent,
            _ => panic!("ScopeStack::pop called without a matching push"),
        }
    }

    /// Binds `key` to `value` in the innermost open scope.
    ///
    /// Does not check for shadowing or redefinition within the same scope —
    /// callers that must diagnose duplicate definitions look up `key`
    /// first, scoped to `maxdepth == 0`.
    pub fn define(&mut self, key: Symbol, value: V) {
        self.slots.push(Slot::Entry(key, value));
    }

    /// Looks up `key`, searching at most `maxdepth` enclosing scopes beyond
    /// the innermost one. `maxdepth == 0` restricts the search to the
    /// current scope only; `maxdepth == u32::MAX` searches to the root.
    pub fn lookup(&self, key: Symbol, maxdepth: u32) -> Option<V> {
        let mut i = self.slots.len();
        let mut base = self.base;
        let mut depth_left = maxdepth;
        while i > 0 {
            i -= 1;
            if i == base {
                if depth_left == 0 {
                    break;
                }
                depth_left -= 1;
                match self.slots[i] {
                    Slot::Base(parent) => base = parent,
                    Slot::Entry(..) => unreachable!("base marker slot held an entry"),
                }
                continue;
            }
            if let Slot::Entry(k, v) = self.slots[i] {
                if k == key {
                    return Some(v);
                }
            }
        }
        None
    }

    /// Convenience for the common case: look up only within the innermost
    /// open scope (no ancestor scopes are searched).
    pub fn lookup_local(&self, key: Symbol) -> Option<V> {
        self.lookup(key, 0)
    }

    /// How many scopes are currently open.
    pub fn depth(&self) -> u32 {
        let mut n = 0;
        let mut base = self.base;
        while base > 0 {
            n += 1;
            base = match self.slots[base] {
                Slot::Base(parent) => parent,
                Slot::Entry(..) => unreachable!("base marker slot held an entry"),
            };
        }
        n
    }
}

impl<V: Copy> Default for ScopeStack<V> {
    fn default() -> Self {
        Self::new()
    }
}
