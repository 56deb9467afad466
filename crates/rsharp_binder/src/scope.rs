//! Scope management for the binder.

use rsharp_core::intern::InternedString;
use rsharp_core::text::TextSpan;
use rustc_hash::FxHashMap;

use crate::types::TypeId;

/// A local variable, parameter or query range variable.
#[derive(Debug, Clone, Copy)]
pub struct Local {
    pub ty: TypeId,
    pub span: TextSpan,
}

/// A label declared by a labeled statement.
#[derive(Debug, Clone, Copy)]
pub struct Label {
    /// Start of the label identifier; identifies the label in `BoundUnit`.
    pub pos: u32,
}

/// A scope in the binding phase. Scopes form a chain from inner to outer.
#[derive(Debug)]
pub struct Scope {
    pub locals: FxHashMap<InternedString, Local>,
    /// Labels declared directly in the block this scope belongs to.
    pub labels: FxHashMap<InternedString, Label>,
    /// The parent scope (None for a member body).
    pub parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new(parent: Option<Box<Scope>>) -> Self {
        Self {
            locals: FxHashMap::default(),
            labels: FxHashMap::default(),
            parent,
        }
    }

    /// Declare a local in this scope. Returns false if the name is already
    /// declared here; outer scopes are not consulted.
    pub fn declare_local(&mut self, name: InternedString, local: Local) -> bool {
        if self.locals.contains_key(&name) {
            return false;
        }
        self.locals.insert(name, local);
        true
    }

    pub fn declare_label(&mut self, name: InternedString, label: Label) -> bool {
        if self.labels.contains_key(&name) {
            return false;
        }
        self.labels.insert(name, label);
        true
    }

    /// Find a local in this scope or any enclosing one.
    pub fn lookup_local(&self, name: InternedString) -> Option<Local> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(local) = s.locals.get(&name) {
                return Some(*local);
            }
            scope = s.parent.as_deref();
        }
        None
    }

    /// Find a label visible from this scope: one declared in this block or an
    /// enclosing block of the same member. Labels of nested blocks are not
    /// visible.
    pub fn lookup_label(&self, name: InternedString) -> Option<Label> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(label) = s.labels.get(&name) {
                return Some(*label);
            }
            scope = s.parent.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsharp_core::intern::StringInterner;

    #[test]
    fn test_duplicate_local_in_same_scope() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut scope = Scope::new(None);
        let local = Local { ty: TypeId(0), span: TextSpan::new(0, 1) };
        assert!(scope.declare_local(x, local));
        assert!(!scope.declare_local(x, local));
    }

    #[test]
    fn test_lookup_walks_parents() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let outer_label = interner.intern("outer");
        let mut outer = Scope::new(None);
        outer.declare_local(x, Local { ty: TypeId(3), span: TextSpan::new(0, 1) });
        outer.declare_label(outer_label, Label { pos: 7 });

        let mut inner = Scope::new(Some(Box::new(outer)));
        assert!(inner.declare_local(x, Local { ty: TypeId(4), span: TextSpan::new(5, 1) }));
        assert_eq!(inner.lookup_local(x).map(|l| l.ty), Some(TypeId(4)));
        assert_eq!(inner.lookup_label(outer_label).map(|l| l.pos), Some(7));

        let outer = inner.parent.take().map(|b| *b);
        assert_eq!(outer.and_then(|s| s.lookup_local(x)).map(|l| l.ty), Some(TypeId(3)));
    }
}
