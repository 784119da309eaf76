//! Supertype traversal and type-level annotation resolution.
//!
//! Annotations inherit: the effective level of a type is the join of its
//! own annotation and every transitive ancestor's, so diamonds with
//! conflicting annotations resolve deterministically to the most
//! restrictive. A subtype that declares a less restrictive level than an
//! ancestor is itself a violation, reported at the declaration site.

use rustc_hash::FxHashSet;

use crate::error::ClassifyError;
use crate::ir::{Program, TypeId, TypeRef};
use crate::safety::level::SafetyLevel;
use crate::safety::types::{Violation, ViolationKind};

/// Read-only view over a program's type table.
#[derive(Debug, Clone, Copy)]
pub struct TypeHierarchy<'a> {
    program: &'a Program,
}

impl<'a> TypeHierarchy<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    /// Join of the annotations declared by the strict ancestors of `ty`
    /// (not `ty` itself), with the id of the strictest ancestor.
    ///
    /// The walk order over the supertype lists is fixed, so sibling
    /// conflicts resolve deterministically; a visited set guards against
    /// malformed cyclic hierarchies. Suppressed ancestors contribute
    /// nothing.
    pub fn ancestor_annotation(
        &self,
        ty: TypeId,
    ) -> Result<Option<(SafetyLevel, TypeId)>, ClassifyError> {
        let root = self
            .program
            .type_decl(ty)
            .ok_or(ClassifyError::UnresolvedType(ty))?;

        let mut visited: FxHashSet<TypeId> = FxHashSet::default();
        visited.insert(ty);
        let mut worklist: Vec<TypeId> = root.supertypes.clone();
        let mut strictest: Option<(SafetyLevel, TypeId)> = None;

        while let Some(ancestor_id) = worklist.pop() {
            if !visited.insert(ancestor_id) {
                continue;
            }
            let ancestor = self
                .program
                .type_decl(ancestor_id)
                .ok_or(ClassifyError::UnresolvedType(ancestor_id))?;
            if !ancestor.suppressed {
                if let Some(level) = ancestor.annotation {
                    strictest = match strictest {
                        Some((best, _)) if best >= level => strictest,
                        _ => Some((level, ancestor_id)),
                    };
                }
            }
            worklist.extend_from_slice(&ancestor.supertypes);
        }
        Ok(strictest)
    }

    /// Effective annotation of a type: its own (unless suppressed)
    /// joined with every ancestor's. `None` when nothing in the
    /// hierarchy is annotated.
    pub fn effective_annotation(
        &self,
        ty: TypeId,
    ) -> Result<Option<SafetyLevel>, ClassifyError> {
        let decl = self
            .program
            .type_decl(ty)
            .ok_or(ClassifyError::UnresolvedType(ty))?;
        let own = if decl.suppressed { None } else { decl.annotation };
        let inherited = self.ancestor_annotation(ty)?.map(|(level, _)| level);
        Ok(match (own, inherited) {
            (Some(a), Some(b)) => Some(a.join(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        })
    }

    /// Whether `ty` is throwable-derived (own flag or any ancestor's).
    pub fn is_throwable(&self, ty: TypeId) -> Result<bool, ClassifyError> {
        let mut visited: FxHashSet<TypeId> = FxHashSet::default();
        let mut worklist = vec![ty];
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            let decl = self
                .program
                .type_decl(id)
                .ok_or(ClassifyError::UnresolvedType(id))?;
            if decl.throwable {
                return Ok(true);
            }
            worklist.extend_from_slice(&decl.supertypes);
        }
        Ok(false)
    }

    /// Level of a type reference: the effective hierarchy annotation
    /// joined with the levels of the type arguments, so containers carry
    /// their elements' sensitivity (`Optional<UnsafeType>` is unsafe).
    ///
    /// Unannotated throwable-derived types classify `Unsafe`: exception
    /// content frequently carries user- or environment-controlled
    /// strings. An explicit annotation anywhere in the hierarchy wins.
    pub fn classify_ref(&self, r: &TypeRef) -> Result<SafetyLevel, ClassifyError> {
        let mut level = match self.effective_annotation(r.ty)? {
            Some(annotated) => annotated,
            None if self.is_throwable(r.ty)? => SafetyLevel::Unsafe,
            None => SafetyLevel::Safe,
        };
        for arg in &r.args {
            level = level.join(self.classify_ref(arg)?);
        }
        Ok(level)
    }

    /// Declaration-site check: a subtype declaring a less restrictive
    /// level than an ancestor requires is flagged regardless of whether
    /// the subtype is ever instantiated. Suppressed subtypes are
    /// skipped.
    pub fn check_type_decl(&self, ty: TypeId) -> Result<Option<Violation>, ClassifyError> {
        let decl = self
            .program
            .type_decl(ty)
            .ok_or(ClassifyError::UnresolvedType(ty))?;
        if decl.suppressed {
            return Ok(None);
        }
        let Some(own) = decl.annotation else {
            return Ok(None);
        };
        let Some((inherited, ancestor_id)) = self.ancestor_annotation(ty)? else {
            return Ok(None);
        };
        if own >= inherited {
            return Ok(None);
        }
        let ancestor = self
            .program
            .type_decl(ancestor_id)
            .ok_or(ClassifyError::UnresolvedType(ancestor_id))?;
        Ok(Some(Violation {
            kind: ViolationKind::LenientSubtype {
                subtype: decl.name.clone(),
                ancestor: ancestor.name.clone(),
            },
            computed: own,
            required: inherited,
            location: decl.location.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ProgramBuilder;

    #[test]
    fn effective_annotation_joins_ancestors() {
        let mut b = ProgramBuilder::new();
        let secret = b.interface("Secret");
        b.annotate_type(secret, SafetyLevel::Unsafe);
        let token = b.class("Token");
        b.add_supertype(token, secret);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert_eq!(
            h.effective_annotation(token).unwrap(),
            Some(SafetyLevel::Unsafe)
        );
    }

    #[test]
    fn diamond_conflict_resolves_to_most_restrictive() {
        let mut b = ProgramBuilder::new();
        let left = b.interface("Left");
        b.annotate_type(left, SafetyLevel::DoNotLog);
        let right = b.interface("Right");
        b.annotate_type(right, SafetyLevel::Unsafe);
        let bottom = b.class("Bottom");
        b.add_supertype(bottom, left);
        b.add_supertype(bottom, right);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        let (level, ancestor) = h.ancestor_annotation(bottom).unwrap().unwrap();
        assert_eq!(level, SafetyLevel::Unsafe);
        assert_eq!(ancestor, right);
    }

    #[test]
    fn lenient_subtype_is_flagged_at_declaration() {
        let mut b = ProgramBuilder::new();
        let iface = b.interface("Sensitive");
        b.annotate_type(iface, SafetyLevel::Unsafe);
        let sub = b.class("Display");
        b.annotate_type(sub, SafetyLevel::Safe);
        b.add_supertype(sub, iface);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        let violation = h.check_type_decl(sub).unwrap().unwrap();
        assert_eq!(violation.computed, SafetyLevel::Safe);
        assert_eq!(violation.required, SafetyLevel::Unsafe);
        assert!(matches!(
            violation.kind,
            ViolationKind::LenientSubtype { .. }
        ));
    }

    #[test]
    fn stricter_subtype_is_allowed() {
        let mut b = ProgramBuilder::new();
        let iface = b.interface("Redacted");
        b.annotate_type(iface, SafetyLevel::DoNotLog);
        let sub = b.class("Key");
        b.annotate_type(sub, SafetyLevel::Unsafe);
        b.add_supertype(sub, iface);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert!(h.check_type_decl(sub).unwrap().is_none());
    }

    #[test]
    fn suppressed_ancestor_contributes_nothing() {
        let mut b = ProgramBuilder::new();
        let iface = b.interface("Sensitive");
        b.annotate_type(iface, SafetyLevel::Unsafe);
        b.suppress_type(iface);
        let sub = b.class("Display");
        b.annotate_type(sub, SafetyLevel::Safe);
        b.add_supertype(sub, iface);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert!(h.check_type_decl(sub).unwrap().is_none());
        assert_eq!(
            h.effective_annotation(sub).unwrap(),
            Some(SafetyLevel::Safe)
        );
    }

    #[test]
    fn container_joins_type_argument_levels() {
        let mut b = ProgramBuilder::new();
        let optional = b.class("Optional");
        let token = b.class("AuthToken");
        b.annotate_type(token, SafetyLevel::Unsafe);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        let r = TypeRef::generic(optional, vec![TypeRef::simple(token)]);
        assert_eq!(h.classify_ref(&r).unwrap(), SafetyLevel::Unsafe);
    }

    #[test]
    fn cyclic_hierarchy_terminates() {
        let mut b = ProgramBuilder::new();
        let a = b.class("A");
        let c = b.class("B");
        b.add_supertype(a, c);
        b.add_supertype(c, a);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert_eq!(h.effective_annotation(a).unwrap(), None);
        assert!(!h.is_throwable(a).unwrap());
    }

    #[test]
    fn unannotated_throwable_type_classifies_unsafe() {
        let mut b = ProgramBuilder::new();
        let throwable = b.class("Throwable");
        b.mark_throwable(throwable);
        let io = b.class("IOException");
        b.add_supertype(io, throwable);
        let annotated = b.class("SanitizedException");
        b.add_supertype(annotated, throwable);
        b.annotate_type(annotated, SafetyLevel::Safe);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert_eq!(
            h.classify_ref(&TypeRef::simple(io)).unwrap(),
            SafetyLevel::Unsafe
        );
        // An explicit annotation on the throwable's type wins.
        assert_eq!(
            h.classify_ref(&TypeRef::simple(annotated)).unwrap(),
            SafetyLevel::Safe
        );
    }

    #[test]
    fn throwable_flag_inherits() {
        let mut b = ProgramBuilder::new();
        let throwable = b.class("Throwable");
        b.mark_throwable(throwable);
        let io = b.class("IOException");
        b.add_supertype(io, throwable);
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert!(h.is_throwable(io).unwrap());
    }

    #[test]
    fn dangling_supertype_is_an_internal_error() {
        let mut b = ProgramBuilder::new();
        let a = b.class("A");
        b.add_supertype(a, TypeId(99));
        let program = b.finish();

        let h = TypeHierarchy::new(&program);
        assert_eq!(
            h.ancestor_annotation(a),
            Err(ClassifyError::UnresolvedType(TypeId(99)))
        );
    }
}
