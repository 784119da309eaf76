//! Resolved program representation consumed by the classifier.
//!
//! A [`Program`] is an immutable snapshot of everything the classifier
//! needs: the type table (with supertype edges and safety annotations),
//! the declaration table (fields, locals, parameters, methods), an
//! expression arena, and the compilation units to analyze. A host
//! compiler produces the snapshot from its own trees; tests and the CLI
//! produce it with [`ProgramBuilder`] or deserialize it from JSON.
//!
//! Everything is id-keyed ([`TypeId`], [`DeclId`], [`ExprId`]) so the
//! snapshot serializes flat and the classifier never chases references.
//! The snapshot is never mutated during analysis.

pub mod builder;
pub mod types;

pub use builder::ProgramBuilder;
pub use types::{
    Body, CompilationUnit, DeclId, DeclKind, Declaration, Expr, ExprId, ExprKind, Literal,
    Location, Program, Stmt, TypeDecl, TypeId, TypeKind, TypeRef,
};
