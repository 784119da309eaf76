//! Core snapshot types: locations, ids, types, declarations, expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::safety::SafetyLevel;

// =============================================================================
// Location
// =============================================================================

/// A source code location with file, line, and column information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path (relative or absolute)
    pub file: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Location {
    /// Create a new location.
    #[inline]
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Create an unknown/synthetic location.
    #[inline]
    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// =============================================================================
// Ids
// =============================================================================

/// Index into [`Program::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

/// Index into [`Program::decls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

/// Index into [`Program::exprs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expr#{}", self.0)
    }
}

// =============================================================================
// Types
// =============================================================================

/// What kind of type a [`TypeDecl`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    /// A generic type parameter. An annotated type parameter propagates
    /// its level to every expression typed by it and turns its binding
    /// sites into sinks.
    TypeParam,
}

/// A named type with its safety annotation and supertype edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// Declared safety annotation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SafetyLevel>,
    /// Direct supertypes and implemented interfaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<TypeId>,
    /// Whether this type is the throwable root or derives from it.
    /// Values of such types classify at least `Unsafe` unless the type
    /// is explicitly annotated otherwise.
    #[serde(default)]
    pub throwable: bool,
    /// Suppressed declarations contribute no annotation and are skipped
    /// by declaration-site checks.
    #[serde(default)]
    pub suppressed: bool,
    /// Declaration site, for declaration-level violations.
    #[serde(default = "Location::unknown")]
    pub location: Location,
}

/// A type reference: a type plus its type arguments.
///
/// `Optional<AuthToken>` is `TypeRef { ty: optional, args: [TypeRef of
/// AuthToken] }`. The classifier folds type-argument sensitivity into the
/// container, so a collection of unsafe elements is itself unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub ty: TypeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    /// A reference without type arguments.
    #[inline]
    pub fn simple(ty: TypeId) -> Self {
        Self { ty, args: Vec::new() }
    }

    /// A reference with type arguments.
    #[inline]
    pub fn generic(ty: TypeId, args: Vec<TypeRef>) -> Self {
        Self { ty, args }
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// What kind of value entity a [`Declaration`] is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Field,
    Local,
    Parameter,
    Method {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<DeclId>,
        /// Absent for library methods the snapshot does not carry bodies
        /// for; the classifier then falls back to the passthrough
        /// registry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Body>,
    },
}

/// A named value entity: field, local, parameter, or method.
///
/// For methods, `ty` is the return type and `annotation` the declared
/// return annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SafetyLevel>,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default = "Location::unknown")]
    pub location: Location,
}

impl Declaration {
    /// Parameter list for methods, empty otherwise.
    pub fn params(&self) -> &[DeclId] {
        match &self.kind {
            DeclKind::Method { params, .. } => params,
            _ => &[],
        }
    }

    /// Method body, if this is a method that carries one.
    pub fn body(&self) -> Option<&Body> {
        match &self.kind {
            DeclKind::Method { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// A method body: a flat statement list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub stmts: Vec<Stmt>,
}

// =============================================================================
// Expressions
// =============================================================================

/// Literal values. Primitives carry no safety of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    Null,
}

/// An expression node in the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

/// Expression forms the classifier understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Literal(Literal),
    /// Reference to a declaration (field, local, parameter).
    Ref(DeclId),
    /// Field access on a base expression (`base.field`).
    FieldAccess { base: ExprId, field: DeclId },
    /// Method or constructor invocation.
    Invoke {
        callee: DeclId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receiver: Option<ExprId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<ExprId>,
    },
    /// String concatenation.
    Concat(Vec<ExprId>),
    /// Collection construction from element expressions.
    Collection(Vec<ExprId>),
    /// Ternary conditional; classifies as the join of both branches.
    Conditional {
        condition: ExprId,
        then_value: ExprId,
        else_value: ExprId,
    },
    /// Read of an array element (`array[index]`).
    ArrayRead { array: DeclId, index: ExprId },
}

// =============================================================================
// Statements
// =============================================================================

/// Statements of a method body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Local declaration with optional initializer.
    Local {
        decl: DeclId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<ExprId>,
    },
    /// Assignment to a declared target.
    Assign { target: DeclId, value: ExprId },
    /// Array element store (`array[index] = value`). The array's
    /// classification joins the element level for the rest of the body.
    ArrayStore {
        array: DeclId,
        index: ExprId,
        value: ExprId,
    },
    /// Bare expression statement.
    Expr(ExprId),
    /// Return from the enclosing method.
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ExprId>,
    },
}

// =============================================================================
// Program
// =============================================================================

/// A compilation unit: the type declarations to check and the method
/// bodies to analyze. Units are independent of one another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<DeclId>,
}

/// The full resolved snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub decls: Vec<Declaration>,
    #[serde(default)]
    pub exprs: Vec<Expr>,
    #[serde(default)]
    pub units: Vec<CompilationUnit>,
}

impl Program {
    /// Look up a type declaration.
    #[inline]
    pub fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.0 as usize)
    }

    /// Look up a declaration.
    #[inline]
    pub fn decl(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    /// Look up an expression.
    #[inline]
    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.0 as usize)
    }
}
