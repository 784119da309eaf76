//! Fluent construction of program snapshots.
//!
//! Hosts translate their resolved trees through this builder; tests use
//! it to write scenarios without hand-numbering arena ids.

use crate::ir::types::{
    Body, CompilationUnit, DeclId, DeclKind, Declaration, Expr, ExprId, ExprKind, Literal,
    Location, Program, Stmt, TypeDecl, TypeId, TypeKind, TypeRef,
};
use crate::safety::SafetyLevel;

/// Incremental [`Program`] builder.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    fn push_type(&mut self, name: &str, kind: TypeKind) -> TypeId {
        let id = TypeId(self.program.types.len() as u32);
        self.program.types.push(TypeDecl {
            name: name.to_string(),
            kind,
            annotation: None,
            supertypes: Vec::new(),
            throwable: false,
            suppressed: false,
            location: Location::unknown(),
        });
        id
    }

    pub fn class(&mut self, name: &str) -> TypeId {
        self.push_type(name, TypeKind::Class)
    }

    pub fn interface(&mut self, name: &str) -> TypeId {
        self.push_type(name, TypeKind::Interface)
    }

    pub fn type_param(&mut self, name: &str) -> TypeId {
        self.push_type(name, TypeKind::TypeParam)
    }

    pub fn annotate_type(&mut self, ty: TypeId, level: SafetyLevel) {
        self.program.types[ty.0 as usize].annotation = Some(level);
    }

    pub fn add_supertype(&mut self, ty: TypeId, supertype: TypeId) {
        self.program.types[ty.0 as usize].supertypes.push(supertype);
    }

    pub fn mark_throwable(&mut self, ty: TypeId) {
        self.program.types[ty.0 as usize].throwable = true;
    }

    pub fn suppress_type(&mut self, ty: TypeId) {
        self.program.types[ty.0 as usize].suppressed = true;
    }

    pub fn type_location(&mut self, ty: TypeId, location: Location) {
        self.program.types[ty.0 as usize].location = location;
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn push_decl(
        &mut self,
        name: &str,
        kind: DeclKind,
        ty: TypeRef,
        annotation: Option<SafetyLevel>,
    ) -> DeclId {
        let id = DeclId(self.program.decls.len() as u32);
        self.program.decls.push(Declaration {
            name: name.to_string(),
            kind,
            ty,
            annotation,
            suppressed: false,
            location: Location::unknown(),
        });
        id
    }

    pub fn field(&mut self, name: &str, ty: TypeRef, annotation: Option<SafetyLevel>) -> DeclId {
        self.push_decl(name, DeclKind::Field, ty, annotation)
    }

    pub fn local(&mut self, name: &str, ty: TypeRef, annotation: Option<SafetyLevel>) -> DeclId {
        self.push_decl(name, DeclKind::Local, ty, annotation)
    }

    pub fn param(&mut self, name: &str, ty: TypeRef, annotation: Option<SafetyLevel>) -> DeclId {
        self.push_decl(name, DeclKind::Parameter, ty, annotation)
    }

    /// A method declaration. `ty` is the return type, `annotation` the
    /// declared return annotation, `body` the statement list for methods
    /// the snapshot carries bodies for.
    pub fn method(
        &mut self,
        name: &str,
        ty: TypeRef,
        annotation: Option<SafetyLevel>,
        params: Vec<DeclId>,
        body: Option<Vec<Stmt>>,
    ) -> DeclId {
        self.push_decl(
            name,
            DeclKind::Method {
                params,
                body: body.map(|stmts| Body { stmts }),
            },
            ty,
            annotation,
        )
    }

    /// Shorthand for [`ProgramBuilder::method`] with a body.
    pub fn method_with_body(
        &mut self,
        name: &str,
        ty: TypeRef,
        annotation: Option<SafetyLevel>,
        params: Vec<DeclId>,
        stmts: Vec<Stmt>,
    ) -> DeclId {
        self.method(name, ty, annotation, params, Some(stmts))
    }

    pub fn suppress(&mut self, decl: DeclId) {
        self.program.decls[decl.0 as usize].suppressed = true;
    }

    pub fn decl_location(&mut self, decl: DeclId, location: Location) {
        self.program.decls[decl.0 as usize].location = location;
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn push_expr(&mut self, kind: ExprKind, location: Location) -> ExprId {
        let id = ExprId(self.program.exprs.len() as u32);
        self.program.exprs.push(Expr { kind, location });
        id
    }

    pub fn lit_str(&mut self, value: &str, location: Location) -> ExprId {
        self.push_expr(ExprKind::Literal(Literal::Str(value.to_string())), location)
    }

    pub fn lit_int(&mut self, value: i64, location: Location) -> ExprId {
        self.push_expr(ExprKind::Literal(Literal::Int(value)), location)
    }

    pub fn reference(&mut self, decl: DeclId, location: Location) -> ExprId {
        self.push_expr(ExprKind::Ref(decl), location)
    }

    pub fn field_access(&mut self, base: ExprId, field: DeclId, location: Location) -> ExprId {
        self.push_expr(ExprKind::FieldAccess { base, field }, location)
    }

    pub fn invoke(
        &mut self,
        callee: DeclId,
        receiver: Option<ExprId>,
        args: Vec<ExprId>,
        location: Location,
    ) -> ExprId {
        self.push_expr(
            ExprKind::Invoke {
                callee,
                receiver,
                args,
            },
            location,
        )
    }

    pub fn concat(&mut self, parts: Vec<ExprId>, location: Location) -> ExprId {
        self.push_expr(ExprKind::Concat(parts), location)
    }

    pub fn collection(&mut self, elements: Vec<ExprId>, location: Location) -> ExprId {
        self.push_expr(ExprKind::Collection(elements), location)
    }

    pub fn conditional(
        &mut self,
        condition: ExprId,
        then_value: ExprId,
        else_value: ExprId,
        location: Location,
    ) -> ExprId {
        self.push_expr(
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            },
            location,
        )
    }

    pub fn array_read(&mut self, array: DeclId, index: ExprId, location: Location) -> ExprId {
        self.push_expr(ExprKind::ArrayRead { array, index }, location)
    }

    // -----------------------------------------------------------------
    // Units
    // -----------------------------------------------------------------

    pub fn unit(&mut self, name: &str, types: Vec<TypeId>, methods: Vec<DeclId>) -> usize {
        self.program.units.push(CompilationUnit {
            name: name.to_string(),
            types,
            methods,
        });
        self.program.units.len() - 1
    }

    pub fn finish(self) -> Program {
        self.program
    }
}
