//! The safety classifier and the per-unit analysis walk.
//!
//! [`Classifier`] computes a [`SafetyLevel`] for an expression by the
//! priority rules: a declaration's own annotation wins, then the
//! expression's static type (with inherited and type-argument
//! sensitivity), then the join over composite operands, then invocation
//! semantics (declared return annotation, body inference, passthrough),
//! with unannotated throwable-typed values floored at `Unsafe`.
//!
//! [`UnitAnalyzer`] drives the classifier over a compilation unit: it
//! walks every method body, checks each flow into a declared sink, and
//! tracks the monotone accumulator state of arrays and builders. All
//! violations in a unit are collected independently; one bad flow never
//! hides another.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::config::{AnalysisConfig, MissingSymbols};
use crate::error::{ClassifyError, LogsafeError, MAX_EXPR_DEPTH};
use crate::ir::{
    CompilationUnit, DeclId, Declaration, Expr, ExprId, ExprKind, Location, Program, Stmt, TypeId,
    TypeKind, TypeRef,
};
use crate::safety::hierarchy::TypeHierarchy;
use crate::safety::level::SafetyLevel;
use crate::safety::passthrough::{PassthroughKind, PassthroughRegistry};
use crate::safety::types::{Diagnostic, Sink, SinkKind, UnitReport, Violation, ViolationKind};

// =============================================================================
// Accumulator state
// =============================================================================

/// Levels tracked per declaration within one method body.
///
/// Plain locals record their last assigned level; arrays and builders
/// accumulate monotonically — once an unsafe element lands, every later
/// read of the accumulated value observes it, whatever index is read.
#[derive(Debug, Clone, Default)]
pub struct AccumState {
    levels: FxHashMap<DeclId, SafetyLevel>,
}

impl AccumState {
    pub fn level_of(&self, decl: DeclId) -> Option<SafetyLevel> {
        self.levels.get(&decl).copied()
    }

    /// Overwrite (plain assignment).
    pub fn record(&mut self, decl: DeclId, level: SafetyLevel) {
        self.levels.insert(decl, level);
    }

    /// Monotone join (array store, builder append).
    pub fn accumulate(&mut self, decl: DeclId, level: SafetyLevel) {
        let entry = self.levels.entry(decl).or_insert(SafetyLevel::Safe);
        *entry = entry.join(level);
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Pure classification over one program snapshot.
///
/// Holds no per-body state of its own; accumulator state is threaded in
/// by the caller. The only internal caches are the method-return
/// inference memo and its cycle guard.
pub struct Classifier<'a> {
    program: &'a Program,
    hierarchy: TypeHierarchy<'a>,
    registry: PassthroughRegistry,
    lenient: bool,
    return_memo: FxHashMap<DeclId, SafetyLevel>,
    in_progress: FxHashSet<DeclId>,
}

impl<'a> Classifier<'a> {
    /// Build a classifier for one snapshot. Fails only on an invalid
    /// user passthrough pattern in the config.
    pub fn new(program: &'a Program, config: &AnalysisConfig) -> Result<Self, LogsafeError> {
        let registry = PassthroughRegistry::with_patterns(&config.passthrough)
            .map_err(|err| LogsafeError::Config(format!("invalid passthrough pattern: {err}")))?;
        Ok(Self::with_registry(program, config, registry))
    }

    pub(crate) fn with_registry(
        program: &'a Program,
        config: &AnalysisConfig,
        registry: PassthroughRegistry,
    ) -> Self {
        Self {
            program,
            hierarchy: TypeHierarchy::new(program),
            registry,
            lenient: config.missing_symbols == MissingSymbols::Lenient,
            return_memo: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    /// Compute the safety level of an expression.
    pub fn classify(&mut self, expr: ExprId) -> Result<SafetyLevel, ClassifyError> {
        self.classify_in(expr, &AccumState::default(), 0)
    }

    /// Validate a flow into a sink; `None` when compatible.
    pub fn check_sink(
        &mut self,
        value: ExprId,
        sink: &Sink,
    ) -> Result<Option<Violation>, ClassifyError> {
        let computed = self.classify_in(value, &AccumState::default(), 0)?;
        if computed.flows_to(sink.required) {
            return Ok(None);
        }
        Ok(Some(Violation {
            kind: ViolationKind::SinkFlow(sink.kind.clone()),
            computed,
            required: sink.required,
            location: sink.location.clone(),
        }))
    }

    // -----------------------------------------------------------------
    // Lookups (lenient mode degrades instead of erroring)
    // -----------------------------------------------------------------

    fn lookup_decl(&self, id: DeclId) -> Result<Option<&'a Declaration>, ClassifyError> {
        match self.program.decl(id) {
            Some(decl) => Ok(Some(decl)),
            None if self.lenient => {
                warn!(%id, "unresolved declaration, assuming SAFE");
                Ok(None)
            }
            None => Err(ClassifyError::UnresolvedDecl(id)),
        }
    }

    fn lookup_expr(&self, id: ExprId) -> Result<Option<&'a Expr>, ClassifyError> {
        match self.program.expr(id) {
            Some(expr) => Ok(Some(expr)),
            None if self.lenient => {
                warn!(%id, "unresolved expression, assuming SAFE");
                Ok(None)
            }
            None => Err(ClassifyError::UnresolvedExpr(id)),
        }
    }

    fn type_level(&self, r: &TypeRef) -> Result<SafetyLevel, ClassifyError> {
        match self.hierarchy.classify_ref(r) {
            Err(err) if self.lenient => {
                warn!(%err, "unresolved type, assuming SAFE");
                Ok(SafetyLevel::Safe)
            }
            other => other,
        }
    }

    fn type_annotation(&self, ty: TypeId) -> Result<Option<SafetyLevel>, ClassifyError> {
        match self.hierarchy.effective_annotation(ty) {
            Err(err) if self.lenient => {
                warn!(%err, "unresolved type, treating as unannotated");
                Ok(None)
            }
            other => other,
        }
    }

    /// A declaration's own annotation; suppression removes it before
    /// classification begins.
    fn declared(decl: &Declaration) -> Option<SafetyLevel> {
        if decl.suppressed {
            None
        } else {
            decl.annotation
        }
    }

    // -----------------------------------------------------------------
    // Classification rules
    // -----------------------------------------------------------------

    fn classify_in(
        &mut self,
        id: ExprId,
        state: &AccumState,
        depth: usize,
    ) -> Result<SafetyLevel, ClassifyError> {
        let Some(expr) = self.lookup_expr(id)? else {
            return Ok(SafetyLevel::Safe);
        };
        if depth > MAX_EXPR_DEPTH {
            return Err(ClassifyError::TooDeep(expr.location.clone()));
        }
        match &expr.kind {
            ExprKind::Literal(_) => Ok(SafetyLevel::Safe),
            ExprKind::Ref(decl) => self.classify_decl_read(*decl, state),
            ExprKind::FieldAccess { base, field } => {
                let base_level = self.classify_in(*base, state, depth + 1)?;
                let Some(decl) = self.lookup_decl(*field)? else {
                    return Ok(base_level);
                };
                if let Some(annotated) = Self::declared(decl) {
                    return Ok(annotated);
                }
                // Field chains are composites: the base's level carries.
                Ok(self.type_level(&decl.ty)?.join(base_level))
            }
            ExprKind::Invoke {
                callee,
                receiver,
                args,
            } => self.classify_invoke(*callee, *receiver, args, state, depth),
            ExprKind::Concat(parts) | ExprKind::Collection(parts) => {
                let mut level = SafetyLevel::Safe;
                for &part in parts {
                    level = level.join(self.classify_in(part, state, depth + 1)?);
                }
                Ok(level)
            }
            ExprKind::Conditional {
                then_value,
                else_value,
                ..
            } => {
                let a = self.classify_in(*then_value, state, depth + 1)?;
                let b = self.classify_in(*else_value, state, depth + 1)?;
                Ok(a.join(b))
            }
            ExprKind::ArrayRead { array, .. } => self.classify_decl_read(*array, state),
        }
    }

    fn classify_decl_read(
        &self,
        id: DeclId,
        state: &AccumState,
    ) -> Result<SafetyLevel, ClassifyError> {
        let Some(decl) = self.lookup_decl(id)? else {
            return Ok(SafetyLevel::Safe);
        };
        if let Some(annotated) = Self::declared(decl) {
            return Ok(annotated);
        }
        let mut level = self.type_level(&decl.ty)?;
        if let Some(tracked) = state.level_of(id) {
            level = level.join(tracked);
        }
        Ok(level)
    }

    fn classify_invoke(
        &mut self,
        callee: DeclId,
        receiver: Option<ExprId>,
        args: &[ExprId],
        state: &AccumState,
        depth: usize,
    ) -> Result<SafetyLevel, ClassifyError> {
        let Some(method) = self.lookup_decl(callee)? else {
            return Ok(SafetyLevel::Safe);
        };
        if let Some(annotated) = Self::declared(method) {
            return Ok(annotated);
        }
        let return_ty_level = self.type_level(&method.ty)?;
        if return_ty_level > SafetyLevel::Safe {
            return Ok(return_ty_level);
        }
        if method.body().is_some() {
            return self.infer_method_return(callee, method, depth);
        }
        if self.registry.lookup(&method.name).is_some() {
            // Well-known passthrough: join receiver and argument levels.
            let mut level = SafetyLevel::Safe;
            if let Some(r) = receiver {
                level = level.join(self.classify_in(r, state, depth + 1)?);
            }
            for &arg in args {
                level = level.join(self.classify_in(arg, state, depth + 1)?);
            }
            return Ok(level);
        }
        Ok(SafetyLevel::Safe)
    }

    /// Infer a method's return level from its body, with a cycle guard
    /// and a memo. Recursion cuts the cycle at `Safe`; the join over
    /// the remaining return expressions still applies.
    fn infer_method_return(
        &mut self,
        id: DeclId,
        method: &'a Declaration,
        depth: usize,
    ) -> Result<SafetyLevel, ClassifyError> {
        if let Some(&cached) = self.return_memo.get(&id) {
            return Ok(cached);
        }
        if !self.in_progress.insert(id) {
            trace!(method = %method.name, "recursive return inference, cutting cycle at SAFE");
            return Ok(SafetyLevel::Safe);
        }
        let result = self.infer_method_return_inner(method, depth);
        self.in_progress.remove(&id);
        if let Ok(level) = result {
            self.return_memo.insert(id, level);
            trace!(method = %method.name, %level, "inferred return level");
        }
        result
    }

    fn infer_method_return_inner(
        &mut self,
        method: &'a Declaration,
        depth: usize,
    ) -> Result<SafetyLevel, ClassifyError> {
        let Some(body) = method.body() else {
            return Ok(SafetyLevel::Safe);
        };
        let mut callee_state = AccumState::default();
        let mut level = SafetyLevel::Safe;
        for stmt in &body.stmts {
            if let Stmt::Return { value: Some(v) } = stmt {
                level = level.join(self.classify_in(*v, &callee_state, depth + 1)?);
            }
            self.advance_state(stmt, &mut callee_state, depth + 1)?;
        }
        Ok(level)
    }

    // -----------------------------------------------------------------
    // Statement-level state transitions
    // -----------------------------------------------------------------

    /// Fold one statement into the body state: record plain
    /// assignments, accumulate array stores, and pick up builder
    /// appends anywhere in the statement's expressions.
    pub(crate) fn advance_state(
        &mut self,
        stmt: &Stmt,
        state: &mut AccumState,
        depth: usize,
    ) -> Result<(), ClassifyError> {
        match stmt {
            Stmt::Local { decl, init } => {
                if let Some(value) = init {
                    let level = self.classify_in(*value, state, depth)?;
                    self.apply_accumulation(*value, state, depth)?;
                    state.record(*decl, level);
                }
            }
            Stmt::Assign { target, value } => {
                let level = self.classify_in(*value, state, depth)?;
                self.apply_accumulation(*value, state, depth)?;
                state.record(*target, level);
            }
            Stmt::ArrayStore {
                array,
                index,
                value,
            } => {
                let level = self.classify_in(*value, state, depth)?;
                self.apply_accumulation(*index, state, depth)?;
                self.apply_accumulation(*value, state, depth)?;
                state.accumulate(*array, level);
            }
            Stmt::Expr(expr) => self.apply_accumulation(*expr, state, depth)?,
            Stmt::Return { value: Some(v) } => self.apply_accumulation(*v, state, depth)?,
            Stmt::Return { value: None } => {}
        }
        Ok(())
    }

    /// Find accumulating invocations (builder `append`, collection
    /// `add`) in an expression tree and join their argument levels into
    /// the receiver's tracked state.
    fn apply_accumulation(
        &mut self,
        id: ExprId,
        state: &mut AccumState,
        depth: usize,
    ) -> Result<(), ClassifyError> {
        let Some(expr) = self.lookup_expr(id)? else {
            return Ok(());
        };
        if depth > MAX_EXPR_DEPTH {
            return Err(ClassifyError::TooDeep(expr.location.clone()));
        }
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Ref(_) => {}
            ExprKind::FieldAccess { base, .. } => {
                self.apply_accumulation(*base, state, depth + 1)?;
            }
            ExprKind::Concat(parts) | ExprKind::Collection(parts) => {
                for &part in parts {
                    self.apply_accumulation(part, state, depth + 1)?;
                }
            }
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.apply_accumulation(*condition, state, depth + 1)?;
                self.apply_accumulation(*then_value, state, depth + 1)?;
                self.apply_accumulation(*else_value, state, depth + 1)?;
            }
            ExprKind::ArrayRead { index, .. } => {
                self.apply_accumulation(*index, state, depth + 1)?;
            }
            ExprKind::Invoke {
                callee,
                receiver,
                args,
            } => {
                if let Some(r) = *receiver {
                    self.apply_accumulation(r, state, depth + 1)?;
                }
                for &arg in args {
                    self.apply_accumulation(arg, state, depth + 1)?;
                }
                let Some(method) = self.lookup_decl(*callee)? else {
                    return Ok(());
                };
                let accumulates = method.body().is_none()
                    && matches!(
                        self.registry.lookup(&method.name),
                        Some(PassthroughKind::Accumulate)
                    );
                if accumulates {
                    if let Some(r) = *receiver {
                        if let Some(target) = self.accumulation_target(r, depth + 1)? {
                            let mut level = SafetyLevel::Safe;
                            for &arg in args {
                                level = level.join(self.classify_in(arg, state, depth + 1)?);
                            }
                            trace!(method = %method.name, %target, %level, "accumulating");
                            state.accumulate(target, level);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve the declaration an accumulating call writes into,
    /// following chained passthrough calls to the chain root
    /// (`sb.append(a).append(b)` accumulates into `sb`).
    fn accumulation_target(
        &self,
        id: ExprId,
        depth: usize,
    ) -> Result<Option<DeclId>, ClassifyError> {
        if depth > MAX_EXPR_DEPTH {
            return Ok(None);
        }
        let Some(expr) = self.lookup_expr(id)? else {
            return Ok(None);
        };
        match &expr.kind {
            ExprKind::Ref(decl) => Ok(Some(*decl)),
            ExprKind::FieldAccess { field, .. } => Ok(Some(*field)),
            ExprKind::Invoke {
                callee,
                receiver: Some(r),
                ..
            } => {
                let Some(method) = self.lookup_decl(*callee)? else {
                    return Ok(None);
                };
                if self.registry.lookup(&method.name).is_some() {
                    self.accumulation_target(*r, depth + 1)
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }
}

// =============================================================================
// Per-unit analysis
// =============================================================================

/// Requirement a sink declaration imposes on incoming values.
struct SinkReq {
    required: SafetyLevel,
    name: String,
    /// Set when the requirement comes from an annotated type parameter.
    type_param: Option<String>,
}

/// Walks one compilation unit, collecting violations and diagnostics.
pub(crate) struct UnitAnalyzer<'a> {
    classifier: Classifier<'a>,
    report: UnitReport,
    cap: Option<usize>,
}

impl<'a> UnitAnalyzer<'a> {
    pub fn new(classifier: Classifier<'a>, unit_name: &str, cap: Option<usize>) -> Self {
        Self {
            classifier,
            report: UnitReport::new(unit_name),
            cap,
        }
    }

    pub fn run(mut self, unit: &CompilationUnit) -> UnitReport {
        debug!(unit = %unit.name, "analyzing unit");
        if let Err(err) = self.try_run(unit) {
            // Strict mode: the unit's pass fails as a whole. Other
            // units are unaffected.
            warn!(unit = %unit.name, %err, "analysis pass failed");
            self.report.violations.clear();
            self.report.diagnostics.push(Diagnostic::internal(&err));
            self.report.failed = true;
        }
        self.report
    }

    fn try_run(&mut self, unit: &CompilationUnit) -> Result<(), ClassifyError> {
        for &ty in &unit.types {
            match self.classifier.hierarchy.check_type_decl(ty) {
                Ok(Some(violation)) => self.push_violation(violation),
                Ok(None) => {}
                Err(err) if self.classifier.lenient => {
                    warn!(%err, "skipping declaration check for unresolved type");
                }
                Err(err) => return Err(err),
            }
        }
        for &method in &unit.methods {
            self.walk_method(method)?;
        }
        Ok(())
    }

    fn walk_method(&mut self, id: DeclId) -> Result<(), ClassifyError> {
        let Some(method) = self.classifier.lookup_decl(id)? else {
            return Ok(());
        };
        if method.suppressed {
            return Ok(());
        }
        let Some(body) = method.body() else {
            return Ok(());
        };
        trace!(method = %method.name, "walking body");
        let mut state = AccumState::default();
        for stmt in &body.stmts {
            self.walk_stmt(method, stmt, &mut state)?;
        }
        Ok(())
    }

    fn walk_stmt(
        &mut self,
        method: &'a Declaration,
        stmt: &'a Stmt,
        state: &mut AccumState,
    ) -> Result<(), ClassifyError> {
        match stmt {
            Stmt::Local { decl, init } => {
                if let Some(value) = init {
                    self.walk_expr(*value, state, 0)?;
                    self.check_assignment(*decl, *value, state)?;
                }
            }
            Stmt::Assign { target, value } => {
                self.walk_expr(*value, state, 0)?;
                self.check_assignment(*target, *value, state)?;
            }
            Stmt::ArrayStore {
                array,
                index,
                value,
            } => {
                self.walk_expr(*index, state, 0)?;
                self.walk_expr(*value, state, 0)?;
                if let Some(req) = self.sink_requirement(*array)? {
                    let kind = SinkKind::ArrayStore { array: req.name };
                    self.check_flow(*value, req.required, kind, state)?;
                }
            }
            Stmt::Expr(expr) => self.walk_expr(*expr, state, 0)?,
            Stmt::Return { value } => {
                if let Some(v) = value {
                    self.walk_expr(*v, state, 0)?;
                    if let Some(required) = self.return_requirement(method)? {
                        let kind = SinkKind::Return {
                            method: method.name.clone(),
                        };
                        self.check_flow(*v, required, kind, state)?;
                    }
                }
            }
        }
        self.classifier.advance_state(stmt, state, 0)
    }

    /// Sink checks over one expression tree: every argument bound to an
    /// annotated parameter (or to an annotated type parameter) is a
    /// flow to validate.
    fn walk_expr(
        &mut self,
        id: ExprId,
        state: &mut AccumState,
        depth: usize,
    ) -> Result<(), ClassifyError> {
        let Some(expr) = self.classifier.lookup_expr(id)? else {
            return Ok(());
        };
        if depth > MAX_EXPR_DEPTH {
            return Err(ClassifyError::TooDeep(expr.location.clone()));
        }
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Ref(_) => {}
            ExprKind::FieldAccess { base, .. } => self.walk_expr(*base, state, depth + 1)?,
            ExprKind::Concat(parts) | ExprKind::Collection(parts) => {
                for &part in parts {
                    self.walk_expr(part, state, depth + 1)?;
                }
            }
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.walk_expr(*condition, state, depth + 1)?;
                self.walk_expr(*then_value, state, depth + 1)?;
                self.walk_expr(*else_value, state, depth + 1)?;
            }
            ExprKind::ArrayRead { index, .. } => self.walk_expr(*index, state, depth + 1)?,
            ExprKind::Invoke {
                callee,
                receiver,
                args,
            } => {
                if let Some(r) = receiver {
                    self.walk_expr(*r, state, depth + 1)?;
                }
                for &arg in args {
                    self.walk_expr(arg, state, depth + 1)?;
                }
                let Some(method) = self.classifier.lookup_decl(*callee)? else {
                    return Ok(());
                };
                let params = method.params();
                for (position, &arg) in args.iter().enumerate() {
                    let Some(&param_id) = params.get(position) else {
                        break;
                    };
                    let Some(req) = self.sink_requirement(param_id)? else {
                        continue;
                    };
                    let kind = match req.type_param {
                        Some(type_param) => SinkKind::TypeParamBinding {
                            method: method.name.clone(),
                            parameter: req.name,
                            type_param,
                        },
                        None => SinkKind::Argument {
                            method: method.name.clone(),
                            parameter: req.name,
                        },
                    };
                    self.check_flow(arg, req.required, kind, state)?;
                }
            }
        }
        Ok(())
    }

    fn check_assignment(
        &mut self,
        target: DeclId,
        value: ExprId,
        state: &AccumState,
    ) -> Result<(), ClassifyError> {
        if let Some(req) = self.sink_requirement(target)? {
            let kind = SinkKind::Assignment { target: req.name };
            self.check_flow(value, req.required, kind, state)?;
        }
        Ok(())
    }

    /// The tolerance a declaration imposes as a sink: its own
    /// annotation, else its type's effective annotation. Unannotated
    /// sinks accept anything; suppressed sinks are not checked.
    fn sink_requirement(&self, decl_id: DeclId) -> Result<Option<SinkReq>, ClassifyError> {
        let Some(decl) = self.classifier.lookup_decl(decl_id)? else {
            return Ok(None);
        };
        if decl.suppressed {
            return Ok(None);
        }
        if let Some(required) = decl.annotation {
            return Ok(Some(SinkReq {
                required,
                name: decl.name.clone(),
                type_param: None,
            }));
        }
        let Some(required) = self.classifier.type_annotation(decl.ty.ty)? else {
            return Ok(None);
        };
        let type_param = match self.classifier.program.type_decl(decl.ty.ty) {
            Some(t) if t.kind == TypeKind::TypeParam => Some(t.name.clone()),
            _ => None,
        };
        Ok(Some(SinkReq {
            required,
            name: decl.name.clone(),
            type_param,
        }))
    }

    /// Declared return tolerance of the enclosing method, if any.
    fn return_requirement(
        &self,
        method: &Declaration,
    ) -> Result<Option<SafetyLevel>, ClassifyError> {
        if let Some(required) = method.annotation {
            return Ok(Some(required));
        }
        self.classifier.type_annotation(method.ty.ty)
    }

    fn check_flow(
        &mut self,
        value: ExprId,
        required: SafetyLevel,
        kind: SinkKind,
        state: &AccumState,
    ) -> Result<(), ClassifyError> {
        let computed = self.classifier.classify_in(value, state, 0)?;
        if computed.flows_to(required) {
            return Ok(());
        }
        let location = match self.classifier.lookup_expr(value)? {
            Some(expr) => expr.location.clone(),
            None => Location::unknown(),
        };
        self.push_violation(Violation {
            kind: ViolationKind::SinkFlow(kind),
            computed,
            required,
            location,
        });
        Ok(())
    }

    fn push_violation(&mut self, violation: Violation) {
        if let Some(cap) = self.cap {
            if self.report.violations.len() >= cap {
                self.report.truncated = true;
                return;
            }
        }
        trace!(%violation, "violation");
        self.report.violations.push(violation);
    }
}
