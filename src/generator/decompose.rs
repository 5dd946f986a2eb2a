//! Control-flow decomposition
//!
//! Lowers a function body into a [`GeneratorDescriptor`]. Every suspension
//! point ends a segment, so the segment boundaries are exactly the places a
//! generator can be resumed from. Structured statements turn into small
//! segment graphs:
//!
//! ```text
//! while test: body          for x in it: body
//!
//!   [..] ─▶ [test?]◀─┐        [.. $iter = iter(it)] ─▶ [next x]◀─┐
//!            │  │    │                                   │  │    │
//!        exit│  └▶[body]                             exit│  └▶[body]
//!            ▼                                           ▼
//! ```
//!
//! A `try` statement registers an exception scope covering the segments of its
//! body. With a `finally` clause, a second scope covers body, handlers and
//! `else`; every way out of that region (falling off the end, `break`,
//! `continue`, `return`, an exception) goes through the finalizer segment,
//! which finishes with [`Terminator::EndFinally`].

use super::descriptor::{
    CodeKind, GeneratorDescriptor, Instr, Op, Segment, SegmentId, SlotTable, Terminator,
};
use super::errors::DecomposeError;
use super::ir::{self, SlotId, Target};
use super::scope::{Handler, ScopeId, ScopeTable};
use crate::parser::ast::{self, BinOp, ExceptHandler, FunctionDef, Program, SourceLocation, Stmt};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use tracing::debug;

/// Name given to the descriptor of top-level code
pub const MODULE_NAME: &str = "<module>";

/// Compile a `def` into a descriptor
pub fn decompose_function(def: &FunctionDef) -> Result<Rc<GeneratorDescriptor>, DecomposeError> {
    let kind = if def.is_generator() {
        CodeKind::Generator
    } else {
        CodeKind::Function
    };

    let mut builder = Builder::new(&def.name, kind, def.location);
    for param in &def.params {
        builder.slots.intern(param);
        builder.locals.insert(param.clone());
    }
    collect_locals(&def.body, &mut builder.locals);

    builder.lower_block(&def.body)?;
    builder.finish(def.params.len())
}

/// Compile top-level statements into a descriptor whose names are all global
pub fn decompose_module(program: &Program) -> Result<Rc<GeneratorDescriptor>, DecomposeError> {
    let mut builder = Builder::new(MODULE_NAME, CodeKind::Module, SourceLocation::new(1, 1));
    builder.lower_block(&program.body)?;
    builder.finish(0)
}

/// Names a function body binds, not looking into nested `def`s
fn collect_locals(body: &[Stmt], locals: &mut FxHashSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => {
                locals.insert(def.name.clone());
            }
            Stmt::Assign { target, .. } | Stmt::AugAssign { target, .. } => {
                locals.insert(target.clone());
            }
            Stmt::For {
                target,
                body,
                orelse,
                ..
            } => {
                locals.insert(target.clone());
                collect_locals(body, locals);
                collect_locals(orelse, locals);
            }
            Stmt::If { body, orelse, .. } | Stmt::While { body, orelse, .. } => {
                collect_locals(body, locals);
                collect_locals(orelse, locals);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                collect_locals(body, locals);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        locals.insert(name.clone());
                    }
                    collect_locals(&handler.body, locals);
                }
                collect_locals(orelse, locals);
                collect_locals(finalbody, locals);
            }
            Stmt::Expr { .. }
            | Stmt::Return { .. }
            | Stmt::Raise { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::Pass { .. } => {}
        }
    }
}

/// Where `break` and `continue` go for the innermost loop
struct LoopContext {
    break_to: SegmentId,
    continue_to: SegmentId,
    /// Finalizers open when the loop started; only deeper ones run on `break`
    finally_depth: usize,
}

/// Segment-building state for one descriptor
pub(super) struct Builder {
    pub(super) name: Rc<str>,
    pub(super) kind: CodeKind,
    pub(super) slots: SlotTable,
    pub(super) locals: FxHashSet<String>,
    segments: Vec<Option<Segment>>,
    current: Option<SegmentId>,
    instrs: Vec<Instr>,
    scopes: ScopeTable,
    /// Scopes enclosing the code being lowered, innermost last
    scope_stack: Vec<ScopeId>,
    /// The subset of `scope_stack` that owns a finalizer
    finally_stack: Vec<ScopeId>,
    loops: Vec<LoopContext>,
    /// Caught-exception slots of the handlers being lowered, for bare `raise`
    handler_stack: Vec<SlotId>,
    temp_count: usize,
    pub(super) location: SourceLocation,
    def_location: SourceLocation,
}

impl Builder {
    fn new(name: &str, kind: CodeKind, location: SourceLocation) -> Self {
        let mut builder = Builder {
            name: Rc::from(name),
            kind,
            slots: SlotTable::new(),
            locals: FxHashSet::default(),
            segments: Vec::new(),
            current: None,
            instrs: Vec::new(),
            scopes: ScopeTable::new(),
            scope_stack: Vec::new(),
            finally_stack: Vec::new(),
            loops: Vec::new(),
            handler_stack: Vec::new(),
            temp_count: 0,
            location,
            def_location: location,
        };
        let entry = builder.new_segment();
        builder.current = Some(entry);
        builder
    }

    fn finish(mut self, param_count: usize) -> Result<Rc<GeneratorDescriptor>, DecomposeError> {
        self.finish_with(Terminator::Return {
            value: None,
            through: Vec::new(),
        });

        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(id, segment)| {
                segment.ok_or_else(|| {
                    DecomposeError::internal(format!("segment {} was never terminated", id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut scopes = self.scopes;
        scopes.seal(segments.len());

        let descriptor = GeneratorDescriptor {
            name: self.name,
            kind: self.kind,
            param_count,
            slots: self.slots,
            segments,
            scopes,
            entry: 0,
            location: self.def_location,
        };
        descriptor.validate()?;

        debug!(
            name = %descriptor.name,
            kind = ?descriptor.kind,
            segments = descriptor.segments.len(),
            suspension_points = descriptor.suspension_points(),
            scopes = descriptor.scopes.len(),
            slots = descriptor.slots.len(),
            "decomposed"
        );
        Ok(Rc::new(descriptor))
    }

    // ----- segment plumbing -----

    pub(super) fn new_segment(&mut self) -> SegmentId {
        self.segments.push(None);
        self.segments.len() - 1
    }

    /// Continue lowering in `id`, falling through from the current segment
    pub(super) fn switch_to(&mut self, id: SegmentId) {
        self.finish_with(Terminator::Jump(id));
        self.current = Some(id);
    }

    /// Close the current segment, opening an unreachable one first if needed
    pub(super) fn terminate(&mut self, terminator: Terminator) {
        if self.current.is_none() {
            let dead = self.new_segment();
            self.current = Some(dead);
        }
        self.finish_with(terminator);
    }

    /// Close the current segment if control can still reach its end
    fn finish_with(&mut self, terminator: Terminator) {
        if let Some(id) = self.current.take() {
            self.segments[id] = Some(Segment {
                instrs: std::mem::take(&mut self.instrs),
                terminator,
                location: self.location,
            });
        }
    }

    pub(super) fn emit(&mut self, op: Op) {
        if self.current.is_none() {
            let dead = self.new_segment();
            self.current = Some(dead);
        }
        self.instrs.push(Instr {
            op,
            location: self.location,
        });
    }

    fn is_live(&self) -> bool {
        self.current.is_some()
    }

    // ----- names -----

    pub(super) fn fresh_temp(&mut self, prefix: &str) -> Target {
        let name = format!("${}{}", prefix, self.temp_count);
        self.temp_count += 1;
        let slot = self.slots.intern(&name);
        Target::Local {
            slot,
            name: Rc::from(name),
        }
    }

    pub(super) fn resolve(&mut self, name: &str) -> Target {
        if self.kind != CodeKind::Module && self.locals.contains(name) {
            let slot = self.slots.intern(name);
            Target::Local {
                slot,
                name: self.slots.name(slot).clone(),
            }
        } else {
            Target::Global(Rc::from(name))
        }
    }

    /// Finalizers between the current point and the loop or function exit, innermost first
    fn finalizers_above(&self, depth: usize) -> Vec<ScopeId> {
        self.finally_stack[depth..].iter().rev().copied().collect()
    }

    fn leave_to(&mut self, target: SegmentId, depth: usize) {
        let through = self.finalizers_above(depth);
        let terminator = if through.is_empty() {
            Terminator::Jump(target)
        } else {
            Terminator::Leave { target, through }
        };
        self.terminate(terminator);
    }

    // ----- statements -----

    pub(super) fn lower_block(&mut self, body: &[Stmt]) -> Result<(), DecomposeError> {
        for stmt in body {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Stmt) -> Result<(), DecomposeError> {
        self.location = stmt.location();

        match stmt {
            Stmt::FunctionDef(def) => {
                let descriptor = decompose_function(def)?;
                let target = self.resolve(&def.name);
                self.emit(Op::DefineFunction { target, descriptor });
            }
            Stmt::Assign { target, value, .. } => {
                let value = self.lower_expr(value)?;
                let target = self.resolve(target);
                self.emit(Op::Store { target, value });
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => self.lower_aug_assign(target, *op, value)?,
            Stmt::Expr { expr, .. } => self.lower_expr_statement(expr)?,
            Stmt::Return { value, location } => {
                if self.kind == CodeKind::Module {
                    return Err(DecomposeError::OutsideFunction {
                        keyword: "return",
                        location: *location,
                    });
                }
                let value = match value {
                    Some(expr) => Some(self.lower_expr(expr)?),
                    None => None,
                };
                let through = self.finalizers_above(0);
                self.terminate(Terminator::Return { value, through });
            }
            Stmt::If {
                test, body, orelse, ..
            } => self.lower_if(test, body, orelse)?,
            Stmt::While {
                test, body, orelse, ..
            } => self.lower_while(test, body, orelse)?,
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => self.lower_for(target, iter, body, orelse)?,
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => self.lower_try(body, handlers, orelse, finalbody)?,
            Stmt::Raise { exc, .. } => {
                let op = match exc {
                    Some(expr) => Op::Raise(Some(self.lower_expr(expr)?)),
                    None => match self.handler_stack.last() {
                        Some(&slot) => Op::Reraise(slot),
                        None => Op::Raise(None),
                    },
                };
                self.emit(op);
            }
            Stmt::Break { location } => {
                let Some(ctx) = self.loops.last() else {
                    return Err(DecomposeError::OutsideLoop {
                        keyword: "break",
                        location: *location,
                    });
                };
                let (target, depth) = (ctx.break_to, ctx.finally_depth);
                self.leave_to(target, depth);
            }
            Stmt::Continue { location } => {
                let Some(ctx) = self.loops.last() else {
                    return Err(DecomposeError::OutsideLoop {
                        keyword: "continue",
                        location: *location,
                    });
                };
                let (target, depth) = (ctx.continue_to, ctx.finally_depth);
                self.leave_to(target, depth);
            }
            Stmt::Pass { .. } => {}
        }
        Ok(())
    }

    fn lower_aug_assign(
        &mut self,
        name: &str,
        op: BinOp,
        value: &ast::Expr,
    ) -> Result<(), DecomposeError> {
        let target = self.resolve(name);
        let current = if value.contains_yield() {
            // the target is read before the operand suspends
            let saved = self.fresh_temp("t");
            self.emit(Op::Store {
                target: saved.clone(),
                value: ir::Expr::load(&target),
            });
            ir::Expr::load(&saved)
        } else {
            ir::Expr::load(&target)
        };
        let value = self.lower_expr(value)?;
        self.emit(Op::Store {
            target,
            value: ir::Expr::Binary {
                op,
                left: Box::new(current),
                right: Box::new(value),
            },
        });
        Ok(())
    }

    fn lower_expr_statement(&mut self, expr: &ast::Expr) -> Result<(), DecomposeError> {
        match expr {
            ast::Expr::Yield { value, location } => {
                self.lower_yield(value.as_deref(), *location, false)?;
            }
            _ => {
                let value = self.lower_expr(expr)?;
                self.emit(Op::Eval(value));
            }
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        test: &ast::Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), DecomposeError> {
        let test = self.lower_expr(test)?;
        let then = self.new_segment();
        let otherwise = if orelse.is_empty() {
            None
        } else {
            Some(self.new_segment())
        };
        let join = self.new_segment();

        self.terminate(Terminator::Branch {
            test,
            then,
            otherwise: otherwise.unwrap_or(join),
        });

        self.current = Some(then);
        self.lower_block(body)?;
        self.finish_with(Terminator::Jump(join));

        if let Some(otherwise) = otherwise {
            self.current = Some(otherwise);
            self.lower_block(orelse)?;
            self.finish_with(Terminator::Jump(join));
        }

        self.current = Some(join);
        Ok(())
    }

    fn lower_while(
        &mut self,
        test: &ast::Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), DecomposeError> {
        let head = self.new_segment();
        self.switch_to(head);

        let test = self.lower_expr(test)?;
        let body_start = self.new_segment();
        let otherwise = if orelse.is_empty() {
            None
        } else {
            Some(self.new_segment())
        };
        let exit = self.new_segment();

        self.terminate(Terminator::Branch {
            test,
            then: body_start,
            otherwise: otherwise.unwrap_or(exit),
        });

        self.lower_loop_body(body, head, exit, body_start)?;
        self.lower_loop_else(orelse, otherwise, exit)
    }

    fn lower_for(
        &mut self,
        name: &str,
        iterable: &ast::Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> Result<(), DecomposeError> {
        let iterable = self.lower_expr(iterable)?;
        let Target::Local { slot, .. } = self.fresh_temp("iter") else {
            return Err(DecomposeError::internal("iterator temp is not a slot"));
        };
        self.emit(Op::GetIter { slot, iterable });

        let head = self.new_segment();
        let body_start = self.new_segment();
        let otherwise = if orelse.is_empty() {
            None
        } else {
            Some(self.new_segment())
        };
        let exit = self.new_segment();

        self.switch_to(head);
        let target = self.resolve(name);
        self.terminate(Terminator::ForNext {
            iterator: slot,
            target,
            body: body_start,
            exit: otherwise.unwrap_or(exit),
        });

        self.lower_loop_body(body, head, exit, body_start)?;
        self.lower_loop_else(orelse, otherwise, exit)
    }

    fn lower_loop_body(
        &mut self,
        body: &[Stmt],
        head: SegmentId,
        exit: SegmentId,
        start: SegmentId,
    ) -> Result<(), DecomposeError> {
        self.loops.push(LoopContext {
            break_to: exit,
            continue_to: head,
            finally_depth: self.finally_stack.len(),
        });
        self.current = Some(start);
        let result = self.lower_block(body);
        self.loops.pop();
        result?;
        self.finish_with(Terminator::Jump(head));
        Ok(())
    }

    fn lower_loop_else(
        &mut self,
        orelse: &[Stmt],
        start: Option<SegmentId>,
        exit: SegmentId,
    ) -> Result<(), DecomposeError> {
        if let Some(start) = start {
            self.current = Some(start);
            self.lower_block(orelse)?;
            self.finish_with(Terminator::Jump(exit));
        }
        self.current = Some(exit);
        Ok(())
    }

    fn lower_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<(), DecomposeError> {
        let join = self.new_segment();
        let finalizer = if finalbody.is_empty() {
            None
        } else {
            Some(self.new_segment())
        };

        let outer = finalizer.map(|entry| {
            let id = self.scopes.open(self.scope_stack.last().copied());
            if let Some(scope) = self.scopes.get_mut(id) {
                scope.finalizer = Some(entry);
            }
            self.scope_stack.push(id);
            self.finally_stack.push(id);
            id
        });
        let inner = if handlers.is_empty() {
            None
        } else {
            let id = self.scopes.open(self.scope_stack.last().copied());
            let Target::Local { slot, .. } = self.fresh_temp("exc") else {
                return Err(DecomposeError::internal("exception temp is not a slot"));
            };
            if let Some(scope) = self.scopes.get_mut(id) {
                scope.caught = Some(slot);
            }
            self.scope_stack.push(id);
            Some((id, slot))
        };

        let body_start = self.new_segment();
        self.switch_to(body_start);
        self.lower_block(body)?;

        let else_start = if orelse.is_empty() {
            None
        } else {
            Some(self.new_segment())
        };
        if let Some(else_start) = else_start {
            self.finish_with(Terminator::Jump(else_start));
        } else {
            self.exit_try(join, outer);
        }

        if let Some((id, caught)) = inner {
            let body_end = else_start.unwrap_or(self.segments.len());
            self.scope_stack.pop();
            self.set_range(id, body_start, body_end);

            for handler in handlers {
                self.location = handler.location;
                let segment = self.new_segment();
                let bind = handler.name.as_deref().map(|name| self.resolve(name));
                if let Some(scope) = self.scopes.get_mut(id) {
                    scope.handlers.push(Handler {
                        pattern: handler.pattern.clone(),
                        segment,
                        bind: bind.clone(),
                    });
                }

                self.current = Some(segment);
                self.handler_stack.push(caught);
                let result = self.lower_block(&handler.body);
                self.handler_stack.pop();
                result?;

                if let Some(Target::Local { slot, .. }) = bind {
                    if self.is_live() {
                        self.emit(Op::Clear(slot));
                    }
                }
                self.exit_try(join, outer);
            }
        }

        if let Some(else_start) = else_start {
            self.current = Some(else_start);
            self.lower_block(orelse)?;
            self.exit_try(join, outer);
        }

        if let (Some(id), Some(entry)) = (outer, finalizer) {
            self.scope_stack.pop();
            self.finally_stack.pop();
            let end = self.segments.len();
            self.set_range(id, body_start, end);

            self.current = Some(entry);
            self.lower_block(finalbody)?;
            self.finish_with(Terminator::EndFinally { scope: id });
        }

        self.current = Some(join);
        Ok(())
    }

    /// Normal exit from a protected region
    fn exit_try(&mut self, join: SegmentId, outer: Option<ScopeId>) {
        let terminator = match outer {
            Some(scope) => Terminator::Leave {
                target: join,
                through: vec![scope],
            },
            None => Terminator::Jump(join),
        };
        self.finish_with(terminator);
    }

    fn set_range(&mut self, id: ScopeId, start: SegmentId, end: SegmentId) {
        if let Some(scope) = self.scopes.get_mut(id) {
            scope.range = start..end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn function(source: &str) -> Rc<GeneratorDescriptor> {
        let program = parse_source(source).unwrap();
        match &program.body[0] {
            Stmt::FunctionDef(def) => decompose_function(def).unwrap(),
            other => panic!("expected def, got {:?}", other),
        }
    }

    fn module_error(source: &str) -> DecomposeError {
        let program = parse_source(source).unwrap();
        decompose_module(&program).unwrap_err()
    }

    #[test]
    fn test_plain_function_has_no_suspension() {
        let d = function("def f(a, b):\n    return a + b\n");
        assert_eq!(d.kind, CodeKind::Function);
        assert_eq!(d.param_count, 2);
        assert_eq!(d.suspension_points(), 0);
    }

    #[test]
    fn test_each_yield_ends_a_segment() {
        let d = function("def g():\n    yield 1\n    yield 2\n    yield 3\n");
        assert_eq!(d.kind, CodeKind::Generator);
        assert_eq!(d.suspension_points(), 3);
        for segment in &d.segments {
            if let Terminator::Suspend { resume, .. } = segment.terminator {
                assert!(resume < d.segments.len());
            }
        }
    }

    #[test]
    fn test_unreachable_yield_still_makes_generator() {
        let d = function("def g():\n    return\n    yield\n");
        assert!(d.is_generator());
        assert_eq!(d.suspension_points(), 1);
    }

    #[test]
    fn test_locals_and_globals_resolved() {
        let d = function("def g(n):\n    total = 0\n    for i in range(n):\n        total += i\n    yield total\n");
        assert!(d.slots.lookup("n").is_some());
        assert!(d.slots.lookup("total").is_some());
        assert!(d.slots.lookup("i").is_some());
        assert!(d.slots.lookup("range").is_none());
        assert_eq!(d.slots.lookup("n"), Some(0));
    }

    #[test]
    fn test_try_scopes_nest() {
        let d = function(
            "def g():\n    try:\n        yield 1\n    except ValueError:\n        yield 2\n    finally:\n        yield 3\n",
        );
        assert_eq!(d.scopes.len(), 2);
        let (_, outer) = d.scopes.iter().find(|(_, s)| s.finalizer.is_some()).unwrap();
        let (_, inner) = d.scopes.iter().find(|(_, s)| !s.handlers.is_empty()).unwrap();
        assert!(outer.range.start <= inner.range.start && inner.range.end <= outer.range.end);
        let handler = inner.handlers[0].segment;
        assert!(!inner.covers(handler));
        assert!(outer.covers(handler));
        let finalizer = outer.finalizer.unwrap();
        assert!(!outer.covers(finalizer));
    }

    #[test]
    fn test_break_through_finally_routes_via_finalizer() {
        let d = function(
            "def g():\n    while True:\n        try:\n            break\n        finally:\n            yield 0\n",
        );
        let leaves: Vec<_> = d
            .segments
            .iter()
            .filter_map(|s| match &s.terminator {
                Terminator::Leave { through, .. } => Some(through.clone()),
                _ => None,
            })
            .collect();
        assert!(leaves.iter().any(|through| through.len() == 1));
    }

    #[test]
    fn test_break_outside_loop() {
        let err = module_error("break\n");
        assert!(matches!(err, DecomposeError::OutsideLoop { keyword: "break", .. }));
    }

    #[test]
    fn test_continue_in_function_outside_loop() {
        let program = parse_source("def f():\n    continue\n").unwrap();
        let Stmt::FunctionDef(def) = &program.body[0] else {
            panic!("expected def");
        };
        let err = decompose_function(def).unwrap_err();
        assert!(matches!(err, DecomposeError::OutsideLoop { keyword: "continue", .. }));
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }

    #[test]
    fn test_yield_at_module_level() {
        let err = module_error("x = 1\nyield x\n");
        assert!(matches!(err, DecomposeError::OutsideFunction { keyword: "yield", .. }));
    }

    #[test]
    fn test_return_at_module_level() {
        let err = module_error("return 4\n");
        assert!(matches!(err, DecomposeError::OutsideFunction { keyword: "return", .. }));
    }

    #[test]
    fn test_module_names_are_global() {
        let program = parse_source("x = 1\nfor y in range(3):\n    x += y\n").unwrap();
        let d = decompose_module(&program).unwrap();
        assert_eq!(d.kind, CodeKind::Module);
        assert!(d.slots.lookup("x").is_none());
        assert!(d.slots.iter().all(|(slot, _)| d.slots.is_hidden(slot)));
    }

    #[test]
    fn test_yield_from_compiles() {
        let d = function("def g():\n    yield from range(3)\n");
        assert!(d.is_generator());
        assert!(d
            .segments
            .iter()
            .flat_map(|s| &s.instrs)
            .any(|i| matches!(i.op, Op::Delegate(_))));
    }

    #[test]
    fn test_every_descriptor_validates() {
        let d = function(
            "def g(x):\n    while x:\n        if (yield x):\n            continue\n        try:\n            x -= 1\n        except:\n            raise\n        else:\n            return (yield)\n    else:\n        yield -1\n",
        );
        assert!(d.validate().is_ok());
    }
}
