//! Generator objects: the per-call state machine
//!
//! ```text
//! Created ──drive──▶ Running ──suspend──▶ Suspended ──drive──▶ Running ─┐
//!    │                  │                     │                         │
//!    │                  └──return / raise─────┼──────────▶ Completed ◀──┘
//!    └───────────── terminate ────────────────┴──────────▶ Closed
//! ```
//!
//! A drive resumes at the recorded segment and executes segments until one
//! suspends, returns, or raises an exception no scope handles. Suspension is
//! pure data: the resume segment, the frame's slots, and any finalizer actions
//! left pending when a `yield` sits inside a `finally` block.

use super::descriptor::{GeneratorDescriptor, Op, SegmentId, Terminator};
use super::errors::GeneratorError;
use super::ir::Target;
use super::scope::ScopeId;
use super::signal::{DriveResult, ResumeSignal};
use super::Host;
use crate::parser::ast::SourceLocation;
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::frame::Frame;
use crate::runtime::value::Value;
use rustc_hash::FxHashMap;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Lifecycle phase of a generator object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Suspended,
    Completed,
    Closed,
}

impl Phase {
    pub fn is_finished(self) -> bool {
        matches!(self, Phase::Completed | Phase::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Created => "created",
            Phase::Running => "running",
            Phase::Suspended => "suspended",
            Phase::Completed => "completed",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Where the next drive starts
#[derive(Debug, Clone)]
enum Position {
    NotStarted,
    Suspended {
        at: SegmentId,
        resume: SegmentId,
        receive: Option<Target>,
    },
    Finished,
}

/// What a finalizer must do once it has run
#[derive(Debug, Clone)]
enum Action {
    Jump(SegmentId),
    Return(Option<Value>),
}

#[derive(Debug, Clone)]
enum Pending {
    /// Continue leaving: run the finalizers of `rest`, then perform `action`
    Leave { action: Action, rest: Vec<ScopeId> },
    /// Keep propagating this exception outward
    Raise(Exception),
}

/// Result of executing one segment
enum Step {
    Continue(SegmentId),
    Suspend(Value),
    Return(Option<Value>),
    Raise {
        exc: Exception,
        from: Option<ScopeId>,
    },
}

/// How a run of segments ended
enum Exit {
    Suspended(Value),
    Returned(Option<Value>),
    Raised(Exception),
}

/// Mutable per-call instance of a [`GeneratorDescriptor`]
#[derive(Debug)]
pub struct GeneratorObject {
    descriptor: Rc<GeneratorDescriptor>,
    frame: Frame,
    phase: Phase,
    position: Position,
    pending: FxHashMap<ScopeId, Pending>,
    current: Option<SegmentId>,
    location: SourceLocation,
}

impl GeneratorObject {
    /// Instantiate `descriptor`, binding `args` to its parameters
    pub fn new(descriptor: Rc<GeneratorDescriptor>, args: Vec<Value>) -> Result<Self, Exception> {
        if args.len() != descriptor.param_count {
            return Err(Exception::type_error(format!(
                "{}() takes {} positional argument{} but {} {} given",
                descriptor.name,
                descriptor.param_count,
                if descriptor.param_count == 1 { "" } else { "s" },
                args.len(),
                if args.len() == 1 { "was" } else { "were" },
            )));
        }

        let mut frame = Frame::new(descriptor.slots.len());
        for (slot, value) in args.into_iter().enumerate() {
            frame.set(slot, value);
        }

        let location = descriptor.location;
        Ok(GeneratorObject {
            descriptor,
            frame,
            phase: Phase::Created,
            position: Position::NotStarted,
            pending: FxHashMap::default(),
            current: None,
            location,
        })
    }

    pub fn descriptor(&self) -> &Rc<GeneratorDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &Rc<str> {
        &self.descriptor.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Segment most recently executed, if any
    pub fn current_segment(&self) -> Option<SegmentId> {
        self.current
    }

    /// Location of the operation most recently executed
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// `drive_with(Value(None))`
    pub fn advance<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<DriveResult, GeneratorError> {
        self.drive_with(host, ResumeSignal::none())
    }

    /// Raise `exc` at the current suspension point
    pub fn throw_into<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        exc: Exception,
    ) -> Result<DriveResult, GeneratorError> {
        self.drive_with(host, ResumeSignal::InjectException(exc))
    }

    /// Deliver a termination request. Idempotent once finished.
    ///
    /// Returns the body's return value if a handler caught the request and
    /// the body then returned one.
    pub fn terminate<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<Option<Value>, GeneratorError> {
        match self.phase {
            Phase::Closed => Ok(None),
            Phase::Completed => {
                self.phase = Phase::Closed;
                Ok(None)
            }
            _ => match self.drive_with(host, ResumeSignal::TerminationRequest)? {
                DriveResult::Completion(value) => Ok(value),
                DriveResult::Produced(_) => Err(GeneratorError::IgnoredTermination),
            },
        }
    }

    /// Run a non-generator body to completion in a single drive
    pub fn call<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<Value, Exception> {
        match self.advance(host) {
            Ok(DriveResult::Completion(value)) => Ok(value.unwrap_or(Value::None)),
            Ok(DriveResult::Produced(_)) => Err(Exception::runtime_error(format!(
                "function '{}' suspended outside a generator",
                self.descriptor.name
            ))),
            Err(GeneratorError::Raised(exc)) => Err(exc),
            Err(other) => Err(Exception::runtime_error(other.to_string())),
        }
    }

    /// Resume with `signal` and run until the next suspension or completion
    pub fn drive_with<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        signal: ResumeSignal,
    ) -> Result<DriveResult, GeneratorError> {
        trace!(generator = %self.descriptor.name, phase = %self.phase, signal = signal.label(), "drive");

        let terminating = matches!(signal, ResumeSignal::TerminationRequest);
        let flow = match self.phase {
            Phase::Running => {
                debug!(generator = %self.descriptor.name, "reentrant drive rejected");
                return Err(GeneratorError::AlreadyRunning);
            }
            Phase::Completed | Phase::Closed => {
                if terminating {
                    self.phase = Phase::Closed;
                }
                return Ok(DriveResult::Completion(None));
            }
            Phase::Created => match signal {
                ResumeSignal::Value(v) if !v.is_none() => {
                    debug!(generator = %self.descriptor.name, "non-None value sent to fresh generator");
                    return Err(GeneratorError::NonNoneOnStart);
                }
                ResumeSignal::Value(_) => Flow::Goto(self.descriptor.entry),
                ResumeSignal::InjectException(exc) => {
                    return self.settle(Exit::Raised(exc), false);
                }
                ResumeSignal::TerminationRequest => {
                    self.finish(Phase::Closed);
                    return Ok(DriveResult::Completion(None));
                }
            },
            Phase::Suspended => self.resume_flow(host, signal),
        };

        self.phase = Phase::Running;
        let exit = self.run(host, flow);
        self.settle(exit, terminating)
    }

    fn resume_flow<H: Host + ?Sized>(&mut self, host: &mut H, signal: ResumeSignal) -> Flow {
        let Position::Suspended {
            at,
            resume,
            receive,
        } = std::mem::replace(&mut self.position, Position::Finished)
        else {
            return Flow::Raise {
                exc: Exception::runtime_error("suspended generator has no resume point"),
                from: None,
            };
        };

        let from = self.descriptor.scopes.innermost(at);
        match signal {
            ResumeSignal::Value(value) => {
                if let Some(target) = receive {
                    self.store(host, &target, value);
                }
                Flow::Goto(resume)
            }
            ResumeSignal::InjectException(exc) => Flow::Raise { exc, from },
            ResumeSignal::TerminationRequest => Flow::Raise {
                exc: Exception::termination_request(),
                from,
            },
        }
    }

    fn settle(&mut self, exit: Exit, terminating: bool) -> Result<DriveResult, GeneratorError> {
        match exit {
            Exit::Suspended(value) => {
                if terminating {
                    debug!(generator = %self.descriptor.name, "yielded after termination request");
                    self.finish(Phase::Closed);
                    return Err(GeneratorError::IgnoredTermination);
                }
                self.phase = Phase::Suspended;
                Ok(DriveResult::Produced(value))
            }
            Exit::Returned(value) => {
                self.finish(if terminating {
                    Phase::Closed
                } else {
                    Phase::Completed
                });
                Ok(DriveResult::Completion(value))
            }
            Exit::Raised(exc) => {
                if terminating && exc.is_termination_request() {
                    self.finish(Phase::Closed);
                    return Ok(DriveResult::Completion(None));
                }
                self.finish(Phase::Completed);
                let exc = if self.descriptor.is_generator() && exc.kind == ExceptionKind::StopIteration {
                    Exception::runtime_error("generator raised StopIteration")
                } else {
                    exc
                };
                Err(GeneratorError::Raised(exc))
            }
        }
    }

    fn finish(&mut self, phase: Phase) {
        trace!(generator = %self.descriptor.name, from = %self.phase, to = %phase, "finished");
        self.phase = phase;
        self.position = Position::Finished;
        self.pending.clear();
    }

    fn run<H: Host + ?Sized>(&mut self, host: &mut H, mut flow: Flow) -> Exit {
        loop {
            let id = match flow {
                Flow::Goto(id) => id,
                Flow::Raise { exc, from } => match self.unwind(host, exc, from) {
                    Ok(id) => id,
                    Err(exc) => return Exit::Raised(exc),
                },
            };

            self.current = Some(id);
            flow = match self.execute(host, id) {
                Ok(Step::Continue(next)) => Flow::Goto(next),
                Ok(Step::Suspend(value)) => return Exit::Suspended(value),
                Ok(Step::Return(value)) => return Exit::Returned(value),
                Ok(Step::Raise { exc, from }) => Flow::Raise { exc, from },
                Err(exc) => Flow::Raise {
                    exc,
                    from: self.descriptor.scopes.innermost(id),
                },
            };
        }
    }

    /// Route `exc` to the nearest accepting handler or finalizer, starting at `from`
    fn unwind<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        exc: Exception,
        from: Option<ScopeId>,
    ) -> Result<SegmentId, Exception> {
        let descriptor = Rc::clone(&self.descriptor);
        let mut current = from;

        while let Some(id) = current {
            let Some(scope) = descriptor.scopes.get(id) else {
                break;
            };

            if let Some(handler) = scope
                .handlers
                .iter()
                .find(|h| host.exception_matches(&exc, &h.pattern))
            {
                trace!(generator = %descriptor.name, scope = id, kind = %exc.kind, "handled");
                if let Some(slot) = scope.caught {
                    self.frame.set(slot, Value::Exception(exc.clone()));
                }
                if let Some(bind) = &handler.bind {
                    self.store(host, bind, Value::Exception(exc));
                }
                return Ok(handler.segment);
            }

            if let Some(finalizer) = scope.finalizer {
                self.pending.insert(id, Pending::Raise(exc));
                return Ok(finalizer);
            }

            current = scope.parent;
        }

        Err(exc)
    }

    fn execute<H: Host + ?Sized>(&mut self, host: &mut H, id: SegmentId) -> Result<Step, Exception> {
        let descriptor = Rc::clone(&self.descriptor);
        let segment = descriptor.segment(id);

        for instr in &segment.instrs {
            self.location = instr.location;
            self.exec_op(host, &instr.op)?;
        }
        self.location = segment.location;

        match &segment.terminator {
            Terminator::Jump(target) => Ok(Step::Continue(*target)),
            Terminator::Branch {
                test,
                then,
                otherwise,
            } => {
                let value = host.eval(test, &self.frame)?;
                if host.truthy(&value)? {
                    Ok(Step::Continue(*then))
                } else {
                    Ok(Step::Continue(*otherwise))
                }
            }
            Terminator::ForNext {
                iterator,
                target,
                body,
                exit,
            } => {
                let it = self.frame.load(*iterator, "$iter")?;
                match host.iter_next(&it)? {
                    Some(item) => {
                        self.store(host, target, item);
                        Ok(Step::Continue(*body))
                    }
                    None => Ok(Step::Continue(*exit)),
                }
            }
            Terminator::Suspend {
                value,
                resume,
                receive,
            } => {
                let produced = match value {
                    Some(expr) => host.eval(expr, &self.frame)?,
                    None => Value::None,
                };
                self.position = Position::Suspended {
                    at: id,
                    resume: *resume,
                    receive: receive.clone(),
                };
                Ok(Step::Suspend(produced))
            }
            Terminator::Return { value, through } => {
                let result = match value {
                    Some(expr) => Some(host.eval(expr, &self.frame)?),
                    None => None,
                };
                self.leave(through, Action::Return(result))
            }
            Terminator::Leave { target, through } => self.leave(through, Action::Jump(*target)),
            Terminator::EndFinally { scope } => match self.pending.remove(scope) {
                Some(Pending::Leave { action, rest }) => self.leave(&rest, action),
                Some(Pending::Raise(exc)) => Ok(Step::Raise {
                    exc,
                    from: descriptor.scopes.get(*scope).and_then(|s| s.parent),
                }),
                None => Err(Exception::runtime_error(
                    "finally block finished with no pending action",
                )),
            },
        }
    }

    /// Perform `action` after running the finalizers of `through`, innermost first
    fn leave(&mut self, through: &[ScopeId], action: Action) -> Result<Step, Exception> {
        let Some((&first, rest)) = through.split_first() else {
            return Ok(match action {
                Action::Jump(target) => Step::Continue(target),
                Action::Return(value) => Step::Return(value),
            });
        };

        let finalizer = self
            .descriptor
            .scopes
            .get(first)
            .and_then(|s| s.finalizer)
            .ok_or_else(|| Exception::runtime_error("scope without finalizer on exit path"))?;
        self.pending.insert(
            first,
            Pending::Leave {
                action,
                rest: rest.to_vec(),
            },
        );
        Ok(Step::Continue(finalizer))
    }

    fn exec_op<H: Host + ?Sized>(&mut self, host: &mut H, op: &Op) -> Result<(), Exception> {
        match op {
            Op::Store { target, value } => {
                let value = host.eval(value, &self.frame)?;
                self.store(host, target, value);
            }
            Op::Eval(expr) => {
                host.eval(expr, &self.frame)?;
            }
            Op::Raise(Some(expr)) => {
                let raised = host.eval(expr, &self.frame)?;
                return Err(host.make_exception(raised));
            }
            Op::Raise(None) => {
                return Err(Exception::runtime_error("No active exception to reraise"));
            }
            Op::Reraise(slot) => {
                return Err(match self.frame.get(*slot) {
                    Some(Value::Exception(exc)) => exc.clone(),
                    _ => Exception::runtime_error("No active exception to reraise"),
                });
            }
            Op::Clear(slot) => self.frame.clear(*slot),
            Op::GetIter { slot, iterable } => {
                let value = host.eval(iterable, &self.frame)?;
                let iterator = host.iter_start(value)?;
                self.frame.set(*slot, iterator);
            }
            Op::DefineFunction { target, descriptor } => {
                let function = host.define_function(Rc::clone(descriptor));
                self.store(host, target, function);
            }
            Op::Delegate(expr) => {
                host.eval(expr, &self.frame)?;
                return Err(Exception::new(
                    ExceptionKind::NotImplementedError,
                    "'yield from' is not supported",
                ));
            }
        }
        Ok(())
    }

    fn store<H: Host + ?Sized>(&mut self, host: &mut H, target: &Target, value: Value) {
        match target {
            Target::Local { slot, .. } => self.frame.set(*slot, value),
            Target::Global(name) => host.store_global(name, value),
        }
    }
}

/// Where a run of segments starts
enum Flow {
    Goto(SegmentId),
    Raise {
        exc: Exception,
        from: Option<ScopeId>,
    },
}

/// Shared handle to a generator object, as held by runtime values
#[derive(Clone)]
pub struct GeneratorRef {
    name: Rc<str>,
    inner: Rc<RefCell<GeneratorObject>>,
}

impl GeneratorRef {
    pub fn new(object: GeneratorObject) -> Self {
        GeneratorRef {
            name: Rc::clone(object.name()),
            inner: Rc::new(RefCell::new(object)),
        }
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn ptr_eq(&self, other: &GeneratorRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity for display
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Read access; `None` while the generator is being driven
    pub fn try_borrow(&self) -> Option<Ref<'_, GeneratorObject>> {
        self.inner.try_borrow().ok()
    }

    /// Drive through the shared handle. A drive from inside the generator's
    /// own body fails with [`GeneratorError::AlreadyRunning`].
    pub fn drive_with<H: Host + ?Sized>(
        &self,
        host: &mut H,
        signal: ResumeSignal,
    ) -> Result<DriveResult, GeneratorError> {
        let mut object = self
            .inner
            .try_borrow_mut()
            .map_err(|_| GeneratorError::AlreadyRunning)?;
        object.drive_with(host, signal)
    }

    pub fn terminate<H: Host + ?Sized>(&self, host: &mut H) -> Result<Option<Value>, GeneratorError> {
        let mut object = self
            .inner
            .try_borrow_mut()
            .map_err(|_| GeneratorError::AlreadyRunning)?;
        object.terminate(host)
    }
}

impl fmt::Debug for GeneratorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<generator {} @{:#x}>", self.name, self.id())
    }
}
