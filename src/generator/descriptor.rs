//! Compiled, immutable form of a function body
//!
//! A [`GeneratorDescriptor`] is an arena of [`Segment`]s. Each segment is a
//! run of plain operations closed by exactly one [`Terminator`]; suspension
//! is a terminator, so a segment can suspend at most once and only at its end.
//! Descriptors are built once per `def` and shared by every call through `Rc`.

use super::errors::DecomposeError;
use super::ir::{Expr, SlotId, Target};
use super::scope::{ScopeId, ScopeTable};
use crate::parser::ast::SourceLocation;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Index into [`GeneratorDescriptor::segments`]
pub type SegmentId = usize;

/// What kind of code a descriptor was compiled from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Top-level statements; every name is global
    Module,
    /// A `def` without suspension points; runs to completion in one drive
    Function,
    /// A `def` containing at least one suspension point
    Generator,
}

/// A plain operation inside a segment
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Store { target: Target, value: Expr },
    Eval(Expr),
    /// `raise expr`, or a bare `raise` outside any handler when `None`
    Raise(Option<Expr>),
    /// Bare `raise` inside a handler: re-raise the caught exception
    Reraise(SlotId),
    /// Unbind a handler's `as` name when the handler finishes
    Clear(SlotId),
    GetIter { slot: SlotId, iterable: Expr },
    DefineFunction {
        target: Target,
        descriptor: Rc<GeneratorDescriptor>,
    },
    /// `yield from expr`; evaluates its operand, then fails
    Delegate(Expr),
}

/// An operation with the location of the statement it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub op: Op,
    pub location: SourceLocation,
}

/// How control leaves a segment
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jump(SegmentId),
    Branch {
        test: Expr,
        then: SegmentId,
        otherwise: SegmentId,
    },
    /// Advance the iterator in `iterator`; bind and enter `body`, or go to `exit`
    ForNext {
        iterator: SlotId,
        target: Target,
        body: SegmentId,
        exit: SegmentId,
    },
    /// Produce `value`; on resume store the sent value into `receive`
    Suspend {
        value: Option<Expr>,
        resume: SegmentId,
        receive: Option<Target>,
    },
    /// Finish, running the finalizers of `through` (innermost first) before completing
    Return {
        value: Option<Expr>,
        through: Vec<ScopeId>,
    },
    /// Jump to `target` after running the finalizers of `through`
    Leave {
        target: SegmentId,
        through: Vec<ScopeId>,
    },
    /// End of the finalizer of `scope`: carry out whatever action is pending there
    EndFinally { scope: ScopeId },
}

impl Terminator {
    /// Segments this terminator can transfer control to directly
    pub fn successors(&self) -> Vec<SegmentId> {
        match self {
            Terminator::Jump(target) | Terminator::Leave { target, .. } => vec![*target],
            Terminator::Branch {
                then, otherwise, ..
            } => vec![*then, *otherwise],
            Terminator::ForNext { body, exit, .. } => vec![*body, *exit],
            Terminator::Suspend { resume, .. } => vec![*resume],
            Terminator::Return { .. } | Terminator::EndFinally { .. } => Vec::new(),
        }
    }

    pub fn is_suspend(&self) -> bool {
        matches!(self, Terminator::Suspend { .. })
    }

    fn scopes(&self) -> &[ScopeId] {
        match self {
            Terminator::Return { through, .. } | Terminator::Leave { through, .. } => through,
            Terminator::EndFinally { scope } => std::slice::from_ref(scope),
            _ => &[],
        }
    }
}

/// A straight-line run of operations
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
    /// Location of the statement that ended the segment
    pub location: SourceLocation,
}

/// Names of a frame's slots; parameters come first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotTable {
    names: Vec<Rc<str>>,
    index: FxHashMap<Rc<str>, SlotId>,
}

impl SlotTable {
    pub fn new() -> Self {
        SlotTable::default()
    }

    /// Slot for `name`, allocating one if it is new
    pub fn intern(&mut self, name: &str) -> SlotId {
        if let Some(&slot) = self.index.get(name) {
            return slot;
        }
        let name: Rc<str> = Rc::from(name);
        let slot = self.names.len();
        self.names.push(name.clone());
        self.index.insert(name, slot);
        slot
    }

    pub fn lookup(&self, name: &str) -> Option<SlotId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, slot: SlotId) -> &Rc<str> {
        &self.names[slot]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Rc<str>)> {
        self.names.iter().enumerate()
    }

    /// Compiler temporaries and hidden slots start with `$`
    pub fn is_hidden(&self, slot: SlotId) -> bool {
        self.names[slot].starts_with('$')
    }
}

/// Everything needed to instantiate and run one function body
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorDescriptor {
    pub name: Rc<str>,
    pub kind: CodeKind,
    pub param_count: usize,
    pub slots: SlotTable,
    pub segments: Vec<Segment>,
    pub scopes: ScopeTable,
    pub entry: SegmentId,
    pub location: SourceLocation,
}

impl GeneratorDescriptor {
    pub fn is_generator(&self) -> bool {
        self.kind == CodeKind::Generator
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id]
    }

    pub fn suspension_points(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.terminator.is_suspend())
            .count()
    }

    /// Check the structural invariants the state machine relies on.
    pub fn validate(&self) -> Result<(), DecomposeError> {
        let count = self.segments.len();
        if self.entry >= count {
            return Err(DecomposeError::internal(format!(
                "entry segment {} out of range",
                self.entry
            )));
        }

        for (id, segment) in self.segments.iter().enumerate() {
            for target in segment.terminator.successors() {
                if target >= count {
                    return Err(DecomposeError::internal(format!(
                        "segment {} jumps to missing segment {}",
                        id, target
                    )));
                }
            }
            for &scope in segment.terminator.scopes() {
                if self.scopes.get(scope).and_then(|s| s.finalizer).is_none() {
                    return Err(DecomposeError::internal(format!(
                        "segment {} routes through scope {} which has no finalizer",
                        id, scope
                    )));
                }
            }
            if segment.terminator.is_suspend() && self.kind != CodeKind::Generator {
                return Err(DecomposeError::internal(format!(
                    "segment {} suspends inside non-generator '{}'",
                    id, self.name
                )));
            }
        }

        self.scopes.validate(count)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Store { target, value } => write!(f, "{} = {}", target.name(), value),
            Op::Eval(expr) => write!(f, "{}", expr),
            Op::Raise(Some(expr)) => write!(f, "raise {}", expr),
            Op::Raise(None) => write!(f, "raise"),
            Op::Reraise(slot) => write!(f, "reraise ${}", slot),
            Op::Clear(slot) => write!(f, "clear ${}", slot),
            Op::GetIter { slot, iterable } => write!(f, "${} = iter({})", slot, iterable),
            Op::DefineFunction { target, .. } => write!(f, "def {}", target.name()),
            Op::Delegate(expr) => write!(f, "yield from {}", expr),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(target) => write!(f, "jump #{}", target),
            Terminator::Branch {
                test,
                then,
                otherwise,
            } => write!(f, "if {} → #{} else #{}", test, then, otherwise),
            Terminator::ForNext {
                target, body, exit, ..
            } => write!(f, "next {} → #{} / done #{}", target.name(), body, exit),
            Terminator::Suspend { value, resume, .. } => match value {
                Some(v) => write!(f, "yield {} ⇢ #{}", v, resume),
                None => write!(f, "yield ⇢ #{}", resume),
            },
            Terminator::Return { value, .. } => match value {
                Some(v) => write!(f, "return {}", v),
                None => write!(f, "return"),
            },
            Terminator::Leave { target, through } => {
                write!(f, "leave → #{} via {:?}", target, through)
            }
            Terminator::EndFinally { scope } => write!(f, "end finally {}", scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_table_interns_once() {
        let mut slots = SlotTable::new();
        let a = slots.intern("a");
        let b = slots.intern("b");
        assert_eq!(slots.intern("a"), a);
        assert_ne!(a, b);
        assert_eq!(slots.len(), 2);
        assert_eq!(&**slots.name(b), "b");
    }

    #[test]
    fn test_hidden_slots() {
        let mut slots = SlotTable::new();
        let user = slots.intern("x");
        let temp = slots.intern("$0");
        assert!(!slots.is_hidden(user));
        assert!(slots.is_hidden(temp));
    }

    #[test]
    fn test_validate_rejects_dangling_jump() {
        let descriptor = GeneratorDescriptor {
            name: Rc::from("broken"),
            kind: CodeKind::Function,
            param_count: 0,
            slots: SlotTable::new(),
            segments: vec![Segment {
                instrs: Vec::new(),
                terminator: Terminator::Jump(7),
                location: SourceLocation::default(),
            }],
            scopes: ScopeTable::default(),
            entry: 0,
            location: SourceLocation::default(),
        };

        assert!(descriptor.validate().is_err());
    }
}
