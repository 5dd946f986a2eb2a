// Drive history for step-through replay

use crate::generator::descriptor::{GeneratorDescriptor, SegmentId};
use crate::generator::object::{GeneratorObject, Phase};
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::SourceLocation;
use std::rc::Rc;

/// Mock terminal capturing `print` output
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    pub lines: Vec<String>,
}

impl MockTerminal {
    pub fn new() -> Self {
        MockTerminal { lines: Vec::new() }
    }

    /// Print one logical line; embedded newlines start new lines
    pub fn print(&mut self, text: &str) {
        self.lines.extend(text.split('\n').map(str::to_string));
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines.clone()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// State of one generator right after one drive
#[derive(Debug, Clone)]
pub struct DriveSnapshot {
    pub generator: Rc<str>,
    /// `next`, `send`, `throw`, `close` or `for`
    pub operation: &'static str,
    pub signal: String,
    pub outcome: String,
    pub phase_before: Phase,
    pub phase_after: Phase,
    /// Last segment executed
    pub segment: Option<SegmentId>,
    /// User-visible slots, formatted; unbound slots are `None`
    pub slots: Vec<(Rc<str>, Option<String>)>,
    /// Terminal lines printed so far
    pub output_lines: usize,
    pub location: SourceLocation,
    pub descriptor: Rc<GeneratorDescriptor>,
    /// Generator drives active underneath this one
    pub depth: usize,
}

impl DriveSnapshot {
    /// Capture `generator` after a drive. Compiler temporaries are skipped.
    pub fn capture(
        generator: &GeneratorObject,
        operation: &'static str,
        signal: String,
        outcome: String,
        phase_before: Phase,
        output_lines: usize,
        depth: usize,
    ) -> Self {
        let descriptor = Rc::clone(generator.descriptor());
        let slots = descriptor
            .slots
            .iter()
            .filter(|(slot, _)| !descriptor.slots.is_hidden(*slot))
            .map(|(slot, name)| (name.clone(), generator.frame().get(slot).map(|v| v.repr())))
            .collect();

        DriveSnapshot {
            generator: descriptor.name.clone(),
            operation,
            signal,
            outcome,
            phase_before,
            phase_after: generator.phase(),
            segment: generator.current_segment(),
            slots,
            output_lines,
            location: generator.location(),
            descriptor,
            depth,
        }
    }
}

/// Bounded record of every drive, in execution order
#[derive(Debug)]
pub struct TraceLog {
    events: Vec<DriveSnapshot>,
    limit: usize,
}

impl TraceLog {
    pub fn new(limit: usize) -> Self {
        TraceLog {
            events: Vec::new(),
            limit,
        }
    }

    /// Append an event, failing once the limit is reached
    pub fn push(&mut self, event: DriveSnapshot) -> Result<(), RuntimeError> {
        if self.events.len() >= self.limit {
            return Err(RuntimeError::TraceLimit { limit: self.limit });
        }
        self.events.push(event);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&DriveSnapshot> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriveSnapshot> {
        self.events.iter()
    }
}
