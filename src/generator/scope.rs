//! Exception-scope table
//!
//! Each `try` statement registers one or two [`ExceptionScope`]s covering a
//! contiguous range of segment ids. A `try` with both handlers and a
//! `finally` becomes a handler scope nested inside a finalizer-only scope, so
//! the finalizer also runs for exceptions escaping the handlers. Scopes are
//! properly nested: two ranges are either disjoint or one contains the other.

use super::descriptor::SegmentId;
use super::errors::DecomposeError;
use super::ir::{SlotId, Target};
use crate::parser::ast::HandlerPattern;
use std::ops::Range;

/// Index into the [`ScopeTable`]
pub type ScopeId = usize;

/// One `except` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub pattern: HandlerPattern,
    pub segment: SegmentId,
    /// The `as` name, if any
    pub bind: Option<Target>,
}

/// A protected region of segments
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionScope {
    pub range: Range<SegmentId>,
    pub handlers: Vec<Handler>,
    /// Hidden slot holding the exception being handled, for bare `raise`
    pub caught: Option<SlotId>,
    pub finalizer: Option<SegmentId>,
    pub parent: Option<ScopeId>,
}

impl ExceptionScope {
    pub fn covers(&self, segment: SegmentId) -> bool {
        self.range.contains(&segment)
    }
}

/// All scopes of a descriptor plus the innermost scope of every segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeTable {
    scopes: Vec<ExceptionScope>,
    innermost: Vec<Option<ScopeId>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        ScopeTable::default()
    }

    /// Reserve a scope whose range is not known yet
    pub fn open(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ExceptionScope {
            range: 0..0,
            handlers: Vec::new(),
            caught: None,
            finalizer: None,
            parent,
        });
        self.scopes.len() - 1
    }

    pub fn get(&self, id: ScopeId) -> Option<&ExceptionScope> {
        self.scopes.get(id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut ExceptionScope> {
        self.scopes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &ExceptionScope)> {
        self.scopes.iter().enumerate()
    }

    fn depth(&self, id: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = self.scopes[id].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.scopes[parent].parent;
        }
        depth
    }

    /// Precompute the innermost covering scope for each of `segment_count`
    /// segments. Called once decomposition has placed every segment.
    pub fn seal(&mut self, segment_count: usize) {
        let mut innermost: Vec<Option<(ScopeId, usize)>> = vec![None; segment_count];
        for id in 0..self.scopes.len() {
            let depth = self.depth(id);
            let range = self.scopes[id].range.clone();
            for slot in innermost.iter_mut().take(range.end).skip(range.start) {
                if slot.map_or(true, |(_, d)| depth > d) {
                    *slot = Some((id, depth));
                }
            }
        }
        self.innermost = innermost.into_iter().map(|s| s.map(|(id, _)| id)).collect();
    }

    /// Innermost scope protecting `segment`
    pub fn innermost(&self, segment: SegmentId) -> Option<ScopeId> {
        self.innermost.get(segment).copied().flatten()
    }

    /// The chain of scopes protecting `segment`, innermost first
    pub fn chain(&self, segment: SegmentId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.innermost(segment);
        while let Some(id) = current {
            chain.push(id);
            current = self.scopes[id].parent;
        }
        chain
    }

    /// Check nesting: each scope lies inside its parent, siblings never overlap.
    pub fn validate(&self, segment_count: usize) -> Result<(), DecomposeError> {
        for (id, scope) in self.iter() {
            if scope.range.is_empty() || scope.range.end > segment_count {
                return Err(DecomposeError::internal(format!(
                    "scope {} has invalid range {:?}",
                    id, scope.range
                )));
            }
            if scope.handlers.is_empty() && scope.finalizer.is_none() {
                return Err(DecomposeError::internal(format!(
                    "scope {} has neither handlers nor a finalizer",
                    id
                )));
            }
            if let Some(parent) = scope.parent {
                let outer = self.scopes.get(parent).ok_or_else(|| {
                    DecomposeError::internal(format!("scope {} has missing parent {}", id, parent))
                })?;
                if scope.range.start < outer.range.start || scope.range.end > outer.range.end {
                    return Err(DecomposeError::internal(format!(
                        "scope {} {:?} escapes its parent {} {:?}",
                        id, scope.range, parent, outer.range
                    )));
                }
            }
            for (other_id, other) in self.iter().skip(id + 1) {
                let disjoint =
                    scope.range.end <= other.range.start || other.range.end <= scope.range.start;
                let nested = (scope.range.start <= other.range.start
                    && other.range.end <= scope.range.end)
                    || (other.range.start <= scope.range.start
                        && scope.range.end <= other.range.end);
                if !disjoint && !nested {
                    return Err(DecomposeError::internal(format!(
                        "scopes {} {:?} and {} {:?} overlap without nesting",
                        id, scope.range, other_id, other.range
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(segment: SegmentId) -> Handler {
        Handler {
            pattern: HandlerPattern::Any,
            segment,
            bind: None,
        }
    }

    fn table(ranges: &[(Range<SegmentId>, Option<ScopeId>)]) -> ScopeTable {
        let mut table = ScopeTable::new();
        for (range, parent) in ranges {
            let id = table.open(*parent);
            let scope = table.get_mut(id).unwrap();
            scope.range = range.clone();
            scope.handlers.push(handler(range.end));
        }
        table
    }

    #[test]
    fn test_innermost_prefers_deepest() {
        let mut scopes = table(&[(1..6, None), (2..4, Some(0))]);
        scopes.seal(8);

        assert_eq!(scopes.innermost(0), None);
        assert_eq!(scopes.innermost(1), Some(0));
        assert_eq!(scopes.innermost(3), Some(1));
        assert_eq!(scopes.innermost(5), Some(0));
        assert_eq!(scopes.chain(2), vec![1, 0]);
        assert!(scopes.validate(8).is_ok());
    }

    #[test]
    fn test_overlapping_scopes_rejected() {
        let scopes = table(&[(1..5, None), (3..7, None)]);
        assert!(scopes.validate(8).is_err());
    }

    #[test]
    fn test_child_outside_parent_rejected() {
        let scopes = table(&[(2..4, None), (1..3, Some(0))]);
        assert!(scopes.validate(8).is_err());
    }

    #[test]
    fn test_scope_needs_handler_or_finalizer() {
        let mut scopes = ScopeTable::new();
        let id = scopes.open(None);
        scopes.get_mut(id).unwrap().range = 0..1;
        assert!(scopes.validate(1).is_err());
    }
}
