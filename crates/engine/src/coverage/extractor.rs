//! Path extraction.
//!
//! Depth-first enumeration of every route from the start action to a terminal action
//! that an access of a given type can take. Transitions are pruned when their operation
//! filter rejects the access or their buffer event is not allowed by the constraints;
//! calls push a fresh frame and return to the call's target once the callee terminates.
//! Every complete route is symbolically executed and kept only if satisfiable.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::access::path::{AccessPath, AccessPathBuilder, PathEntry};
use crate::common::{AccessType, Result};
use crate::config::MemoryAccessConstraints;
use crate::model::{ActionId, Subsystem, TransitionId};
use crate::symbolic::constraints::integer_clause;
use crate::symbolic::formula::Clause;
use crate::symbolic::solver::BitSolver;

/// Pending return of a call.
#[derive(Debug, Clone, Copy)]
struct Frame {
    transition: TransitionId,
    caller: u32,
    callee: u32,
}

/// Extracts the feasible paths of a subsystem.
#[derive(Debug, Clone, Copy)]
pub struct PathExtractor<'a> {
    subsystem: &'a Subsystem,
    max_depth: usize,
    max_paths: usize,
}

impl<'a> PathExtractor<'a> {
    /// Creates an extractor.
    ///
    /// # Arguments
    ///
    /// * `subsystem` - Graph to walk.
    /// * `max_depth` - Maximum number of entries on a path.
    /// * `max_paths` - Maximum number of paths returned.
    pub const fn new(subsystem: &'a Subsystem, max_depth: usize, max_paths: usize) -> Self {
        Self {
            subsystem,
            max_depth,
            max_paths,
        }
    }

    /// Extracts the feasible paths of `access_type` under `constraints`.
    ///
    /// # Errors
    ///
    /// Returns an error when a constraint refers to an unknown buffer or variable.
    pub fn extract(
        &self,
        access_type: AccessType,
        constraints: &MemoryAccessConstraints,
    ) -> Result<Vec<Arc<AccessPath>>> {
        constraints.validate(self.subsystem)?;
        let extra = constraints
            .integers
            .iter()
            .map(|c| integer_clause(self.subsystem, c, 0))
            .collect::<Result<Vec<_>>>()?;

        let mut search = Search {
            extractor: self,
            access_type,
            constraints,
            extra: &extra,
            builder: AccessPathBuilder::new(self.subsystem),
            stack: Vec::new(),
            next_frame: 1,
            paths: Vec::new(),
            visited: 0,
        };
        search.visit(self.subsystem.start(), 0);
        debug!(
            access = %access_type,
            routes = search.visited,
            paths = search.paths.len(),
            "extracted paths"
        );
        Ok(search.paths)
    }
}

struct Search<'s, 'a> {
    extractor: &'s PathExtractor<'a>,
    access_type: AccessType,
    constraints: &'s MemoryAccessConstraints,
    extra: &'s [Clause],
    builder: AccessPathBuilder<'a>,
    stack: Vec<Frame>,
    next_frame: u32,
    paths: Vec<Arc<AccessPath>>,
    visited: usize,
}

impl Search<'_, '_> {
    fn full(&self) -> bool {
        self.paths.len() >= self.extractor.max_paths
    }

    fn visit(&mut self, action: ActionId, frame: u32) {
        if self.full() {
            return;
        }
        let subsystem = self.extractor.subsystem;
        let outgoing = subsystem.outgoing(action);
        if outgoing.is_empty() {
            self.terminal(frame);
            return;
        }
        if self.builder.len() >= self.extractor.max_depth {
            trace!(depth = self.builder.len(), "path depth bound reached");
            return;
        }
        for &id in outgoing {
            let t = subsystem.transition(id);
            if !t.guard.admits(self.access_type.operation) {
                continue;
            }
            if let Some((buffer, event)) = t.guard.buffer {
                if !self.constraints.allows(subsystem, buffer, event) {
                    continue;
                }
            }
            if let Some(call) = &t.call {
                let callee = self.next_frame;
                self.next_frame += 1;
                self.builder.push(PathEntry::Call {
                    transition: id,
                    caller: frame,
                    callee,
                });
                self.stack.push(Frame {
                    transition: id,
                    caller: frame,
                    callee,
                });
                self.visit(call.procedure, callee);
                let _ = self.stack.pop();
                let _ = self.builder.pop();
                self.next_frame -= 1;
            } else {
                self.builder.transition(id, frame);
                self.visit(t.target, frame);
                let _ = self.builder.pop();
            }
        }
    }

    fn terminal(&mut self, frame: u32) {
        let Some(top) = self.stack.pop() else {
            self.complete();
            return;
        };
        debug_assert_eq!(top.callee, frame);
        self.builder.push(PathEntry::Return {
            transition: top.transition,
            callee: top.callee,
            caller: top.caller,
        });
        let target = self.extractor.subsystem.transition(top.transition).target;
        self.visit(target, top.caller);
        let _ = self.builder.pop();
        self.stack.push(top);
    }

    fn complete(&mut self) {
        self.visited += 1;
        let subsystem = self.extractor.subsystem;
        let path = self.builder.build();
        let result = path.symbolic(subsystem);
        if let Some(reason) = result.conflict_reason() {
            trace!(%reason, "path dropped");
            return;
        }
        let mut formula = result.formula().clone();
        for clause in self.extra {
            formula.push(clause.clone());
        }
        if !BitSolver::new(subsystem).check(&formula) {
            trace!(path = %path, "path unsatisfiable");
            return;
        }
        self.paths.push(Arc::new(path));
    }
}
