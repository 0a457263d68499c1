//! Dependency tracking between parked statements and what they wait for

use crate::ast::{IdentId, ScopeId, StmtId};
use std::collections::HashMap;

/// Something a statement can wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// The identifier's type (and constant value) has not been written yet
    Identifier(IdentId),
    /// A lookup through this scope is blocked on its pending `using`s
    Imports(ScopeId),
    /// The statement has not reached a terminal status
    Statement(StmtId),
}

/// Result of a resolution step that may have to wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    /// Missing information; the current statement has been registered as
    /// a dependent of whatever is missing
    Pending,
    /// An error was reported
    Failed,
}

impl<T> Resolution<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Resolved(value) => Resolution::Resolved(f(value)),
            Self::Pending => Resolution::Pending,
            Self::Failed => Resolution::Failed,
        }
    }

    /// Gather several results; any failure wins over pending
    pub fn collect(items: impl IntoIterator<Item = Resolution<T>>) -> Resolution<Vec<T>> {
        let mut values = Vec::new();
        let mut pending = false;
        let mut failed = false;
        for item in items {
            match item {
                Self::Resolved(value) => values.push(value),
                Self::Pending => pending = true,
                Self::Failed => failed = true,
            }
        }
        if failed {
            Resolution::Failed
        } else if pending {
            Resolution::Pending
        } else {
            Resolution::Resolved(values)
        }
    }
}

/// Unwrap a resolved value or return the pending/failed state to the caller
macro_rules! ready {
    ($resolution:expr) => {
        match $resolution {
            $crate::sema::Resolution::Resolved(value) => value,
            $crate::sema::Resolution::Pending => return Ok($crate::sema::Resolution::Pending),
            $crate::sema::Resolution::Failed => return Ok($crate::sema::Resolution::Failed),
        }
    };
}
pub(crate) use ready;

/// Pending-dependency counts of parked statements.
///
/// A statement with a non-zero count is not retried; every write that can
/// unblock it calls [`satisfy`](Self::satisfy) on the matching dependency.
#[derive(Debug, Default)]
pub struct DependencyTable {
    waiting: HashMap<Dependency, Vec<StmtId>>,
    pending: HashMap<StmtId, usize>,
    blocked_on: HashMap<StmtId, Vec<Dependency>>,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `stmt` on `dependency`; registering the same pair twice counts once
    pub fn register(&mut self, stmt: StmtId, dependency: Dependency) {
        let blocked = self.blocked_on.entry(stmt).or_default();
        if blocked.contains(&dependency) {
            return;
        }
        blocked.push(dependency);
        self.waiting.entry(dependency).or_default().push(stmt);
        *self.pending.entry(stmt).or_default() += 1;
    }

    /// Release every statement waiting on `dependency`. Returns how many
    /// statements became ready to retry.
    pub fn satisfy(&mut self, dependency: Dependency) -> usize {
        let Some(waiters) = self.waiting.remove(&dependency) else {
            return 0;
        };
        let mut ready = 0;
        for stmt in waiters {
            if let Some(blocked) = self.blocked_on.get_mut(&stmt) {
                blocked.retain(|d| *d != dependency);
            }
            if let Some(count) = self.pending.get_mut(&stmt) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.pending.remove(&stmt);
                    ready += 1;
                }
            }
        }
        ready
    }

    pub fn pending_count(&self, stmt: StmtId) -> usize {
        self.pending.get(&stmt).copied().unwrap_or(0)
    }

    /// Unsatisfied dependencies of `stmt`
    pub fn blocked_on(&self, stmt: StmtId) -> &[Dependency] {
        self.blocked_on.get(&stmt).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_count_tracks_distinct_dependencies() {
        let mut deps = DependencyTable::new();
        let stmt = StmtId(4);
        deps.register(stmt, Dependency::Identifier(IdentId(1)));
        deps.register(stmt, Dependency::Identifier(IdentId(1)));
        deps.register(stmt, Dependency::Imports(ScopeId(2)));
        assert_eq!(deps.pending_count(stmt), 2);

        assert_eq!(deps.satisfy(Dependency::Identifier(IdentId(1))), 0);
        assert_eq!(deps.pending_count(stmt), 1);
        assert_eq!(deps.blocked_on(stmt), &[Dependency::Imports(ScopeId(2))]);

        assert_eq!(deps.satisfy(Dependency::Imports(ScopeId(2))), 1);
        assert_eq!(deps.pending_count(stmt), 0);
        assert!(deps.blocked_on(stmt).is_empty());
    }

    #[test]
    fn test_satisfy_wakes_every_waiter() {
        let mut deps = DependencyTable::new();
        let dependency = Dependency::Statement(StmtId(0));
        deps.register(StmtId(1), dependency);
        deps.register(StmtId(2), dependency);

        assert_eq!(deps.satisfy(dependency), 2);
        // Nothing left to wake
        assert_eq!(deps.satisfy(dependency), 0);
    }

    #[test]
    fn test_reregister_after_satisfy() {
        let mut deps = DependencyTable::new();
        let stmt = StmtId(0);
        let dependency = Dependency::Imports(ScopeId(1));
        deps.register(stmt, dependency);
        deps.satisfy(dependency);
        deps.register(stmt, dependency);
        assert_eq!(deps.pending_count(stmt), 1);
    }

    #[test]
    fn test_collect_prefers_failure() {
        let mixed = Resolution::collect([
            Resolution::Resolved(1),
            Resolution::Pending,
            Resolution::Failed,
        ]);
        assert_eq!(mixed, Resolution::Failed);
        assert_eq!(
            Resolution::collect([Resolution::Resolved(1), Resolution::Pending]),
            Resolution::Pending
        );
        assert_eq!(
            Resolution::collect([Resolution::Resolved(1), Resolution::Resolved(2)]),
            Resolution::Resolved(vec![1, 2])
        );
    }
}
