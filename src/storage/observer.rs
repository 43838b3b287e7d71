//! Diagnostic hook for statements sent to the engine

use crate::sql::Statement;

/// Sees every schema-definition, mutating and reading statement just before
/// it runs. Observation only: an observer cannot veto a statement.
pub trait StatementObserver: Send + Sync {
    fn on_statement(&self, statement: &Statement);
}

/// Logs statements under the `recordstore::sql` target at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StatementObserver for TracingObserver {
    fn on_statement(&self, statement: &Statement) {
        tracing::debug!(
            target: "recordstore::sql",
            params = statement.params.len(),
            "{}",
            statement.sql
        );
    }
}

impl<F> StatementObserver for F
where
    F: Fn(&Statement) + Send + Sync,
{
    fn on_statement(&self, statement: &Statement) {
        self(statement)
    }
}
