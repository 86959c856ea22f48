//! Reconcile command.

use tracing::warn;

use crate::cli::context::Context;
use crate::cli::{output, Globals};
use crate::core::domain::ResourceId;
use crate::core::reconcile::{Outcome, PassState};
use crate::error::Result;

fn report(id: &ResourceId, outcome: &Outcome) {
    let line = format!("{}  {}", output::key(id), output::state(&outcome.state.to_string()));
    match outcome.state {
        PassState::Ready => output::success(&line),
        PassState::Error => output::error(&line),
        PassState::Missing | PassState::Bypassed | PassState::Ignored => output::dimmed(&line),
    }
    if outcome.requeue {
        output::warn("status not saved; run again");
    }
}

/// Run one pass, or one pass per stored record with `all`.
pub fn execute(globals: &Globals, id: Option<&str>, all: bool) -> Result<()> {
    let ctx = Context::load(globals)?;
    let reconciler = ctx.reconciler()?;

    if all {
        let results = reconciler.reconcile_all()?;
        if results.is_empty() {
            output::dimmed("no encrypted records stored");
        }
        for (id, result) in results {
            match result {
                Ok(outcome) => report(&id, &outcome),
                Err(e) => {
                    warn!(record = %id, error = %e, "pass failed");
                    output::error(&format!("{}  {}", output::key(&id), e));
                }
            }
        }
        return Ok(());
    }

    // clap guarantees an id when --all is absent
    let id: ResourceId = id.unwrap_or_default().parse()?;
    let outcome = reconciler.reconcile(&id)?;
    report(&id, &outcome);
    Ok(())
}
