//! The `watch` session: recognized names in, debounced submissions out.
//!
//! Names arrive one per line from the recognizer's output. They are batched
//! and released on a fixed tick; every distinct name of a batch is handed to
//! the [`Debouncer`] on its own task, so a slow server never delays the next
//! tick.

use std::{future::Future, sync::Arc, time::Duration};

use rollcall_core::debounce::{Debouncer, Decision, SubmitOutcome, Submitter};
use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt},
  task::{JoinError, JoinSet},
  time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

/// Tally of what a session did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  pub recorded:   usize,
  pub already:    usize,
  pub failed:     usize,
  pub suppressed: usize,
}

impl Summary {
  fn add(&mut self, decision: Decision) {
    match decision {
      Decision::Submitted(SubmitOutcome::Recorded) => self.recorded += 1,
      Decision::Submitted(SubmitOutcome::AlreadyRecorded) => self.already += 1,
      Decision::Failed => self.failed += 1,
      Decision::Suppressed => self.suppressed += 1,
      Decision::Ignored | Decision::Discarded => {}
    }
  }

  fn join(&mut self, joined: Result<Decision, JoinError>) {
    match joined {
      Ok(decision) => self.add(decision),
      Err(e) => warn!(error = %e, "submission task failed"),
    }
  }
}

/// Run one recognition session over `input` until it ends or `shutdown`
/// resolves.
///
/// Lines that are not valid UTF-8 are skipped, and a read error ends the
/// input like end of file. At end of input the last batch is flushed and
/// outstanding submissions are awaited. On shutdown the session is stopped
/// at once; outstanding submissions keep running detached and their results
/// are discarded.
pub async fn run<T, R>(
  debouncer: Arc<Debouncer<T>>,
  input: R,
  tick: Duration,
  shutdown: impl Future<Output = ()>,
) -> Summary
where
  T: Submitter + 'static,
  R: AsyncBufRead + Unpin,
{
  let mut segments = input.split(b'\n');
  let mut pending: Vec<String> = Vec::new();
  let mut tasks: JoinSet<Decision> = JoinSet::new();
  let mut summary = Summary::default();
  let mut eof = false;

  let mut ticker = tokio::time::interval(tick);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  tokio::pin!(shutdown);

  debouncer.start();

  loop {
    tokio::select! {
      _ = &mut shutdown => {
        info!(in_flight = tasks.len(), "interrupted, stopping session");
        debouncer.stop();
        tasks.detach_all();
        return summary;
      }
      segment = segments.next_segment(), if !eof => match segment {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
          Ok(line) => pending.push(line),
          Err(e) => warn!(error = %e, "skipping line that is not valid UTF-8"),
        },
        Ok(None) => eof = true,
        Err(e) => {
          warn!(error = %e, "failed to read input, ending session");
          eof = true;
        }
      },
      _ = ticker.tick() => {
        dispatch(&debouncer, &mut pending, &mut tasks);
        if eof {
          break;
        }
      }
      Some(joined) = tasks.join_next(), if !tasks.is_empty() => summary.join(joined),
    }
  }

  while let Some(joined) = tasks.join_next().await {
    summary.join(joined);
  }
  debouncer.stop();
  summary
}

/// Hand each distinct name of the batch to the debouncer on its own task.
fn dispatch<T>(
  debouncer: &Arc<Debouncer<T>>,
  pending: &mut Vec<String>,
  tasks: &mut JoinSet<Decision>,
) where
  T: Submitter + 'static,
{
  let mut batch: Vec<String> = Vec::new();
  for name in pending.drain(..) {
    let name = name.trim();
    if !name.is_empty() && !batch.iter().any(|n| n == name) {
      batch.push(name.to_owned());
    }
  }
  if !batch.is_empty() {
    debug!(names = ?batch, "tick");
  }

  for name in batch {
    let debouncer = Arc::clone(debouncer);
    tasks.spawn(async move { debouncer.on_recognized(&name).await });
  }
}
