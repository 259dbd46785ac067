//! The recognition debouncer.
//!
//! Recognition runs on a fixed polling tick and reports the same person many
//! times a minute. The debouncer turns that stream into at most one successful
//! submission per distinct name per session, independent of server latency:
//! a name is "in flight" from the moment its submission starts and
//! "confirmed" once the server has answered, whether the answer was a fresh
//! record or an existing one.
//!
//! A failed submission releases the name so the next tick retries it.

use std::{
  collections::{HashMap, HashSet},
  future::Future,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::student::Student;

/// Label produced by the face matcher for a face it could not identify.
pub const UNRECOGNIZED: &str = "unknown";

// ─── Submission ──────────────────────────────────────────────────────────────

/// One attendance submission derived from a recognition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
  pub name:        String,
  pub roll_no:     String,
  pub recorded_at: DateTime<Utc>,
  pub source:      String,
}

/// Server verdict for a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
  Recorded,
  AlreadyRecorded,
}

/// Delivers sightings to the attendance recorder (normally over HTTP).
pub trait Submitter: Send + Sync {
  type Error: std::fmt::Display + Send + Sync + 'static;

  fn submit(
    &self,
    sighting: Sighting,
  ) -> impl Future<Output = Result<SubmitOutcome, Self::Error>> + Send + '_;
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// What [`Debouncer::on_recognized`] did with a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  /// Session stopped, blank name, or the unrecognized sentinel.
  Ignored,
  /// Already confirmed or in flight in this session; no network call.
  Suppressed,
  /// Submitted and confirmed.
  Submitted(SubmitOutcome),
  /// Submitted but the call failed; the name will be retried.
  Failed,
  /// Submitted, but the session was stopped or restarted before the answer
  /// arrived. The answer was discarded.
  Discarded,
}

// ─── Session state ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
enum Session {
  #[default]
  Stopped,
  Active {
    generation: u64,
    confirmed:  HashSet<String>,
    in_flight:  HashSet<String>,
  },
}

#[derive(Debug, Default)]
struct State {
  session:     Session,
  generations: u64,
}

// ─── Debouncer ───────────────────────────────────────────────────────────────

/// Session-scoped de-duplication of recognition events.
///
/// The debouncer is inert until [`start`](Self::start) is called; events
/// received while stopped are ignored.
pub struct Debouncer<T> {
  submitter: T,
  source:    String,
  /// Name → roll number, used to fill in [`Sighting::roll_no`].
  roster:    HashMap<String, String>,
  state:     Mutex<State>,
}

impl<T: Submitter> Debouncer<T> {
  pub fn new(submitter: T, source: impl Into<String>) -> Self {
    Self {
      submitter,
      source: source.into(),
      roster: HashMap::new(),
      state: Mutex::new(State::default()),
    }
  }

  /// Attach the student roster; roll numbers are looked up by exact name.
  pub fn with_roster(mut self, students: impl IntoIterator<Item = Student>) -> Self {
    self.roster = students
      .into_iter()
      .map(|s| (s.name, s.roll_no))
      .collect();
    self
  }

  /// Begin a new session with an empty confirmed set. Restarting an active
  /// session discards its state.
  pub fn start(&self) {
    let mut state = self.lock();
    state.generations += 1;
    state.session = Session::Active {
      generation: state.generations,
      confirmed:  HashSet::new(),
      in_flight:  HashSet::new(),
    };
    info!(generation = state.generations, "recognition session started");
  }

  /// End the session. In-flight submissions are not cancelled, but their
  /// results are discarded.
  pub fn stop(&self) {
    let mut state = self.lock();
    if let Session::Active { confirmed, .. } = &state.session {
      info!(confirmed = confirmed.len(), "recognition session stopped");
    }
    state.session = Session::Stopped;
  }

  pub fn is_active(&self) -> bool {
    matches!(self.lock().session, Session::Active { .. })
  }

  /// Whether `name` has been confirmed in the current session.
  pub fn is_confirmed(&self, name: &str) -> bool {
    match &self.lock().session {
      Session::Active { confirmed, .. } => confirmed.contains(name),
      Session::Stopped => false,
    }
  }

  /// Number of names confirmed in the current session.
  pub fn confirmed_count(&self) -> usize {
    match &self.lock().session {
      Session::Active { confirmed, .. } => confirmed.len(),
      Session::Stopped => 0,
    }
  }

  /// Handle one recognition event.
  pub async fn on_recognized(&self, name: &str) -> Decision {
    let name = name.trim();
    if name.is_empty() || name == UNRECOGNIZED {
      return Decision::Ignored;
    }

    let generation = {
      let mut state = self.lock();
      match &mut state.session {
        Session::Stopped => return Decision::Ignored,
        Session::Active { generation, confirmed, in_flight } => {
          if confirmed.contains(name) || in_flight.contains(name) {
            return Decision::Suppressed;
          }
          in_flight.insert(name.to_owned());
          *generation
        }
      }
    };

    let sighting = Sighting {
      name:        name.to_owned(),
      roll_no:     self.roster.get(name).cloned().unwrap_or_default(),
      recorded_at: Utc::now(),
      source:      self.source.clone(),
    };

    let result = self.submitter.submit(sighting).await;

    let mut state = self.lock();
    let Session::Active { generation: current, confirmed, in_flight } = &mut state.session
    else {
      debug!(%name, "session stopped before submission finished");
      return Decision::Discarded;
    };
    if *current != generation {
      debug!(%name, "session restarted before submission finished");
      return Decision::Discarded;
    }

    in_flight.remove(name);
    match result {
      Ok(outcome) => {
        confirmed.insert(name.to_owned());
        match outcome {
          SubmitOutcome::Recorded => info!(%name, "attendance recorded"),
          SubmitOutcome::AlreadyRecorded => info!(%name, "already marked for today"),
        }
        Decision::Submitted(outcome)
      }
      Err(e) => {
        warn!(%name, error = %e, "failed to record attendance, will retry");
        Decision::Failed
      }
    }
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
