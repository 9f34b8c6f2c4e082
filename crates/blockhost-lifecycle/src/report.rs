use serde::Serialize;

/// Outcome of replaying a single stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplayOutcome {
  Watched,
  Failed,
  Corrupt,
}

/// Summary of a startup replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
  /// Records whose watch was invoked.
  pub attempted: usize,
  /// Records whose watch succeeded.
  pub succeeded: usize,
  /// Records whose watch failed.
  pub failed: usize,
  /// Records skipped because their stored values did not decode.
  pub corrupt: usize,
  /// Triggers whose records could not be loaded at all.
  pub unreadable: usize,
}

impl ReplayReport {
  pub(crate) fn record(&mut self, outcome: ReplayOutcome) {
    match outcome {
      ReplayOutcome::Watched => {
        self.attempted += 1;
        self.succeeded += 1;
      }
      ReplayOutcome::Failed => {
        self.attempted += 1;
        self.failed += 1;
      }
      ReplayOutcome::Corrupt => self.corrupt += 1,
    }
  }

  /// Fold another report into this one.
  pub fn merge(&mut self, other: &ReplayReport) {
    self.attempted += other.attempted;
    self.succeeded += other.succeeded;
    self.failed += other.failed;
    self.corrupt += other.corrupt;
    self.unreadable += other.unreadable;
  }

  /// Whether every stored record was watched again.
  pub fn is_clean(&self) -> bool {
    self.failed == 0 && self.corrupt == 0 && self.unreadable == 0
  }
}
