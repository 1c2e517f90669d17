use crate::domain::{ErrorResult, ParameterProfile};
use crate::io::checkpoint::Checkpoint;

/// Mutable state of one sweep, owned by the controller.
///
/// Transitions:
///
/// - `record_fit`: one more oracle optimization was performed
/// - `accept`: a parameter finished; its result joins the ledger
/// - `skip`: a parameter could not be profiled and is passed over
/// - `reset_for_optimum`: a better optimum was found; all results are dropped
#[derive(Debug, Clone, PartialEq)]
pub struct SweepState {
    reference: f64,
    ledger: Vec<ErrorResult>,
    profiles: Vec<ParameterProfile>,
    cursor: usize,
    restarts: usize,
    fit_count: usize,
}

impl SweepState {
    pub fn new(reference: f64) -> Self {
        Self {
            reference,
            ledger: Vec::new(),
            profiles: Vec::new(),
            cursor: 0,
            restarts: 0,
            fit_count: 0,
        }
    }

    /// Continue a checkpointed sweep. The reference is never raised above `reference`.
    pub fn resume(checkpoint: Checkpoint, reference: f64) -> Self {
        Self {
            reference: reference.min(checkpoint.reference_statistic),
            ledger: checkpoint.ledger,
            profiles: checkpoint.profiles,
            cursor: checkpoint.cursor,
            restarts: 0,
            fit_count: 0,
        }
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn ledger(&self) -> &[ErrorResult] {
        &self.ledger
    }

    pub fn profiles(&self) -> &[ParameterProfile] {
        &self.profiles
    }

    /// Index (into the working list) of the next parameter to process.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    pub fn record_fit(&mut self) {
        self.fit_count += 1;
    }

    pub fn accept(&mut self, result: ErrorResult, profile: ParameterProfile) {
        self.ledger.push(result);
        self.profiles.push(profile);
        self.cursor += 1;
    }

    pub fn skip(&mut self) {
        self.cursor += 1;
    }

    /// Drop every result and start over from the first parameter with `statistic`.
    pub fn reset_for_optimum(&mut self, statistic: f64) {
        debug_assert!(statistic <= self.reference);
        self.reference = statistic;
        self.ledger.clear();
        self.profiles.clear();
        self.cursor = 0;
        self.restarts += 1;
    }

    pub fn into_parts(self) -> (Vec<ErrorResult>, Vec<ParameterProfile>) {
        (self.ledger, self.profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HardCapFlags;

    fn result(id: usize) -> (ErrorResult, ParameterProfile) {
        (
            ErrorResult {
                id,
                name: format!("p{id}"),
                best_fit: 1.0,
                error_minus: 0.5,
                error_plus: 0.5,
                hard_caps: HardCapFlags::default(),
            },
            ParameterProfile {
                id,
                best_fit: 1.0,
                samples: Vec::new(),
                hard_caps: HardCapFlags::default(),
            },
        )
    }

    #[test]
    fn accept_advances_cursor_with_ledger() {
        let mut state = SweepState::new(10.0);
        let (r, p) = result(1);
        state.accept(r, p);
        let (r, p) = result(3);
        state.accept(r, p);
        assert_eq!(state.cursor(), 2);
        assert_eq!(state.ledger().len(), 2);
    }

    #[test]
    fn new_optimum_resets_everything_together() {
        let mut state = SweepState::new(10.0);
        let (r, p) = result(1);
        state.accept(r, p);
        state.reset_for_optimum(8.5);

        assert_eq!(state.cursor(), 0);
        assert!(state.ledger().is_empty());
        assert!(state.profiles().is_empty());
        assert_eq!(state.reference(), 8.5);
        assert_eq!(state.restarts(), 1);
    }
}
