use tracing::debug;

/// Presence-run bookkeeping for the punch debouncer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionState {
    /// Frames the qualifying blob has been continuously present
    pub consecutive_frames: u32,
    /// Whether the current presence run already produced a punch
    pub already_counted: bool,
}

/// A sustained blob presence recognised as one punch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchEvent {
    /// Run length at the moment the punch was recognised
    pub sustained_frames: u32,
}

/// Turns per-frame blob presence into at most one punch per presence run
#[derive(Debug, Clone)]
pub struct PunchDebouncer {
    detect_threshold: u32,
    state: DetectionState,
}

impl PunchDebouncer {
    pub fn new(detect_threshold: u32) -> Self {
        Self {
            detect_threshold,
            state: DetectionState::default(),
        }
    }

    /// Feed one frame's decision; emits a punch once the run exceeds the threshold
    pub fn update(&mut self, has_qualifying_blob: bool) -> Option<PunchEvent> {
        if !has_qualifying_blob {
            self.state = DetectionState::default();
            return None;
        }

        self.state.consecutive_frames = self.state.consecutive_frames.saturating_add(1);

        if self.state.consecutive_frames > self.detect_threshold && !self.state.already_counted {
            self.state.already_counted = true;
            debug!(
                "Punch recognised after {} consecutive frames",
                self.state.consecutive_frames
            );
            return Some(PunchEvent {
                sustained_frames: self.state.consecutive_frames,
            });
        }

        None
    }

    pub fn reset(&mut self) {
        self.state = DetectionState::default();
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn detect_threshold(&self) -> u32 {
        self.detect_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Indices (0-based) of the inputs that produced a punch
    fn punches(threshold: u32, inputs: &[bool]) -> Vec<usize> {
        let mut debouncer = PunchDebouncer::new(threshold);
        inputs
            .iter()
            .enumerate()
            .filter_map(|(i, &present)| debouncer.update(present).map(|_| i))
            .collect()
    }

    #[test]
    fn test_single_event_on_sixth_true() {
        let inputs = [false, true, true, true, true, true, true, false];
        assert_eq!(punches(5, &inputs), vec![6]);
    }

    #[test]
    fn test_run_at_threshold_does_not_fire() {
        let inputs = [true, true, true, true, true, false];
        assert!(punches(5, &inputs).is_empty());
    }

    #[test]
    fn test_long_run_counts_once() {
        let inputs = vec![true; 200];
        assert_eq!(punches(5, &inputs), vec![5]);
    }

    #[test]
    fn test_each_run_counts_separately() {
        let mut inputs = vec![true; 8];
        inputs.push(false);
        inputs.extend(vec![true; 6]);
        inputs.push(false);
        inputs.extend(vec![true; 3]);

        assert_eq!(punches(5, &inputs), vec![5, 14]);
    }

    #[test]
    fn test_matches_reference_rule_for_all_short_sequences() {
        // Exhaustive check over every sequence of length 12
        let len = 12;
        for bits in 0u32..(1 << len) {
            let inputs: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();

            let mut expected = Vec::new();
            let mut run = 0;
            for (i, &present) in inputs.iter().enumerate() {
                if present {
                    run += 1;
                    if run == 6 {
                        expected.push(i);
                    }
                } else {
                    run = 0;
                }
            }

            assert_eq!(punches(5, &inputs), expected, "inputs: {:?}", inputs);
        }
    }

    #[test]
    fn test_false_resets_state() {
        let mut debouncer = PunchDebouncer::new(2);
        for _ in 0..3 {
            debouncer.update(true);
        }
        assert_eq!(
            debouncer.state(),
            DetectionState {
                consecutive_frames: 3,
                already_counted: true
            }
        );

        debouncer.update(false);
        assert_eq!(debouncer.state(), DetectionState::default());
    }

    #[test]
    fn test_event_reports_run_length() {
        let mut debouncer = PunchDebouncer::new(5);
        let event = (0..6).filter_map(|_| debouncer.update(true)).next().unwrap();
        assert_eq!(event.sustained_frames, 6);
    }
}
