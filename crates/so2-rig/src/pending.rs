//! Pending per-radio commands
//!
//! Callers never touch the radio directly. A request only records the
//! desired end state in one of four fields; the drain tick later takes every
//! field at once and issues them. Setting a field twice before a tick leaves
//! only the latest request, and each field remembers when it was last set so
//! the drain can issue them in that order.

use so2_protocol::{Passband, RigMode};

/// Requested frequency change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyRequest {
    /// Tune to this frequency in Hz
    Absolute(u64),
    /// Move by this many Hz from wherever the radio is
    Delta(i64),
}

impl FrequencyRequest {
    /// Resolve against the current frequency
    ///
    /// Returns `None` for a delta when the current frequency is unknown.
    pub fn resolve(self, current: Option<u64>) -> Option<u64> {
        match self {
            FrequencyRequest::Absolute(hz) => Some(hz),
            FrequencyRequest::Delta(delta) => current.map(|hz| offset(hz, delta)),
        }
    }
}

fn offset(hz: u64, delta: i64) -> u64 {
    if delta >= 0 {
        hz.saturating_add(delta.unsigned_abs())
    } else {
        hz.saturating_sub(delta.unsigned_abs())
    }
}

/// One command taken from the pending fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommand {
    /// Key (true) or unkey (false)
    Ptt(bool),
    /// Frequency change
    Frequency(FrequencyRequest),
    /// Mode and passband change
    Mode(RigMode, Passband),
    /// Zero the RIT offset
    ClearRit,
}

/// Pending command fields for one radio
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingFields {
    seq: u64,
    ptt: Option<(u64, bool)>,
    frequency: Option<(u64, FrequencyRequest)>,
    mode: Option<(u64, (RigMode, Passband))>,
    clear_rit: Option<u64>,
}

impl PendingFields {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Request PTT on or off, replacing any earlier PTT request
    pub fn set_ptt(&mut self, on: bool) {
        let seq = self.next_seq();
        self.ptt = Some((seq, on));
    }

    /// Request an absolute frequency, replacing any earlier request
    pub fn set_frequency(&mut self, hz: u64) {
        let seq = self.next_seq();
        self.frequency = Some((seq, FrequencyRequest::Absolute(hz)));
    }

    /// Request a relative move; moves accumulate until the next drain
    pub fn add_frequency_delta(&mut self, delta: i64) {
        let seq = self.next_seq();
        let request = match self.frequency {
            Some((_, FrequencyRequest::Absolute(hz))) => FrequencyRequest::Absolute(offset(hz, delta)),
            Some((_, FrequencyRequest::Delta(prev))) => {
                FrequencyRequest::Delta(prev.saturating_add(delta))
            }
            None => FrequencyRequest::Delta(delta),
        };
        self.frequency = Some((seq, request));
    }

    /// Request a mode change
    pub fn set_mode(&mut self, mode: RigMode, passband: Passband) {
        let seq = self.next_seq();
        self.mode = Some((seq, (mode, passband)));
    }

    /// Request a RIT clear
    pub fn request_clear_rit(&mut self) {
        let seq = self.next_seq();
        self.clear_rit = Some(seq);
    }

    /// Pending PTT request, if any
    pub fn ptt(&self) -> Option<bool> {
        self.ptt.map(|(_, on)| on)
    }

    /// Pending frequency request, if any
    pub fn frequency(&self) -> Option<FrequencyRequest> {
        self.frequency.map(|(_, request)| request)
    }

    /// Pending mode request, if any
    pub fn mode(&self) -> Option<(RigMode, Passband)> {
        self.mode.map(|(_, mode)| mode)
    }

    /// Whether a RIT clear is pending
    pub fn rit_clear(&self) -> bool {
        self.clear_rit.is_some()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.ptt.is_none()
            && self.frequency.is_none()
            && self.mode.is_none()
            && self.clear_rit.is_none()
    }

    /// Take every pending command, oldest request first, leaving the fields
    /// empty
    pub fn take(&mut self) -> Vec<PendingCommand> {
        let mut commands: Vec<(u64, PendingCommand)> = Vec::with_capacity(4);
        if let Some((seq, on)) = self.ptt.take() {
            commands.push((seq, PendingCommand::Ptt(on)));
        }
        if let Some((seq, request)) = self.frequency.take() {
            commands.push((seq, PendingCommand::Frequency(request)));
        }
        if let Some((seq, (mode, passband))) = self.mode.take() {
            commands.push((seq, PendingCommand::Mode(mode, passband)));
        }
        if let Some(seq) = self.clear_rit.take() {
            commands.push((seq, PendingCommand::ClearRit));
        }
        commands.sort_by_key(|(seq, _)| *seq);
        commands.into_iter().map(|(_, cmd)| cmd).collect()
    }

    /// Drop every pending request
    pub fn clear(&mut self) {
        self.ptt = None;
        self.frequency = None;
        self.mode = None;
        self.clear_rit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_last_write_wins() {
        let mut pending = PendingFields::default();
        pending.set_frequency(14_025_000);
        pending.set_frequency(14_030_000);

        assert_eq!(
            pending.take(),
            vec![PendingCommand::Frequency(FrequencyRequest::Absolute(14_030_000))]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_deltas_accumulate() {
        let mut pending = PendingFields::default();
        pending.add_frequency_delta(100);
        pending.add_frequency_delta(-30);
        assert_eq!(pending.frequency(), Some(FrequencyRequest::Delta(70)));

        pending.set_frequency(7_000_000);
        pending.add_frequency_delta(500);
        assert_eq!(
            pending.frequency(),
            Some(FrequencyRequest::Absolute(7_000_500))
        );
    }

    #[test]
    fn test_issue_order_follows_last_set() {
        let mut pending = PendingFields::default();
        pending.set_ptt(true);
        pending.set_frequency(21_000_000);
        pending.request_clear_rit();
        pending.set_ptt(false);

        assert_eq!(
            pending.take(),
            vec![
                PendingCommand::Frequency(FrequencyRequest::Absolute(21_000_000)),
                PendingCommand::ClearRit,
                PendingCommand::Ptt(false),
            ]
        );
    }

    #[test]
    fn test_resolve() {
        assert_eq!(FrequencyRequest::Absolute(5).resolve(None), Some(5));
        assert_eq!(FrequencyRequest::Delta(-100).resolve(Some(7_000_000)), Some(6_999_900));
        assert_eq!(FrequencyRequest::Delta(-100).resolve(Some(50)), Some(0));
        assert_eq!(FrequencyRequest::Delta(10).resolve(None), None);
    }

    proptest! {
        #[test]
        fn ptt_requests_are_exclusive(calls in proptest::collection::vec(any::<bool>(), 1..50)) {
            let mut pending = PendingFields::default();
            for on in &calls {
                pending.set_ptt(*on);
                prop_assert_eq!(pending.ptt(), Some(*on));
            }
            let issued: Vec<_> = pending
                .take()
                .into_iter()
                .filter(|cmd| matches!(cmd, PendingCommand::Ptt(_)))
                .collect();
            prop_assert_eq!(issued, vec![PendingCommand::Ptt(*calls.last().unwrap())]);
        }
    }
}
