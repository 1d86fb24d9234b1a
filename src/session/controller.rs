use crate::{
    aamva::ParseOptions,
    decoder::{DecodeError, DecodedSymbol},
    frame::{AcquisitionError, Frame, FrameSource},
};

use super::{CapturePhase, ReadPolicy, ScanOutput, SessionState, SessionStats};

/// Frame handed to the decoder for one cycle.
#[derive(Debug)]
pub struct Submission {
    /// Identifies the cycle the decode result must be reported to.
    pub cycle: u64,
    pub frame: Frame,
}

/// What a decode completion did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The result arrived after the session stopped, or belongs to an older
    /// cycle, and was ignored.
    Discarded,

    /// The decoder could not process the frame.
    DecodeFailed,

    /// No symbol was recognized.
    NoSymbol,

    /// A symbol was read but no known data element was found in it.
    NoRecord,

    /// The license read is the one already published.
    Unchanged,

    /// A new record was published.
    Record(ScanOutput),
}

/// Scan session state machine.
///
/// The controller does no I/O and does not keep time: the caller reports
/// ticks and decode completions to it. At most one decode is in flight at any
/// time, including across a stop and a restart: a session started while the
/// decode of a previous session is still running waits for its completion
/// before capturing. A tick arriving while a frame is being decoded is
/// dropped.
#[derive(Debug)]
pub struct SessionController {
    state: SessionState,
    policy: ReadPolicy,
    parse_options: ParseOptions,
    cycle: u64,

    /// First cycle of the current session.
    first_cycle: u64,

    /// Cycle whose decode has not completed yet, whatever the session.
    in_flight: Option<u64>,
    output: Option<ScanOutput>,
    fingerprint: Option<[u8; 32]>,
    stats: SessionStats,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(ReadPolicy::default(), ParseOptions::default())
    }
}

impl SessionController {
    pub fn new(policy: ReadPolicy, parse_options: ParseOptions) -> Self {
        Self {
            state: SessionState::Idle,
            policy,
            parse_options,
            cycle: 0,
            first_cycle: 1,
            in_flight: None,
            output: None,
            fingerprint: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Last published output.
    pub fn output(&self) -> Option<&ScanOutput> {
        self.output.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Starts capturing.
    ///
    /// On acquisition failure the session stays idle. Starting a session that
    /// is already capturing does nothing. Statistics and the record used to
    /// recognize an unchanged license are reset; the last output is kept.
    pub fn start(&mut self, source: &mut impl FrameSource) -> Result<(), AcquisitionError> {
        if self.state.is_capturing() {
            return Ok(());
        }

        source.start()?;

        self.first_cycle = self.cycle + 1;
        self.fingerprint = None;
        self.stats = SessionStats::default();
        self.state = match self.in_flight {
            Some(cycle) => {
                tracing::debug!(cycle, "waiting for the decode of the previous session");
                SessionState::Capturing(CapturePhase::Decoding)
            }
            None => SessionState::Capturing(CapturePhase::WaitingFrame),
        };
        tracing::info!(policy = ?self.policy, "scan session started");
        Ok(())
    }

    /// Handles a cadence tick.
    ///
    /// Returns the frame to decode when the session was waiting for one. A
    /// capture failure stops the session.
    pub fn tick(
        &mut self,
        source: &mut impl FrameSource,
    ) -> Result<Option<Submission>, AcquisitionError> {
        match self.state {
            SessionState::Idle => Ok(None),
            SessionState::Capturing(CapturePhase::Decoding) => {
                self.stats.ticks += 1;
                self.stats.dropped_ticks += 1;
                tracing::trace!(cycle = self.cycle, "decode in flight, dropping tick");
                Ok(None)
            }
            SessionState::Capturing(CapturePhase::WaitingFrame) => {
                self.stats.ticks += 1;
                match source.next_frame() {
                    Ok(frame) => {
                        self.cycle += 1;
                        self.in_flight = Some(self.cycle);
                        self.stats.decodes += 1;
                        self.state = SessionState::Capturing(CapturePhase::Decoding);
                        Ok(Some(Submission {
                            cycle: self.cycle,
                            frame,
                        }))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "frame capture failed");
                        self.stop(source);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Handles the completion of the decode submitted for `cycle`.
    pub fn complete(
        &mut self,
        cycle: u64,
        result: Result<Vec<DecodedSymbol>, DecodeError>,
        source: &mut impl FrameSource,
    ) -> CycleOutcome {
        if self.in_flight != Some(cycle) {
            tracing::debug!(cycle, "discarding unexpected decode result");
            return CycleOutcome::Discarded;
        }

        self.in_flight = None;
        if !self.state.is_capturing() {
            tracing::debug!(cycle, "discarding decode result received after stop");
            return CycleOutcome::Discarded;
        }

        self.state = SessionState::Capturing(CapturePhase::WaitingFrame);
        if cycle < self.first_cycle {
            tracing::debug!(cycle, "discarding decode result of a previous session");
            return CycleOutcome::Discarded;
        }

        let symbols = match result {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::warn!(cycle, error = %e, "decode failed");
                self.stats.decode_errors += 1;
                return CycleOutcome::DecodeFailed;
            }
        };

        if symbols.is_empty() {
            tracing::trace!(cycle, "no symbol recognized");
            self.stats.empty_decodes += 1;
            return CycleOutcome::NoSymbol;
        }

        let output = match ScanOutput::from_symbols(symbols, &self.parse_options) {
            Some(output) if !output.record.is_empty() => output,
            _ => return CycleOutcome::NoRecord,
        };

        let fingerprint = output.record.fingerprint();
        if self.fingerprint == Some(fingerprint) {
            return CycleOutcome::Unchanged;
        }

        tracing::info!(cycle, fields = output.record.len(), "license read");
        self.stats.records += 1;
        self.fingerprint = Some(fingerprint);
        self.output = Some(output.clone());

        if self.policy == ReadPolicy::StopOnRead {
            self.stop(source);
        }

        CycleOutcome::Record(output)
    }

    /// Stops capturing and releases the source.
    ///
    /// A decode in flight is not interrupted but its result will be
    /// discarded, and a restarted session does not capture before it has
    /// been reported. Stopping an idle session only makes sure the source is
    /// released.
    pub fn stop(&mut self, source: &mut impl FrameSource) {
        source.stop();

        if self.state.is_capturing() {
            tracing::info!(stats = ?self.stats, "scan session stopped");
            self.state = SessionState::Idle;
        }
    }
}
