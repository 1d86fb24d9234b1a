use std::time::Duration;

use async_std::{
    channel::{self, Receiver, Sender},
    task,
};

use crate::{
    aamva::ParseOptions,
    decoder::{DecodeError, DecodedSymbol, DecoderAdapter, SymbolDecoder},
    frame::{AcquisitionError, FrameSource, StillImage},
};

use super::{
    schedule::ScheduledTask, CycleOutcome, ScanOutput, ScannerConfig, SessionController,
    SessionState, SessionStats, Submission,
};

enum Event {
    Tick,
    Decoded {
        cycle: u64,
        result: Result<Vec<DecodedSymbol>, DecodeError>,
    },
    Stop,
}

/// Stops a running [`Scanner`] from another task.
#[derive(Clone)]
pub struct ScannerHandle {
    events: Sender<Event>,
}

impl ScannerHandle {
    /// Requests the scanner to stop.
    ///
    /// Returns immediately. The scan loop stops before submitting another
    /// frame. Calling it more than once has no further effect.
    pub fn stop(&self) {
        // The receiver lives as long as the scanner.
        let _ = self.events.try_send(Event::Stop);
    }
}

/// What a finished scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Last license read during the session, if any.
    pub output: Option<ScanOutput>,

    pub stats: SessionStats,
}

/// Drives a [`SessionController`] with a frame source, a decoder and a
/// cadence timer.
///
/// All events (ticks, decode completions, stop requests) go through one
/// channel and are handled one at a time by [`Scanner::run`].
pub struct Scanner<S: FrameSource> {
    source: S,
    adapter: DecoderAdapter,
    controller: SessionController,
    parse_options: ParseOptions,
    interval: Duration,
    events: (Sender<Event>, Receiver<Event>),
    subscribers: Vec<Sender<ScanOutput>>,
}

impl<S: FrameSource> Scanner<S> {
    /// Creates a scanner with the default configuration, sampling frames at
    /// the interval of `source`.
    pub fn new(source: S, engine: impl SymbolDecoder + 'static) -> Self {
        let interval = source.interval();
        let mut scanner = Self::with_config(source, engine, ScannerConfig::default());
        scanner.interval = interval;
        scanner
    }

    /// Creates a scanner sampling frames every `config.frame_interval_ms`.
    pub fn with_config(
        source: S,
        engine: impl SymbolDecoder + 'static,
        config: ScannerConfig,
    ) -> Self {
        let parse_options = config.parse_options();

        Self {
            source,
            adapter: DecoderAdapter::with_options(engine, config.reader.clone()),
            controller: SessionController::new(config.read_policy, parse_options),
            parse_options,
            interval: config.frame_interval(),
            events: channel::unbounded(),
            subscribers: Vec::new(),
        }
    }

    pub fn handle(&self) -> ScannerHandle {
        ScannerHandle {
            events: self.events.0.clone(),
        }
    }

    /// Returns a channel receiving every record published from now on.
    pub fn subscribe(&mut self) -> Receiver<ScanOutput> {
        let (sender, receiver) = channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn output(&self) -> Option<&ScanOutput> {
        self.controller.output()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn adapter(&self) -> &DecoderAdapter {
        &self.adapter
    }

    /// Time between two frames.
    pub fn frame_interval(&self) -> Duration {
        self.interval
    }

    /// Scans until a license is read (with
    /// [`ReadPolicy::StopOnRead`](super::ReadPolicy::StopOnRead)), the
    /// handle requests a stop, or the source fails.
    ///
    /// The source is released on every exit path. Only acquisition errors
    /// end the scan with an error; decode errors are logged and the scan goes
    /// on.
    pub async fn run(&mut self) -> Result<ScanSummary, AcquisitionError> {
        // Leftovers from a previous run: stop requests sent while idle are
        // dropped, decodes that completed after it stopped are reported.
        while let Ok(event) = self.events.1.try_recv() {
            if let Event::Decoded { cycle, result } = event {
                self.controller.complete(cycle, result, &mut self.source);
            }
        }

        self.controller.start(&mut self.source)?;

        let ticks = self.events.0.clone();
        let ticker = ScheduledTask::every(self.interval, move || {
            ticks.try_send(Event::Tick).is_ok()
        });

        let result = self.event_loop().await;

        ticker.cancel();
        self.controller.stop(&mut self.source);

        result.map(|()| ScanSummary {
            output: self.controller.output().cloned(),
            stats: self.controller.stats(),
        })
    }

    async fn event_loop(&mut self) -> Result<(), AcquisitionError> {
        while self.controller.state().is_capturing() {
            let Ok(event) = self.events.1.recv().await else {
                break;
            };

            match event {
                Event::Tick => {
                    if let Some(submission) = self.controller.tick(&mut self.source)? {
                        self.submit(submission);
                    }
                }
                Event::Decoded { cycle, result } => {
                    let outcome = self.controller.complete(cycle, result, &mut self.source);
                    if let CycleOutcome::Record(output) = outcome {
                        self.publish(output);
                    }
                }
                Event::Stop => self.controller.stop(&mut self.source),
            }
        }

        Ok(())
    }

    fn submit(&self, Submission { cycle, frame }: Submission) {
        let adapter = self.adapter.clone();
        let events = self.events.0.clone();

        task::spawn(async move {
            let result = adapter.decode(frame).await;
            let _ = events.send(Event::Decoded { cycle, result }).await;
        });
    }

    fn publish(&mut self, output: ScanOutput) {
        self.subscribers
            .retain(|subscriber| subscriber.try_send(output.clone()).is_ok());
    }

    /// Reads a single uploaded image.
    ///
    /// Runs one capture, decode and parse cycle outside of the scan loop:
    /// the session state and the published output are left untouched.
    pub async fn scan_still(&self, image: StillImage) -> Result<Option<ScanOutput>, DecodeError> {
        scan_still(&self.adapter, image, &self.parse_options).await
    }
}

/// Reads a single uploaded image.
///
/// Returns `None` when no symbol carrying text is found. The record of the
/// returned output is empty when the text holds no known data element.
pub async fn scan_still(
    adapter: &DecoderAdapter,
    image: StillImage,
    options: &ParseOptions,
) -> Result<Option<ScanOutput>, DecodeError> {
    let symbols = adapter.decode(image.into_frame()).await?;
    let output = ScanOutput::from_symbols(symbols, options);

    match &output {
        Some(output) => tracing::info!(fields = output.record.len(), "still image read"),
        None => tracing::debug!("no symbol in still image"),
    }

    Ok(output)
}
