use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use dlid_scanner::{
    decoder::{BarcodeFormat, DecodedSymbol, ReaderOptions, SymbolDecoder},
    frame::{AcquisitionError, CaptureConstraints, CaptureDevice, Frame},
};

pub const FRAME_SIZE: u32 = 8;

/// Capture device producing uniform gray frames.
#[derive(Debug, Default)]
pub struct FakeCamera {
    pub deny: bool,
    pub empty_frames: bool,
    pub acquired: bool,
    pub acquisitions: usize,
    pub releases: usize,
    pub constraints: Option<CaptureConstraints>,
}

impl CaptureDevice for FakeCamera {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<(), AcquisitionError> {
        self.constraints = Some(*constraints);
        if self.deny {
            return Err(AcquisitionError::PermissionDenied);
        }

        self.acquired = true;
        self.acquisitions += 1;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, AcquisitionError> {
        if !self.acquired {
            return Err(AcquisitionError::StreamEnded);
        }

        if self.empty_frames {
            Ok(Frame::new(Vec::new(), 0, 0))
        } else {
            let len = (FRAME_SIZE * FRAME_SIZE * 4) as usize;
            Ok(Frame::new(vec![0x80; len], FRAME_SIZE, FRAME_SIZE))
        }
    }

    fn release(&mut self) {
        if self.acquired {
            self.acquired = false;
            self.releases += 1;
        }
    }
}

/// Counters shared between a [`ScriptedDecoder`] and the test observing it.
#[derive(Debug, Default, Clone)]
pub struct Probe {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decoder engine answering from a script, then recognizing nothing.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDecoder {
    script: Arc<Mutex<VecDeque<Vec<DecodedSymbol>>>>,
    latency: Duration,
    pub probe: Probe,
}

impl ScriptedDecoder {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Vec<DecodedSymbol>>,
    {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn read_barcodes(&self, image: &[u8], options: &ReaderOptions) -> Vec<DecodedSymbol> {
        assert!(image.starts_with(b"\x89PNG"));
        assert_eq!(options.formats, [BarcodeFormat::Pdf417]);

        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.probe.calls.fetch_add(1, Ordering::SeqCst);

        std::thread::sleep(self.latency);
        let symbols = self.script.lock().unwrap().pop_front().unwrap_or_default();

        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        symbols
    }
}

pub fn license(text: &str) -> Vec<DecodedSymbol> {
    vec![DecodedSymbol::new(text, BarcodeFormat::Pdf417)]
}

pub fn nothing() -> Vec<DecodedSymbol> {
    Vec::new()
}
