/*! Sample acquisition on a background thread.

The tuner is owned by a reader thread. Settings changes are sent to it as
[`Command`]s, and sample blocks come back over a bounded channel.

Every command bumps a generation counter, and every block is tagged with
the generation that was in effect when it was read. [`Acquisition::read`]
throws away blocks from older generations, so that after a retune nothing
from the old frequency is ever shown.
*/
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::tuner::{Gain, Tuner};
use crate::{Complex, Error, Result};

/// How long to wait for a block of samples before giving up.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

// Keep latency low. FreqShow only ever wants the latest samples.
const MAX_BLOCKS_IN_FLIGHT: usize = 2;

/// Settings change for the tuner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Center frequency, in Hz.
    CenterFreq(f64),
    /// Sample rate, in Hz.
    SampleRate(f64),
    /// Gain.
    Gain(Gain),
    /// Frequency correction, in ppm.
    FreqCorrection(i32),
}

struct SampleBlock {
    generation: u64,
    samples: Result<Vec<Complex>>,
}

/// Handle to the reader thread.
pub struct Acquisition {
    commands: Sender<(u64, Command)>,
    blocks: Receiver<SampleBlock>,
    generation: u64,
    timeout: Duration,
    gone: Option<String>,
}

impl Acquisition {
    /// Start reading from a tuner.
    ///
    /// The tuner is created by `open`, on the reader thread, since some
    /// device handles can't be moved between threads. Returns when the
    /// tuner is open, or with the error from opening it.
    pub fn spawn<F>(open: F, block_size: usize) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn Tuner>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<(u64, Command)>();
        let (tx, rx) = mpsc::sync_channel(MAX_BLOCKS_IN_FLIGHT);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        thread::Builder::new()
            .name("freqshow-reader".to_string())
            .spawn(move || {
                let mut tuner = match open() {
                    Ok(t) => t,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                info!("Reading {} samples at a time from {}", block_size, tuner.name());
                let _ = ready_tx.send(Ok(()));
                let mut generation = 0;
                loop {
                    loop {
                        match cmd_rx.try_recv() {
                            Ok((g, cmd)) => {
                                apply(tuner.as_mut(), cmd);
                                generation = g;
                            }
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => {
                                debug!("Reader: command channel closed, exiting");
                                return;
                            }
                        }
                    }
                    let samples = tuner.read_samples(block_size);
                    let failed = samples.is_err();
                    if tx.send(SampleBlock { generation, samples }).is_err() {
                        debug!("Reader: sample channel closed, exiting");
                        return;
                    }
                    if failed {
                        return;
                    }
                }
            })?;
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: cmd_tx,
                blocks: rx,
                generation: 0,
                timeout: READ_TIMEOUT,
                gone: None,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::AcquisitionGone(
                "reader thread died while opening tuner".to_string(),
            )),
        }
    }

    /// Wait this long for samples, instead of [`READ_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a settings change to the tuner.
    pub fn send(&mut self, cmd: Command) -> Result<()> {
        self.generation += 1;
        trace!("Acquisition: generation {} {:?}", self.generation, cmd);
        self.commands
            .send((self.generation, cmd))
            .map_err(|_| Error::AcquisitionGone(self.gone_reason()))
    }

    /// Current generation. Bumped by every [`send`](Self::send).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read the next block of samples taken with the latest settings.
    pub fn read(&mut self) -> Result<Vec<Complex>> {
        if let Some(msg) = &self.gone {
            return Err(Error::AcquisitionGone(msg.clone()));
        }
        let deadline = Instant::now() + self.timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            let block = match self.blocks.recv_timeout(left) {
                Ok(b) => b,
                Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    let msg = self.gone_reason();
                    self.gone = Some(msg.clone());
                    return Err(Error::AcquisitionGone(msg));
                }
            };
            match block.samples {
                Err(e) => {
                    warn!("Reader failed: {e}");
                    let msg = e.to_string();
                    self.gone = Some(msg.clone());
                    return Err(Error::AcquisitionGone(msg));
                }
                Ok(_) if block.generation < self.generation => {
                    trace!(
                        "Discarding block from generation {}, want {}",
                        block.generation, self.generation
                    );
                }
                Ok(samples) => return Ok(samples),
            }
        }
    }

    fn gone_reason(&self) -> String {
        self.gone
            .clone()
            .unwrap_or_else(|| "reader thread exited".to_string())
    }
}

fn apply(tuner: &mut dyn Tuner, cmd: Command) {
    debug!("{}: {:?}", tuner.name(), cmd);
    // Like FreqShow, a value the hardware doesn't like is just ignored.
    let res = match cmd {
        Command::CenterFreq(hz) => tuner.set_center_freq(hz),
        Command::SampleRate(hz) => tuner.set_sample_rate(hz),
        Command::Gain(g) => tuner.set_gain(g),
        Command::FreqCorrection(ppm) => tuner.set_freq_correction(ppm),
    };
    if let Err(e) = res {
        warn!("{}: ignoring failed {:?}: {}", tuner.name(), cmd, e);
    }
}
