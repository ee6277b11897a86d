//! Datalink capture loop.
//!
//! Frames are read on a dedicated OS thread (pnet receivers block) and
//! forwarded over an unbounded tokio channel. The loop wakes up at least every
//! [`CAPTURE_READ_TIMEOUT`](crate::network::channel::CAPTURE_READ_TIMEOUT) to
//! check its stop flag.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use anyhow::{Context, anyhow};
use pnet::datalink::DataLinkReceiver;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::network::channel;

#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
    pub captured_at: SystemTime,
}

pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Opens a capture on the interface called `device_name` and starts reading.
    pub fn start(device_name: &str) -> anyhow::Result<(Self, UnboundedReceiver<CapturedFrame>)> {
        let intf = channel::find_interface(device_name)
            .with_context(|| format!("interface {device_name} disappeared"))?;
        let mut rx = channel::open_capture(&intf)?;

        let (tx, queue_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name(format!("capture-{device_name}"))
            .spawn(move || capture_loop(rx.as_mut(), &tx, &flag))
            .context("spawning capture thread")?;

        debug!(device = %device_name, "capture started");
        Ok((
            Self {
                stop,
                worker: Some(worker),
            },
            queue_rx,
        ))
    }

    /// Raises the stop flag and waits for the capture thread to exit.
    pub fn stop(&mut self) -> anyhow::Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn capture_loop(
    rx: &mut dyn DataLinkReceiver,
    tx: &UnboundedSender<CapturedFrame>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        match rx.next() {
            Ok(frame) => {
                let frame = CapturedFrame {
                    data: frame.to_vec(),
                    captured_at: SystemTime::now(),
                };
                if tx.send(frame).is_err() {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
            Err(e) => {
                warn!(error = %e, "capture aborted");
                break;
            }
        }
    }
    debug!("capture loop finished");
}
