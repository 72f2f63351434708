use std::io::{Cursor, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Instant;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BundleError;

/// DEFLATE level used for every bundle entry.
const DEFLATE_LEVEL: i64 = 6;

/// Single-resolution completion signal for one in-flight entry. Consumed by
/// `resolve`, so an entry can never complete twice.
pub struct CompletionSignal {
    sender: Sender<Result<Vec<u8>, BundleError>>,
}

impl CompletionSignal {
    pub fn resolve(self, result: Result<Vec<u8>, BundleError>) {
        // The waiting side may already have given up on the deadline.
        let _ = self.sender.send(result);
    }
}

/// One pending entry. Resolves at most once with a finished single-entry
/// archive fragment.
pub struct CompressionTicket {
    name: String,
    receiver: Receiver<Result<Vec<u8>, BundleError>>,
}

pub enum TicketOutcome {
    Completed(Vec<u8>),
    Failed(BundleError),
    /// The compressor dropped its signal without resolving.
    Abandoned,
    TimedOut,
}

impl CompressionTicket {
    pub fn channel(name: &str) -> (CompressionTicket, CompletionSignal) {
        let (sender, receiver) = mpsc::channel();
        (
            CompressionTicket {
                name: name.to_string(),
                receiver,
            },
            CompletionSignal { sender },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the entry resolves or the shared deadline passes.
    pub fn wait_until(&self, deadline: Instant) -> TicketOutcome {
        let budget = deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(budget) {
            Ok(Ok(chunk)) => TicketOutcome::Completed(chunk),
            Ok(Err(err)) => TicketOutcome::Failed(err),
            Err(RecvTimeoutError::Disconnected) => TicketOutcome::Abandoned,
            Err(RecvTimeoutError::Timeout) => TicketOutcome::TimedOut,
        }
    }
}

/// Starts compression of one named entry. Implementations may resolve the
/// ticket synchronously, from another thread, or never; the writer bounds
/// the wait either way.
pub trait EntryCompressor: Send + Sync {
    fn begin(&self, name: &str, bytes: &[u8]) -> CompressionTicket;
}

/// Default compressor: resolves immediately with a DEFLATE level-6 fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCompressor;

impl EntryCompressor for DeflateCompressor {
    fn begin(&self, name: &str, bytes: &[u8]) -> CompressionTicket {
        let (ticket, signal) = CompressionTicket::channel(name);
        signal.resolve(deflate_fragment(name, bytes));
        ticket
    }
}

/// Compresses one entry into its own single-entry archive, so the finished
/// chunk can later be raw-copied into the bundle without recompression.
pub fn deflate_fragment(name: &str, bytes: &[u8]) -> Result<Vec<u8>, BundleError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL));
    writer
        .start_file(name, options)
        .map_err(|err| BundleError::Container(err.to_string()))?;
    writer
        .write_all(bytes)
        .map_err(|err| BundleError::Container(err.to_string()))?;
    let cursor = writer
        .finish()
        .map_err(|err| BundleError::Container(err.to_string()))?;
    Ok(cursor.into_inner())
}
