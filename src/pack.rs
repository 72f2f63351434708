use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;
use zip::{ZipArchive, ZipWriter};

use crate::assets::AssetCollection;
use crate::compress::{CompressionTicket, DeflateCompressor, EntryCompressor, TicketOutcome};
use crate::domain::{AssetId, PlotKind};
use crate::error::BundleError;
use crate::naming::NameCodec;

/// Default bound on how long a build waits for in-flight entries.
const DEFAULT_WAIT_BUDGET: Duration = Duration::from_secs(5);

/// Non-fatal degradations accumulated during one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    EntryFailed { name: String, reason: String },
    EntryTimedOut { name: String },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::EntryFailed { name, reason } => {
                write!(f, "failed to process {name}: {reason}")
            }
            ExportWarning::EntryTimedOut { name } => {
                write!(f, "{name} did not compress in time and was left out")
            }
        }
    }
}

/// A finished export: the archive bytes plus what went into them.
#[derive(Debug, Clone)]
pub struct BuiltBundle {
    pub bytes: Arc<[u8]>,
    pub entry_count: usize,
    pub warnings: Vec<ExportWarning>,
}

impl BuiltBundle {
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Produces one archive from a collection. Entries are compressed
/// independently and the container is finalized only after every entry has
/// resolved or the wait budget has expired.
pub struct BundleWriter<C = DeflateCompressor> {
    codec: NameCodec,
    compressor: C,
    wait_budget: Duration,
}

impl BundleWriter<DeflateCompressor> {
    pub fn new() -> Self {
        Self::with_compressor(DeflateCompressor)
    }
}

impl Default for BundleWriter<DeflateCompressor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: EntryCompressor> BundleWriter<C> {
    pub fn with_compressor(compressor: C) -> Self {
        Self {
            codec: NameCodec::new(),
            compressor,
            wait_budget: DEFAULT_WAIT_BUDGET,
        }
    }

    pub fn with_wait_budget(mut self, budget: Duration) -> Self {
        self.wait_budget = budget;
        self
    }

    /// Builds the archive. Entries appear in collection iteration order:
    /// each event's slots in fixed kind order, then the filter-comparison
    /// image, then metadata.
    pub fn build(&self, collection: &AssetCollection) -> Result<BuiltBundle, BundleError> {
        if collection.is_empty() {
            return Err(BundleError::EmptyCollection);
        }

        let mut tickets: Vec<CompressionTicket> = Vec::new();
        for (event, plots) in collection.events() {
            for kind in PlotKind::ALL {
                if let Some(image) = plots.slot(kind) {
                    let name = self.codec.encode(&AssetId::Event {
                        event: event.clone(),
                        kind,
                    });
                    tickets.push(self.compressor.begin(&name, &image.bytes));
                }
            }
        }
        if let Some(image) = collection.filter_comparison() {
            let name = self.codec.encode(&AssetId::FilterComparison);
            tickets.push(self.compressor.begin(&name, &image.bytes));
        }
        if let Some(metadata) = collection.metadata() {
            let body = serde_json::to_vec(metadata)
                .map_err(|err| BundleError::MetadataEncode(err.to_string()))?;
            let name = self.codec.encode(&AssetId::Metadata);
            tickets.push(self.compressor.begin(&name, &body));
        }

        let deadline = Instant::now() + self.wait_budget;
        let mut warnings = Vec::new();
        let mut completed = Vec::new();
        for ticket in tickets {
            match ticket.wait_until(deadline) {
                TicketOutcome::Completed(chunk) => {
                    completed.push((ticket.name().to_string(), chunk));
                }
                TicketOutcome::Failed(err) => {
                    warn!(entry = ticket.name(), error = %err, "entry failed during export");
                    warnings.push(ExportWarning::EntryFailed {
                        name: ticket.name().to_string(),
                        reason: err.to_string(),
                    });
                }
                TicketOutcome::Abandoned => {
                    warn!(entry = ticket.name(), "compressor dropped the entry");
                    warnings.push(ExportWarning::EntryFailed {
                        name: ticket.name().to_string(),
                        reason: "compressor abandoned the entry".to_string(),
                    });
                }
                TicketOutcome::TimedOut => {
                    warn!(entry = ticket.name(), "entry did not complete before the deadline");
                    warnings.push(ExportWarning::EntryTimedOut {
                        name: ticket.name().to_string(),
                    });
                }
            }
        }

        if completed.is_empty() {
            return Err(BundleError::ExportFailed);
        }

        // Completed fragments are raw-copied so a bad one can never leave
        // the shared container half-written.
        let mut container = ZipWriter::new(Cursor::new(Vec::new()));
        let mut copied = 0usize;
        for (name, chunk) in completed {
            match raw_copy_entry(&mut container, &chunk) {
                Ok(()) => copied += 1,
                Err(err) => {
                    warn!(entry = %name, error = %err, "dropping unreadable compressed chunk");
                    warnings.push(ExportWarning::EntryFailed {
                        name,
                        reason: err.to_string(),
                    });
                }
            }
        }
        if copied == 0 {
            return Err(BundleError::ExportFailed);
        }
        let cursor = container
            .finish()
            .map_err(|err| BundleError::Container(err.to_string()))?;
        Ok(BuiltBundle {
            bytes: Arc::from(cursor.into_inner()),
            entry_count: copied,
            warnings,
        })
    }
}

fn raw_copy_entry(
    container: &mut ZipWriter<Cursor<Vec<u8>>>,
    chunk: &[u8],
) -> Result<(), BundleError> {
    let mut fragment =
        ZipArchive::new(Cursor::new(chunk)).map_err(|err| BundleError::Container(err.to_string()))?;
    if fragment.len() == 0 {
        return Err(BundleError::Container("fragment holds no entry".to_string()));
    }
    let entry = fragment
        .by_index_raw(0)
        .map_err(|err| BundleError::Container(err.to_string()))?;
    container
        .raw_copy_file(entry)
        .map_err(|err| BundleError::Container(err.to_string()))?;
    Ok(())
}
