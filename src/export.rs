use crate::assets::AssetCollection;
use crate::compress::{DeflateCompressor, EntryCompressor};
use crate::error::BundleError;
use crate::pack::{BuiltBundle, BundleWriter};

/// Fixed name the bundle is offered under for download.
pub const DOWNLOAD_FILE_NAME: &str = "event_plots.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Seam for the embedding application's notification layer.
pub trait NoticeSink {
    fn notice(&self, severity: Severity, message: &str);
}

/// Sink for headless use; drops every notice.
pub struct DiscardNotices;

impl NoticeSink for DiscardNotices {
    fn notice(&self, _severity: Severity, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Working,
    Ready,
}

/// Outcome of an export request: the bundle to save and the name to save it
/// under. `rebuilt` is false when the cached build was reused.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bundle: BuiltBundle,
    pub file_name: &'static str,
    pub rebuilt: bool,
}

/// Drives the download action: builds on first request, serves the cached
/// bundle while Ready, and drops the cache when the source collection
/// changes.
pub struct ExportController<C: EntryCompressor = DeflateCompressor> {
    writer: BundleWriter<C>,
    state: ExportState,
    built: Option<BuiltBundle>,
}

impl ExportController<DeflateCompressor> {
    pub fn new() -> Self {
        Self::with_writer(BundleWriter::new())
    }
}

impl Default for ExportController<DeflateCompressor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: EntryCompressor> ExportController<C> {
    pub fn with_writer(writer: BundleWriter<C>) -> Self {
        Self {
            writer,
            state: ExportState::Idle,
            built: None,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// In Ready state the cached bundle is returned without a rebuild; a new
    /// build starts only from Idle. A request during a build is rejected —
    /// exports never run concurrently against one writer.
    pub fn request_export(
        &mut self,
        collection: &AssetCollection,
        sink: &dyn NoticeSink,
    ) -> Result<ExportResult, BundleError> {
        match (self.state, &self.built) {
            (ExportState::Working, _) => return Err(BundleError::ExportInProgress),
            (ExportState::Ready, Some(bundle)) => {
                return Ok(ExportResult {
                    bundle: bundle.clone(),
                    file_name: DOWNLOAD_FILE_NAME,
                    rebuilt: false,
                });
            }
            _ => {}
        }

        self.state = ExportState::Working;
        match self.writer.build(collection) {
            Ok(bundle) => {
                for warning in &bundle.warnings {
                    sink.notice(Severity::Warning, &warning.to_string());
                }
                self.state = ExportState::Ready;
                self.built = Some(bundle.clone());
                Ok(ExportResult {
                    bundle,
                    file_name: DOWNLOAD_FILE_NAME,
                    rebuilt: true,
                })
            }
            Err(err) => {
                self.state = ExportState::Idle;
                sink.notice(Severity::Error, &err.to_string());
                Err(err)
            }
        }
    }

    /// Drops the cached build. Call when the source collection changes.
    pub fn invalidate(&mut self) {
        self.built = None;
        if self.state == ExportState::Ready {
            self.state = ExportState::Idle;
        }
    }
}
