use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BundleError {
    #[error("invalid event id: {0}")]
    InvalidEventId(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("nothing to export: collection has no content")]
    EmptyCollection,

    #[error("export failed: no entry could be compressed")]
    ExportFailed,

    #[error("an export is already in progress")]
    ExportInProgress,

    #[error("failed to encode metadata: {0}")]
    MetadataEncode(String),

    #[error("archive container error: {0}")]
    Container(String),
}
