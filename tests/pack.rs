use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use zip::ZipArchive;

use eeg_plot_bundle::assets::{AssetCollection, PlotImage, RunMetadata};
use eeg_plot_bundle::compress::{
    CompletionSignal, CompressionTicket, EntryCompressor, deflate_fragment,
};
use eeg_plot_bundle::domain::{EventId, PlotKind};
use eeg_plot_bundle::error::BundleError;
use eeg_plot_bundle::handles::HandleStore;
use eeg_plot_bundle::pack::{BundleWriter, ExportWarning};

fn event(id: &str) -> EventId {
    id.parse().unwrap()
}

fn image(handles: &mut HandleStore, bytes: &[u8]) -> PlotImage {
    PlotImage::realize(Arc::from(bytes.to_vec()), handles)
}

fn metadata() -> RunMetadata {
    RunMetadata {
        sfreq: 250.0,
        max_freq: 40.0,
        duration: 120.5,
        total_samples: 30125,
        total_channels: 14,
        n_good: 12,
        n_bad: 2,
    }
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_string())
        .collect()
}

/// Fails every entry whose name is listed; compresses the rest normally.
struct FailingNames(Vec<String>);

impl EntryCompressor for FailingNames {
    fn begin(&self, name: &str, bytes: &[u8]) -> CompressionTicket {
        let (ticket, signal) = CompressionTicket::channel(name);
        if self.0.iter().any(|failing| failing == name) {
            signal.resolve(Err(BundleError::Container("injected failure".to_string())));
        } else {
            signal.resolve(deflate_fragment(name, bytes));
        }
        ticket
    }
}

/// Never resolves the listed entries; their signals are parked so the
/// channel stays open and the writer has to wait out the deadline.
struct StuckNames {
    names: Vec<String>,
    parked: Mutex<Vec<CompletionSignal>>,
}

impl StuckNames {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            parked: Mutex::new(Vec::new()),
        }
    }
}

impl EntryCompressor for StuckNames {
    fn begin(&self, name: &str, bytes: &[u8]) -> CompressionTicket {
        let (ticket, signal) = CompressionTicket::channel(name);
        if self.names.iter().any(|stuck| stuck == name) {
            self.parked.lock().unwrap().push(signal);
        } else {
            signal.resolve(deflate_fragment(name, bytes));
        }
        ticket
    }
}

#[test]
fn empty_collection_is_nothing_to_export() {
    let err = BundleWriter::new()
        .build(&AssetCollection::new())
        .unwrap_err();
    assert_matches!(err, BundleError::EmptyCollection);
}

#[test]
fn partial_failure_yields_smaller_archive_and_warning() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    collection.insert_plot(event("E1"), PlotKind::Epoch, image(&mut handles, b"epoch"));
    collection.insert_plot(event("E1"), PlotKind::Psd, image(&mut handles, b"psd"));
    collection.set_metadata(metadata());

    let writer = BundleWriter::with_compressor(FailingNames(vec![
        "E1/E1_psd_plot.png".to_string(),
    ]));
    let bundle = writer.build(&collection).unwrap();

    assert_eq!(bundle.entry_count, 2);
    assert_eq!(bundle.warnings.len(), 1);
    assert_matches!(
        &bundle.warnings[0],
        ExportWarning::EntryFailed { name, .. } if name == "E1/E1_psd_plot.png"
    );
    assert_eq!(
        entry_names(&bundle.bytes),
        vec!["E1/E1_epoch_plot.png", "metadata.json"]
    );
}

#[test]
fn total_failure_is_a_hard_error() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    collection.insert_plot(event("E1"), PlotKind::Epoch, image(&mut handles, b"epoch"));

    let writer = BundleWriter::with_compressor(FailingNames(vec![
        "E1/E1_epoch_plot.png".to_string(),
    ]));
    let err = writer.build(&collection).unwrap_err();
    assert_matches!(err, BundleError::ExportFailed);
}

#[test]
fn stuck_entry_trips_the_deadline() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    collection.insert_plot(event("E1"), PlotKind::Epoch, image(&mut handles, b"epoch"));
    collection.insert_plot(event("E1"), PlotKind::Topomap, image(&mut handles, b"topo"));

    let writer = BundleWriter::with_compressor(StuckNames::new(&["E1/E1_topomap_plot.png"]))
        .with_wait_budget(Duration::from_millis(50));
    let bundle = writer.build(&collection).unwrap();

    assert_eq!(bundle.entry_count, 1);
    assert_matches!(
        &bundle.warnings[0],
        ExportWarning::EntryTimedOut { name } if name == "E1/E1_topomap_plot.png"
    );
    assert_eq!(entry_names(&bundle.bytes), vec!["E1/E1_epoch_plot.png"]);
}

#[test]
fn every_entry_stuck_is_a_hard_error() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    collection.insert_plot(event("E1"), PlotKind::Epoch, image(&mut handles, b"epoch"));

    let writer = BundleWriter::with_compressor(StuckNames::new(&["E1/E1_epoch_plot.png"]))
        .with_wait_budget(Duration::from_millis(50));
    let err = writer.build(&collection).unwrap_err();
    assert_matches!(err, BundleError::ExportFailed);
}

#[test]
fn entries_follow_collection_order() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    // E2 inserted first stays first; slots come out in fixed kind order.
    collection.insert_plot(
        event("E2"),
        PlotKind::MiniTopomap,
        image(&mut handles, b"e2-mini"),
    );
    collection.insert_plot(event("E2"), PlotKind::Epoch, image(&mut handles, b"e2-epoch"));
    collection.insert_plot(event("E1"), PlotKind::Psd, image(&mut handles, b"e1-psd"));
    collection.set_filter_comparison(image(&mut handles, b"filter"));
    collection.set_metadata(metadata());

    let bundle = BundleWriter::new().build(&collection).unwrap();
    assert_eq!(
        entry_names(&bundle.bytes),
        vec![
            "E2/E2_epoch_plot.png",
            "E2/E2_mini_topomap_plot.png",
            "E1/E1_psd_plot.png",
            "filter_comparision.png",
            "metadata.json",
        ]
    );
}

#[test]
fn metadata_only_collection_still_exports() {
    let mut collection = AssetCollection::new();
    collection.set_metadata(metadata());

    let bundle = BundleWriter::new().build(&collection).unwrap();
    assert_eq!(bundle.entry_count, 1);
    assert_eq!(entry_names(&bundle.bytes), vec!["metadata.json"]);
}

#[test]
fn identical_input_reproduces_the_layout() {
    let mut handles = HandleStore::new();
    let mut collection = AssetCollection::new();
    collection.insert_plot(event("E1"), PlotKind::Epoch, image(&mut handles, b"epoch"));
    collection.set_metadata(metadata());

    let writer = BundleWriter::new();
    let first = writer.build(&collection).unwrap();
    let second = writer.build(&collection).unwrap();
    assert_eq!(entry_names(&first.bytes), entry_names(&second.bytes));
}
