use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{EventId, PlotKind};
use crate::handles::{HandleStore, ImageHandle};

/// Summary record shipped as `metadata.json` alongside the plots. All fields
/// serialize as JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub sfreq: f64,
    pub max_freq: f64,
    pub duration: f64,
    pub total_samples: u64,
    pub total_channels: u64,
    pub n_good: u64,
    pub n_bad: u64,
}

/// A realized image slot: the raw bytes plus the display handle issued for
/// them. Bytes are retained so a later export never re-fetches.
#[derive(Debug, Clone)]
pub struct PlotImage {
    pub bytes: Arc<[u8]>,
    pub handle: ImageHandle,
}

impl PlotImage {
    pub fn realize(bytes: Arc<[u8]>, handles: &mut HandleStore) -> Self {
        let handle = handles.acquire(bytes.clone());
        Self { bytes, handle }
    }
}

/// The four plot slots of one event. A slot is either absent or fully
/// realized; an empty payload never stands in for "unset."
#[derive(Debug, Clone, Default)]
pub struct EventPlots {
    pub epoch: Option<PlotImage>,
    pub psd: Option<PlotImage>,
    pub topomap: Option<PlotImage>,
    pub mini_topomap: Option<PlotImage>,
}

impl EventPlots {
    pub fn slot(&self, kind: PlotKind) -> Option<&PlotImage> {
        match kind {
            PlotKind::Epoch => self.epoch.as_ref(),
            PlotKind::Psd => self.psd.as_ref(),
            PlotKind::Topomap => self.topomap.as_ref(),
            PlotKind::MiniTopomap => self.mini_topomap.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: PlotKind) -> &mut Option<PlotImage> {
        match kind {
            PlotKind::Epoch => &mut self.epoch,
            PlotKind::Psd => &mut self.psd,
            PlotKind::Topomap => &mut self.topomap,
            PlotKind::MiniTopomap => &mut self.mini_topomap,
        }
    }

    pub fn populated(&self) -> usize {
        PlotKind::ALL
            .iter()
            .filter(|kind| self.slot(**kind).is_some())
            .count()
    }
}

/// The in-memory working set for one analysis run: events in insertion
/// order, the optional filter-comparison image, and the optional metadata
/// record. Populated wholesale by the reader and read-only during an export.
#[derive(Debug, Clone, Default)]
pub struct AssetCollection {
    events: Vec<(EventId, EventPlots)>,
    filter_comparison: Option<PlotImage>,
    metadata: Option<RunMetadata>,
}

impl AssetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[(EventId, EventPlots)] {
        &self.events
    }

    pub fn event(&self, id: &EventId) -> Option<&EventPlots> {
        self.events
            .iter()
            .find(|(event, _)| event == id)
            .map(|(_, plots)| plots)
    }

    pub fn filter_comparison(&self) -> Option<&PlotImage> {
        self.filter_comparison.as_ref()
    }

    pub fn metadata(&self) -> Option<&RunMetadata> {
        self.metadata.as_ref()
    }

    /// True when no image slot and no metadata record is populated.
    pub fn is_empty(&self) -> bool {
        self.events.iter().all(|(_, plots)| plots.populated() == 0)
            && self.filter_comparison.is_none()
            && self.metadata.is_none()
    }

    /// Sets the slot named by (event, kind), creating the event record on
    /// first sight with all four slots unset. Returns the superseded image,
    /// if any, so its handle can be released.
    pub fn insert_plot(
        &mut self,
        event: EventId,
        kind: PlotKind,
        image: PlotImage,
    ) -> Option<PlotImage> {
        let index = match self.events.iter().position(|(id, _)| *id == event) {
            Some(index) => index,
            None => {
                self.events.push((event, EventPlots::default()));
                self.events.len() - 1
            }
        };
        self.events[index].1.slot_mut(kind).replace(image)
    }

    pub fn set_filter_comparison(&mut self, image: PlotImage) -> Option<PlotImage> {
        self.filter_comparison.replace(image)
    }

    pub fn set_metadata(&mut self, metadata: RunMetadata) {
        self.metadata = Some(metadata);
    }

    /// Releases every handle this collection owns and clears it. Call before
    /// swapping in a replacement so the prior generation cannot leak.
    pub fn release_handles(&mut self, handles: &mut HandleStore) {
        for (_, plots) in self.events.drain(..) {
            let images = [plots.epoch, plots.psd, plots.topomap, plots.mini_topomap];
            for image in images.into_iter().flatten() {
                handles.release(&image.handle);
            }
        }
        if let Some(image) = self.filter_comparison.take() {
            handles.release(&image.handle);
        }
        self.metadata = None;
    }
}
