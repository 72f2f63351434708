use std::fmt;
use std::str::FromStr;

use crate::error::BundleError;

/// The four plot categories an analysis event can carry. Anything outside
/// this set classifies as unrecognized at the naming seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    Epoch,
    Psd,
    Topomap,
    MiniTopomap,
}

impl PlotKind {
    /// Fixed slot order used everywhere a collection is iterated.
    pub const ALL: [PlotKind; 4] = [
        PlotKind::Epoch,
        PlotKind::Psd,
        PlotKind::Topomap,
        PlotKind::MiniTopomap,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            PlotKind::Epoch => "epoch_plot",
            PlotKind::Psd => "psd_plot",
            PlotKind::Topomap => "topomap_plot",
            PlotKind::MiniTopomap => "mini_topomap_plot",
        }
    }

    pub fn from_token(token: &str) -> Option<PlotKind> {
        match token {
            "epoch_plot" => Some(PlotKind::Epoch),
            "psd_plot" => Some(PlotKind::Psd),
            "topomap_plot" => Some(PlotKind::Topomap),
            "mini_topomap_plot" => Some(PlotKind::MiniTopomap),
            _ => None,
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = BundleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // A trailing `_mini` would make `{id}_topomap_plot` indistinguishable
        // from `{base}` + `mini_topomap_plot` when names are decoded.
        let is_valid = !trimmed.is_empty()
            && !trimmed.ends_with("_mini")
            && trimmed
                .chars()
                .all(|ch| ch != '/' && ch != '\\' && !ch.is_control());
        if !is_valid {
            return Err(BundleError::InvalidEventId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Identity of one archive entry: a per-event plot, the filter-comparison
/// image, or the run-metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetId {
    Event { event: EventId, kind: PlotKind },
    FilterComparison,
    Metadata,
}
