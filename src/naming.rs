use regex::Regex;

use crate::domain::{AssetId, EventId, PlotKind};

/// Wire name of the filter-comparison image in outbound bundles. The
/// misspelling is the name the dashboard has always shipped.
pub const FILTER_COMPARISON_NAME: &str = "filter_comparision.png";
/// Name the filtering endpoint uses for the same image in inbound bundles.
const FILTER_INBOUND_NAME: &str = "filter_plot.png";
pub const METADATA_NAME: &str = "metadata.json";

/// Longest token first, so `mini_topomap_plot` wins over its
/// `topomap_plot` tail.
const SUFFIX_ORDER: [PlotKind; 4] = [
    PlotKind::MiniTopomap,
    PlotKind::Topomap,
    PlotKind::Epoch,
    PlotKind::Psd,
];

/// The single seam between asset identity and archive entry name. All name
/// grammar lives here; reader and writer only see [`AssetId`].
#[derive(Debug, Clone)]
pub struct NameCodec {
    inbound: Regex,
}

impl NameCodec {
    pub fn new() -> Self {
        // Server grammar: an anchored category token, arbitrary interior
        // text, then the event id after the final underscore.
        let inbound = Regex::new(
            r"^(mini_topomap_plot|topomap_plot|epoch_plot|psd_plot).*_(.+)\.png$",
        )
        .unwrap();
        Self { inbound }
    }

    pub fn encode(&self, id: &AssetId) -> String {
        match id {
            AssetId::Event { event, kind } => {
                format!("{event}/{event}_{}.png", kind.token())
            }
            AssetId::FilterComparison => FILTER_COMPARISON_NAME.to_string(),
            AssetId::Metadata => METADATA_NAME.to_string(),
        }
    }

    /// Classifies one entry name. Unknown or garbled names return `None`;
    /// this never errors. Directory prefixes are stripped first.
    pub fn decode(&self, name: &str) -> Option<AssetId> {
        let flat = name.rsplit('/').next().unwrap_or(name);
        if flat == FILTER_COMPARISON_NAME || flat == FILTER_INBOUND_NAME {
            return Some(AssetId::FilterComparison);
        }
        if flat.ends_with(".json") {
            return Some(AssetId::Metadata);
        }
        let stem = flat.strip_suffix(".png")?;

        // Own output first: `{event}_{token}.png`.
        for kind in SUFFIX_ORDER {
            let Some(event) = stem
                .strip_suffix(kind.token())
                .and_then(|rest| rest.strip_suffix('_'))
            else {
                continue;
            };
            if let Ok(event) = event.parse::<EventId>() {
                return Some(AssetId::Event { event, kind });
            }
        }

        // Then the inbound server grammar.
        let captures = self.inbound.captures(flat)?;
        let kind = PlotKind::from_token(captures.get(1)?.as_str())?;
        let event = captures.get(2)?.as_str().parse::<EventId>().ok()?;
        Some(AssetId::Event { event, kind })
    }
}

impl Default for NameCodec {
    fn default() -> Self {
        Self::new()
    }
}
