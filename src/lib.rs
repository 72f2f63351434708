//! In-memory zip codec for the plot bundles of an EEG visualization
//! dashboard: pack the current set of plot images plus a run-metadata record
//! into one downloadable archive, and unpack a server-produced archive into a
//! typed, semantically keyed collection.

pub mod assets;
pub mod compress;
pub mod domain;
pub mod error;
pub mod export;
pub mod handles;
pub mod naming;
pub mod pack;
pub mod unpack;
