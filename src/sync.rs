//! One capture/diff cycle, wiring the collaborators together.

use log::info;

use crate::diff::{self, DiffSet};
use crate::error::Result;
use crate::model::Collection;
use crate::notify::DiffSink;
use crate::source::RosterSource;
use crate::store::persist::Persistence;
use crate::store::Store;

/// Fetch every named roster, diff against the latest stored capture, and when
/// anything changed append the new capture and hand the diff set to the sink.
///
/// The capture is only persisted on a non-empty diff set, so an unchanged
/// cycle leaves no trace in the history. Returns the diff set either way.
pub fn run_cycle<P: Persistence>(
    store: &mut Store<P>,
    source: &dyn RosterSource,
    names: &[String],
    sink: &mut dyn DiffSink,
) -> Result<DiffSet> {
    let mut current = Collection::new();
    for name in names {
        current.insert(name.clone(), source.fetch(name)?);
    }

    let prior = store
        .latest()?
        .map(|capture| capture.collection)
        .unwrap_or_default();

    let diffs = diff::diff_collections(&prior, &current)?;
    if diffs.is_empty() {
        info!("no changes across {} rosters", names.len());
        return Ok(diffs);
    }

    info!("changes in {} rosters, appending capture", diffs.len());
    store.append(&current)?;
    sink.notify(&diffs)?;
    Ok(diffs)
}
