//! Cross-revision blending of probe recordings

use crate::analysis::ClassStructure;
use crate::data::{ExecutionData, ExecutionDataStore};
use crate::error::SondaResult;
use std::collections::HashMap;

/// Blend a historical store into a current run, re-keyed by method identity
///
/// For each class present in the current store, the historical class of
/// the same name is located and the probe sub-ranges of methods present in
/// both revisions under the same `(name, descriptor)` identity are OR-ed
/// positionally. This relies on block layout being stable for unchanged
/// methods; a method whose probe-range length differs between revisions is
/// excluded from blending and keeps current-only data. Historical classes
/// with no name match are dropped with a warning, never treated as an
/// error. The resulting store is keyed by current class ids.
pub fn merge_revisions(
    current: &ExecutionDataStore,
    current_structures: &[ClassStructure],
    historical: &ExecutionDataStore,
    historical_structures: &[ClassStructure],
) -> SondaResult<ExecutionDataStore> {
    let current_by_name: HashMap<&str, &ClassStructure> = current_structures
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();
    let historical_by_name: HashMap<&str, &ClassStructure> = historical_structures
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    let mut merged = ExecutionDataStore::new();
    for data in current.contents() {
        let mut probes = data.probes().to_vec();
        if let Some(blend) = historical_probes_for(
            data,
            &current_by_name,
            &historical_by_name,
            historical,
        ) {
            for (index, hit) in blend {
                probes[index] |= hit;
            }
        }
        merged.put(ExecutionData::new(data.id(), data.name(), probes))?;
    }

    for data in historical.contents() {
        if !current.contains_name(data.name()) {
            tracing::warn!(
                class = data.name(),
                "historical class has no match in current revision, dropping"
            );
        }
    }
    Ok(merged)
}

/// Probe bits to OR into the current recording, as `(current index, hit)`
fn historical_probes_for(
    data: &ExecutionData,
    current_by_name: &HashMap<&str, &ClassStructure>,
    historical_by_name: &HashMap<&str, &ClassStructure>,
    historical: &ExecutionDataStore,
) -> Option<Vec<(usize, bool)>> {
    let current_class = current_by_name.get(data.name())?;
    let historical_class = historical_by_name.get(data.name())?;
    let historical_data = historical.get(historical_class.id)?;
    if data.probes().len() != current_class.probe_count
        || historical_data.probes().len() != historical_class.probe_count
    {
        tracing::warn!(
            class = data.name(),
            "recording does not match its structure, skipping blend"
        );
        return None;
    }

    let mut blend = Vec::new();
    for method in &current_class.methods {
        let Some(counterpart) = historical_class.method(&method.name, &method.descriptor) else {
            // changed or new method: current-only data
            continue;
        };
        let current_indices = method.probe_indices();
        let historical_indices = counterpart.probe_indices();
        if current_indices.len() != historical_indices.len() {
            tracing::warn!(
                class = data.name(),
                method = %method.vm_name(),
                "probe range length changed between revisions, excluding from blend"
            );
            continue;
        }
        for (cur, hist) in current_indices.into_iter().zip(historical_indices) {
            blend.push((cur, historical_data.probes()[hist]));
        }
    }
    Some(blend)
}
