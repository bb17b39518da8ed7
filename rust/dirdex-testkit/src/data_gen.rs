//! Seeded generators of index workloads.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Entry ids `1..=count` in a seeded random order.
pub fn shuffled_ids(count: u64, seed: u64) -> Vec<u64> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut ids = (1..=count).collect::<Vec<_>>();
    rng.shuffle(&mut ids);
    ids
}

/// A vocabulary of `size` distinct attribute values (`"<prefix>-0000"`, ...).
pub fn vocabulary(prefix: &str, size: usize) -> Vec<String> {
    (0..size).map(|i| format!("{prefix}-{i:04}")).collect()
}

/// Assigns each of `ids` one value from `values`, skewed so that the first
/// values are far more frequent than the rest (roughly Zipf-like), which
/// gives a workload a mix of tiny and very large duplicate sets.
pub fn skewed_pairs(ids: &[u64], values: &[String], seed: u64) -> Vec<(String, u64)> {
    assert!(!values.is_empty());
    let mut rng = fastrand::Rng::with_seed(seed);
    ids.iter()
        .map(|&id| {
            // Squaring a uniform sample concentrates picks at low indices.
            let u = rng.f64();
            let index = ((u * u) * values.len() as f64) as usize;
            (values[index.min(values.len() - 1)].clone(), id)
        })
        .collect()
}

/// A directory entry from the sample file.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleEntry {
    pub id: u64,
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl SampleEntry {
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Loads `samples/entries.json`.
pub fn load_sample_entries() -> anyhow::Result<Vec<SampleEntry>> {
    let path = crate::dirs::get_sample_entries_path()?;
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
