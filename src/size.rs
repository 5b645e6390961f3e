use crate::index::RECORDS_PER_BUCKET;

/// Optimal starting table size for a given load and record count: enough
/// bins that `num_records` fits at `max_load`, rounded up to whole buckets,
/// never smaller than 2.
pub fn perfect_table_size(max_load: f64, num_records: u32) -> u32 {
    let per_load = (num_records as f64 / max_load).ceil();
    let buckets = (per_load / RECORDS_PER_BUCKET as f64).ceil();
    (buckets as u32).max(2)
}
