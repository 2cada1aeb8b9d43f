// Chunk Partitioner
use crate::domain::ResultId;
use crate::error::{Result, WatchError};
use std::collections::HashSet;

/// Split result identifiers into contiguous chunks of at most `bucket_size`
///
/// Deterministic for a given input order. Duplicates are collapsed to their
/// first occurrence so every identifier lands in exactly one chunk.
///
/// # Errors
/// - WatchError::InvalidArgument if `bucket_size` is zero
pub fn partition<I, T>(result_ids: I, bucket_size: usize) -> Result<Vec<Vec<ResultId>>>
where
    I: IntoIterator<Item = T>,
    T: Into<ResultId>,
{
    if bucket_size == 0 {
        return Err(WatchError::InvalidArgument(
            "bucket_size must be positive".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let unique: Vec<ResultId> = result_ids
        .into_iter()
        .map(Into::into)
        .filter(|id: &ResultId| seen.insert(id.clone()))
        .collect();

    Ok(unique
        .chunks(bucket_size)
        .map(<[ResultId]>::to_vec)
        .collect())
}
