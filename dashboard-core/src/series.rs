//! Alignment of sparse daily values onto a fixed date grid.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{DashboardError, DateGrid, DateKey, DatedRecord, DatedValue, DenseSeries};

/// Place each value at the grid position of its day.
///
/// Days without a record become `None`. Records dated outside the grid are
/// ignored, and when several records share a day the last one wins.
pub fn align(records: &[DatedValue], grid: &DateGrid) -> DenseSeries {
    align_pairs(
        records.iter().map(|record| (&record.dates, record.value)),
        grid,
    )
}

/// Same as [`align`], reading `field` out of full daily records.
pub fn align_field(records: &[DatedRecord], field: &str, grid: &DateGrid) -> DenseSeries {
    align_pairs(
        records
            .iter()
            .map(|record| (&record.dates, record.metric(field))),
        grid,
    )
}

fn align_pairs<'a, I>(pairs: I, grid: &DateGrid) -> DenseSeries
where
    I: IntoIterator<Item = (&'a DateKey, Option<f64>)>,
{
    let grid_keys: HashSet<&str> = grid.iter().map(DateKey::as_str).collect();
    let mut by_day: HashMap<&str, Option<f64>> = HashMap::with_capacity(grid.len());
    let mut outside = 0usize;

    for (dates, value) in pairs {
        let key = dates.as_str();
        if grid_keys.contains(key) {
            by_day.insert(key, value);
        } else {
            outside += 1;
        }
    }

    if outside > 0 {
        debug!(outside, grid_len = grid.len(), "records outside the date grid ignored");
    }

    grid.iter()
        .map(|key| by_day.get(key.as_str()).copied().flatten())
        .collect::<Vec<_>>()
        .into()
}

/// Left-pad `values` with `None` until it holds `target` items.
///
/// Returns a new vector; the input is left untouched. A target shorter than
/// the input is rejected instead of truncating.
pub fn pad_front<T: Clone>(
    values: &[Option<T>],
    target: usize,
) -> Result<Vec<Option<T>>, DashboardError> {
    let Some(missing) = target.checked_sub(values.len()) else {
        return Err(DashboardError::ShapeMismatch {
            target,
            actual: values.len(),
        });
    };

    let mut padded = Vec::with_capacity(target);
    padded.resize(missing, None);
    padded.extend_from_slice(values);
    Ok(padded)
}
