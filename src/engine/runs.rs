//! Contiguous-run detection over a boolean time series.

use crate::domain::Run;

/// Find maximal runs of `true`, in ascending start order.
///
/// Accepts anything that yields `&bool`: slices, `Vec`s, or ndarray views
/// (including non-contiguous columns of a regressor matrix).
pub fn find_runs<'a, I>(flags: I) -> Vec<Run>
where
    I: IntoIterator<Item = &'a bool>,
{
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;
    let mut n = 0usize;

    for (i, &bad) in flags.into_iter().enumerate() {
        n = i + 1;
        match (bad, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                runs.push(Run::new(start, i - start));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        runs.push(Run::new(start, n - start));
    }

    runs
}
