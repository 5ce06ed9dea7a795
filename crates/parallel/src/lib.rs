//! Parallel/sequential fan-out helpers for independent column workloads.
//!
//! Factor columns are independent of each other once their shared scratch
//! series exist, so the natural unit of parallelism is "one closure per
//! output column". The `cfg` logic for the `parallel` feature lives here in
//! ONE place, keeping call sites clean.
//!
//! # Runtime Override
//!
//! Every helper takes a `force_sequential` parameter. When `true`, execution
//! is sequential even if the `parallel` feature is enabled, which makes
//! profiling and flaky-scheduling investigations possible without a rebuild.
//!
//! # Example
//!
//! ```ignore
//! // Instead of:
//! // #[cfg(feature = "parallel")]
//! // let cols: Vec<_> = recipes.par_iter().map(|r| r.eval()).collect();
//! // #[cfg(not(feature = "parallel"))]
//! // let cols: Vec<_> = recipes.iter().map(|r| r.eval()).collect();
//!
//! // Just write:
//! let cols = parallel::map_slice(&recipes, |r| r.eval(), false);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// =============================================================================
// Slice Operations
// =============================================================================

/// Map a function over a slice, potentially in parallel.
///
/// Returns a Vec of results in the same order as input (parallel preserves
/// order), which is what keeps factor column order deterministic.
///
/// # Parameters
/// - `force_sequential`: When true, forces sequential execution even if the
///   parallel feature is enabled
#[inline]
pub fn map_slice<T, F, R>(slice: &[T], f: F, force_sequential: bool) -> Vec<R>
where
    T: Sync,
    F: Fn(&T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            slice.iter().map(f).collect()
        } else {
            slice.par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        slice.iter().map(f).collect()
    }
}

// =============================================================================
// Vec Operations (owned iteration)
// =============================================================================

/// Map over a Vec, consuming it, potentially in parallel.
///
/// Used where the work items own their closures (factor recipes) and must be
/// moved into the evaluation rather than borrowed.
///
/// # Parameters
/// - `force_sequential`: When true, forces sequential execution even if the
///   parallel feature is enabled
#[inline]
pub fn map_vec<T, F, R>(vec: Vec<T>, f: F, force_sequential: bool) -> Vec<R>
where
    T: Send,
    F: Fn(T) -> R + Sync + Send,
    R: Send,
{
    #[cfg(feature = "parallel")]
    {
        if force_sequential {
            vec.into_iter().map(f).collect()
        } else {
            vec.into_par_iter().map(f).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = force_sequential;
        vec.into_iter().map(f).collect()
    }
}
