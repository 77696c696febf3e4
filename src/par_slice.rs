use rayon::prelude::*;

/// Sets each element from its index.
/// `chunk_size` is break the work into tasks for multi-threading.
pub fn set_from_index<T: Send, F: Fn(usize) -> T + Sync>(
    a_slice: &mut [T],
    f: F,
    chunk_size: usize,
) {
    let chunk_size = chunk_size.max(1);
    a_slice
        .par_chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(c, a_chunk): (usize, &mut [T])| {
            let offset = c * chunk_size;
            for (i, a) in a_chunk.iter_mut().enumerate() {
                *a = f(offset + i);
            }
        });
}

/// Minimum and maximum value, `None` for an empty slice.
pub fn min_max(a_slice: &[f64], chunk_size: usize) -> Option<(f64, f64)> {
    if a_slice.is_empty() {
        return None;
    }
    let chunk_size = chunk_size.max(1);
    let r = a_slice
        .par_chunks(chunk_size)
        .map(|a_chunk| {
            a_chunk
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                    (lo.min(*a), hi.max(*a))
                })
        })
        .reduce(
            || (f64::INFINITY, f64::NEG_INFINITY),
            |(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)),
        );
    Some(r)
}
