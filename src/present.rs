use rayon::{
    iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Precomputed nearest-neighbour source index for each destination row and
/// column. Rebuilt whenever either size changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StretchMap {
    xs: Vec<usize>,
    ys: Vec<usize>,
}

impl StretchMap {
    pub fn new(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        let axis = |dst: usize, src: usize| -> Vec<usize> {
            (0..dst)
                .map(|d| (d * src / dst.max(1)).min(src.saturating_sub(1)))
                .collect()
        };
        Self {
            xs: axis(dst_w, src_w),
            ys: axis(dst_h, src_h),
        }
    }

    pub fn dst_size(&self) -> (usize, usize) {
        (self.xs.len(), self.ys.len())
    }
}

/// Stretch `src` (row stride `src_w`) over `dst`. Rows are filled in parallel.
pub fn stretch_nearest(dst: &mut [u32], src: &[u32], src_w: usize, map: &StretchMap) {
    let dst_w = map.xs.len();
    if dst_w == 0 || src_w == 0 {
        return;
    }
    dst.par_chunks_mut(dst_w)
        .zip(map.ys.par_iter())
        .for_each(|(row, &sy)| {
            let src_row = &src[sy * src_w..(sy + 1) * src_w];
            for (px, &sx) in row.iter_mut().zip(&map.xs) {
                *px = src_row[sx];
            }
        });
}
