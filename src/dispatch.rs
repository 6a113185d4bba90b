//! Tiled N-dimensional dispatch over the worker pool.
//!
//! Every variant linearizes the flattened tile-index space into one integer
//! range for `WorkerPool::compute_1d` and decodes per-dimension tile
//! coordinates with precomputed [`FixedDivisor`]s, keeping hardware division
//! out of the per-tile callbacks. Boundary tiles are clipped to
//! `min(tile, range - index)`; the emitted tiles exactly cover each range
//! with no overlap. Untiled 2D dispatch is the tile-size-1 special case.

use crate::fxdiv::FixedDivisor;
use crate::threadpool::WorkerPool;

#[inline]
fn clip(tile: usize, range: usize, index: usize) -> usize {
    tile.min(range - index)
}

impl WorkerPool {
    /// Tiled 1D dispatch: `task(index, extent)` per tile.
    pub fn compute_1d_tiled<F>(&self, range: usize, tile: usize, task: F)
    where
        F: Fn(usize, usize) + Sync,
    {
        if range == 0 {
            return;
        }
        let tile_range = range.div_ceil(tile);
        self.compute_1d(tile_range, |tile_index| {
            let index = tile_index * tile;
            task(index, clip(tile, range, index));
        });
    }

    /// Untiled 2D dispatch: `task(i, j)` for every point of the grid.
    pub fn compute_2d<F>(&self, range_i: usize, range_j: usize, task: F)
    where
        F: Fn(usize, usize) + Sync,
    {
        if range_i == 0 || range_j == 0 {
            return;
        }
        let div_j = FixedDivisor::new(range_j);
        self.compute_1d(range_i * range_j, |linear| {
            let (i, j) = div_j.divide(linear);
            task(i, j);
        });
    }

    /// Tiled 2D dispatch: `task(index_i, index_j, extent_i, extent_j)`.
    pub fn compute_2d_tiled<F>(
        &self,
        range_i: usize,
        range_j: usize,
        tile_i: usize,
        tile_j: usize,
        task: F,
    ) where
        F: Fn(usize, usize, usize, usize) + Sync,
    {
        if range_i == 0 || range_j == 0 {
            return;
        }
        let tile_range_i = range_i.div_ceil(tile_i);
        let tile_range_j = range_j.div_ceil(tile_j);
        let div_j = FixedDivisor::new(tile_range_j);
        self.compute_1d(tile_range_i * tile_range_j, |linear| {
            let (ti, tj) = div_j.divide(linear);
            let index_i = ti * tile_i;
            let index_j = tj * tile_j;
            task(
                index_i,
                index_j,
                clip(tile_i, range_i, index_i),
                clip(tile_j, range_j, index_j),
            );
        });
    }

    /// Tiled 3D dispatch.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_3d_tiled<F>(
        &self,
        range_i: usize,
        range_j: usize,
        range_k: usize,
        tile_i: usize,
        tile_j: usize,
        tile_k: usize,
        task: F,
    ) where
        F: Fn(usize, usize, usize, usize, usize, usize) + Sync,
    {
        if range_i == 0 || range_j == 0 || range_k == 0 {
            return;
        }
        let tile_range_i = range_i.div_ceil(tile_i);
        let tile_range_j = range_j.div_ceil(tile_j);
        let tile_range_k = range_k.div_ceil(tile_k);
        let div_j = FixedDivisor::new(tile_range_j);
        let div_k = FixedDivisor::new(tile_range_k);
        self.compute_1d(tile_range_i * tile_range_j * tile_range_k, |linear| {
            let (ij, tk) = div_k.divide(linear);
            let (ti, tj) = div_j.divide(ij);
            let index_i = ti * tile_i;
            let index_j = tj * tile_j;
            let index_k = tk * tile_k;
            task(
                index_i,
                index_j,
                index_k,
                clip(tile_i, range_i, index_i),
                clip(tile_j, range_j, index_j),
                clip(tile_k, range_k, index_k),
            );
        });
    }

    /// Tiled 4D dispatch.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_4d_tiled<F>(
        &self,
        range_i: usize,
        range_j: usize,
        range_k: usize,
        range_l: usize,
        tile_i: usize,
        tile_j: usize,
        tile_k: usize,
        tile_l: usize,
        task: F,
    ) where
        F: Fn(usize, usize, usize, usize, usize, usize, usize, usize) + Sync,
    {
        if range_i == 0 || range_j == 0 || range_k == 0 || range_l == 0 {
            return;
        }
        let tile_range_i = range_i.div_ceil(tile_i);
        let tile_range_j = range_j.div_ceil(tile_j);
        let tile_range_k = range_k.div_ceil(tile_k);
        let tile_range_l = range_l.div_ceil(tile_l);
        let div_j = FixedDivisor::new(tile_range_j);
        let div_k = FixedDivisor::new(tile_range_k);
        let div_l = FixedDivisor::new(tile_range_l);
        let total = tile_range_i * tile_range_j * tile_range_k * tile_range_l;
        self.compute_1d(total, |linear| {
            let (ijk, tl) = div_l.divide(linear);
            let (ij, tk) = div_k.divide(ijk);
            let (ti, tj) = div_j.divide(ij);
            let index_i = ti * tile_i;
            let index_j = tj * tile_j;
            let index_k = tk * tile_k;
            let index_l = tl * tile_l;
            task(
                index_i,
                index_j,
                index_k,
                index_l,
                clip(tile_i, range_i, index_i),
                clip(tile_j, range_j, index_j),
                clip(tile_k, range_k, index_k),
                clip(tile_l, range_l, index_l),
            );
        });
    }
}
