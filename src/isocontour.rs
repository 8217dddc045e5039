use crate::bounds::Idx3d;
use crate::bounds::VoxelBounds;
use crate::bounds::offset_within;
use crate::enums::Connectivity;
use crate::enums::MaskValue;
use crate::enums::Processor;
use crate::volume::Voxel;
use crate::volume::VolumeAccess;

use ndarray::Array3;
use ndarray::Zip;
use ndarray::s;
use tracing::debug;
use tracing::trace;
use web_time::Instant;

/// Slack subtracted from the seed value so the seed always passes the
/// threshold test.
pub const THRESHOLD_EPSILON: f64 = 1e-4;

/// `(dy, dx)` ring around a voxel, in scan order.
static RING: [(isize, isize); 8] = [
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
];

/// `(dz, dy, dx)` offsets of every neighbour under `connectivity`.
fn neighbour_offsets(connectivity: Connectivity) -> impl Iterator<Item = (isize, isize, isize)> {
    let layers = match connectivity {
        Connectivity::Planar => 0..=0,
        Connectivity::Volumetric => -1..=1,
    };
    layers.flat_map(|dz: isize| {
        let center = (dz != 0).then_some((dz, 0, 0));
        center
            .into_iter()
            .chain(RING.iter().map(move |&(dy, dx)| (dz, dy, dx)))
    })
}

#[derive(Clone, Copy, Debug)]
pub struct SegmentationOptions {
    pub epsilon: f64,
    pub processor: Processor,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            epsilon: THRESHOLD_EPSILON,
            processor: Processor::default(),
        }
    }
}

/// Classified voxel mask of an isocontour ROI, cropped to the region's tight
/// bounding box and stored `(z, y, x)`. Planar masks have a depth of one.
#[derive(Clone, Debug, PartialEq)]
pub struct IsocontourMask {
    data: Array3<MaskValue>,
    connectivity: Connectivity,
    threshold: f64,
    origin: Voxel,
}

impl IsocontourMask {
    /// Mask shape as `(z, y, x)`.
    pub fn dim(&self) -> Idx3d {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<MaskValue> {
        &self.data
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Value of the seed voxel the region was grown from.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Voxel of the source volume that mask cell `(0, 0, 0)` was cut from.
    pub fn origin(&self) -> Voxel {
        self.origin
    }

    /// Cell at `idx`, `Excluded` outside the mask.
    #[inline]
    pub fn get(&self, idx: Idx3d) -> MaskValue {
        self.data.get(idx).copied().unwrap_or_default()
    }

    pub fn included_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_included()).count()
    }

    pub fn interior_count(&self) -> usize {
        self.data.iter().filter(|v| **v == MaskValue::Interior).count()
    }

    pub fn boundary_count(&self) -> usize {
        self.data.iter().filter(|v| **v == MaskValue::Boundary).count()
    }

    /// Grow a region from `seed` over every connected voxel whose value is at
    /// least the seed's (less `options.epsilon`).
    ///
    /// Planar growth stays in the seed's z plane. The seed must lie inside
    /// the volume.
    pub(crate) fn segment<V: VolumeAccess + ?Sized>(
        volume: &V,
        seed: Voxel,
        connectivity: Connectivity,
        options: &SegmentationOptions,
    ) -> Self {
        let started = Instant::now();
        let threshold = volume.value_at(seed) as f64;
        let cutoff = threshold - options.epsilon;

        let dim = volume.dim();
        let (shape, z_base) = match connectivity {
            Connectivity::Planar => ((1, dim.y, dim.x), seed.z),
            Connectivity::Volumetric => ((dim.z, dim.y, dim.x), 0),
        };
        let start = (seed.z - z_base, seed.y, seed.x);

        let value_at = |(z, y, x): Idx3d| {
            let voxel = Voxel {
                x,
                y,
                z: z + z_base,
                g: seed.g,
                t: seed.t,
            };
            volume.value_at(voxel) as f64
        };

        // Voxels are tested once, when first reached, so each enters the
        // stack at most once.
        let mut visits = Array3::from_elem(shape, Visit::Unseen);
        let mut bounds = VoxelBounds::at(start);
        let mut included = 0usize;
        let mut stack = Vec::with_capacity(64);

        // NaN never qualifies
        if value_at(start) >= cutoff {
            visits[start] = Visit::Included;
            included += 1;
            stack.push(start);
        } else {
            visits[start] = Visit::Rejected;
        }

        while let Some(idx) = stack.pop() {
            for offset in neighbour_offsets(connectivity) {
                let Some(neigh) = offset_within(idx, offset, shape) else {
                    continue;
                };
                if visits[neigh] != Visit::Unseen {
                    continue;
                }
                if value_at(neigh) >= cutoff {
                    visits[neigh] = Visit::Included;
                    bounds.expand_to_contain(neigh);
                    included += 1;
                    stack.push(neigh);
                } else {
                    visits[neigh] = Visit::Rejected;
                }
            }
        }

        let (min, max) = (bounds.min, bounds.max);
        let membership = visits
            .slice(s![min.0..=max.0, min.1..=max.1, min.2..=max.2])
            .map(|v| *v == Visit::Included);
        drop(visits);

        let data = classify(&membership, connectivity, options.processor);
        debug!(
            ?seed,
            threshold,
            included,
            ?min,
            ?max,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "Grew isocontour region"
        );

        Self {
            data,
            connectivity,
            threshold,
            origin: Voxel {
                x: min.2,
                y: min.1,
                z: min.0 + z_base,
                g: seed.g,
                t: seed.t,
            },
        }
    }

    /// Clear the `(2 * radius + 1)` wide square (planar) or cube (volumetric)
    /// centered at `center`, then reclassify the one voxel halo around it.
    ///
    /// Returns the number of cells that were included before clearing.
    pub(crate) fn erase(&mut self, center: Idx3d, radius: usize) -> usize {
        let connectivity = self.connectivity;
        let depth = match connectivity {
            Connectivity::Planar => 0,
            Connectivity::Volumetric => radius,
        };
        let halo_depth = match connectivity {
            Connectivity::Planar => 0,
            Connectivity::Volumetric => radius.saturating_add(1),
        };

        let mut cleared = 0;
        for idx in self.window(center, depth, radius) {
            if self.data[idx].is_included() {
                cleared += 1;
            }
            self.data[idx] = MaskValue::Excluded;
        }

        for idx in self.window(center, halo_depth, radius.saturating_add(1)) {
            if self.data[idx].is_included() {
                let value = edge_value(&self.data, idx, connectivity, MaskValue::is_included);
                self.data[idx] = value;
            }
        }

        debug!(?center, radius, cleared, "Erased isocontour area");
        cleared
    }

    /// In-mask indices within `depth` planes and `radius` rows/columns of
    /// `center`.
    fn window(&self, center: Idx3d, depth: usize, radius: usize) -> impl Iterator<Item = Idx3d> + use<> {
        let (dz, dy, dx) = self.data.dim();
        let range = |c: usize, r: usize, len: usize| {
            c.saturating_sub(r)..c.saturating_add(r).saturating_add(1).min(len)
        };
        let zs = range(center.0, depth, dz);
        let ys = range(center.1, radius, dy);
        let xs = range(center.2, radius, dx);
        trace!(?zs, ?ys, ?xs, "Mask window");

        zs.flat_map(move |z| {
            let xs = xs.clone();
            ys.clone().flat_map(move |y| xs.clone().map(move |x| (z, y, x)))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    Unseen,
    Included,
    Rejected,
}

/// `Interior` when every neighbour of `idx` is included, otherwise `Boundary`.
/// Neighbours outside the grid count as excluded.
#[inline]
fn edge_value<T>(
    grid: &Array3<T>,
    idx: Idx3d,
    connectivity: Connectivity,
    included: impl Fn(&T) -> bool,
) -> MaskValue {
    let shape = grid.dim();
    let all_in = neighbour_offsets(connectivity)
        .all(|offset| offset_within(idx, offset, shape).is_some_and(|n| included(&grid[n])));
    if all_in {
        MaskValue::Interior
    } else {
        MaskValue::Boundary
    }
}

/// Classify every included cell of a membership grid.
fn classify(membership: &Array3<bool>, connectivity: Connectivity, processor: Processor) -> Array3<MaskValue> {
    let mut data = Array3::from_elem(membership.dim(), MaskValue::Excluded);
    let zip = Zip::indexed(&mut data).and(membership);

    match processor {
        Processor::Serial => zip.for_each(|idx, cell, &inside| {
            if inside {
                *cell = edge_value(membership, idx, connectivity, |v| *v);
            }
        }),
        Processor::Rayon => zip.par_for_each(|idx, cell, &inside| {
            if inside {
                *cell = edge_value(membership, idx, connectivity, |v| *v);
            }
        }),
    }
    data
}
