use crate::{ChunkBuffer, ChunkCoord, ComponentType, PixelBuffer, PyramidLevel};

use lodview_core::prelude::*;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AssemblyError {
    #[error("expected {expected} chunk buffers, got {actual}")]
    ChunkCount { expected: usize, actual: usize },
    #[error("chunk {coord:?} has {actual} bytes, expected at least {expected}")]
    ShortChunk {
        coord: ChunkCoord,
        expected: usize,
        actual: usize,
    },
}

/// How the elements of one chunk buffer are laid out in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkLayout {
    pub dims: Vec<Axis>,
    pub chunk_shape: AxisShape,
    pub component_type: ComponentType,
}

impl ChunkLayout {
    pub fn new(level: &PyramidLevel, component_type: ComponentType) -> Self {
        Self {
            dims: level.dims().to_vec(),
            chunk_shape: *level.chunk_shape(),
            component_type,
        }
    }

    /// Element strides of a C-order buffer over `dims`. Axes not in `dims` get stride 0.
    pub fn strides(&self) -> AxisMap<usize> {
        let mut strides = AxisMap::fill(0);
        let mut stride = 1;
        for &axis in self.dims.iter().rev() {
            strides[axis] = stride;
            stride *= self.chunk_shape[axis] as usize;
        }

        strides
    }

    /// Bytes in one full chunk buffer.
    pub fn chunk_bytes(&self) -> usize {
        self.dims.iter().map(|&a| self.chunk_shape[a] as usize).product::<usize>()
            * self.component_type.size_bytes()
    }
}

/// Copies the elements of `region` out of `chunks` into a dense buffer where x varies fastest, then y, then z, with the
/// components of each pixel interleaved innermost. `chunks[i]` holds the chunk at `coords[i]`.
///
/// Only the part of each chunk that overlaps `region` is read, so boundary padding never reaches the output. Rows along
/// the fastest storage axis are copied with one `copy_from_slice` whenever they are contiguous in the output too.
pub fn assemble_chunks(
    layout: &ChunkLayout,
    region: &IndexExtent,
    coords: &[ChunkCoord],
    chunks: &[ChunkBuffer],
) -> Result<PixelBuffer, AssemblyError> {
    if coords.len() != chunks.len() {
        return Err(AssemblyError::ChunkCount {
            expected: coords.len(),
            actual: chunks.len(),
        });
    }

    let element_size = layout.component_type.size_bytes();
    let chunk_bytes = layout.chunk_bytes();
    let src_strides = layout.strides();
    let dst_strides = output_strides(region);
    // The last storage axis has source stride 1.
    let row_axis = layout.dims.last().copied().unwrap_or(Axis::X);
    let dst_row_stride = dst_strides[row_axis];

    let mut output = PixelBuffer::zeroed(layout.component_type, region.num_points());
    let out = output.as_bytes_mut();
    for (coord, chunk) in coords.iter().zip(chunks.iter()) {
        if chunk.len() < chunk_bytes {
            return Err(AssemblyError::ShortChunk {
                coord: *coord,
                expected: chunk_bytes,
                actual: chunk.len(),
            });
        }

        let chunk_extent = IndexExtent::chunk_elements(coord, &layout.chunk_shape);
        let overlap = chunk_extent.intersection(region);
        if overlap.is_empty() {
            continue;
        }

        tracing::trace!("copying {} elements from chunk {:?}", overlap.num_points(), coord.0);
        let row_len = overlap.shape[row_axis] as usize;
        let row_bytes = row_len * element_size;
        let mut row_starts = overlap;
        row_starts.shape[row_axis] = 1;
        for p in row_starts.iter_points() {
            let src = offset(&p, &chunk_extent.minimum, &src_strides) * element_size;
            let dst = offset(&p, &region.minimum, &dst_strides) * element_size;
            if dst_row_stride == 1 {
                out[dst..dst + row_bytes].copy_from_slice(&chunk[src..src + row_bytes]);
            } else {
                let dst_step = dst_row_stride * element_size;
                for i in 0..row_len {
                    let (s, d) = (src + i * element_size, dst + i * dst_step);
                    out[d..d + element_size].copy_from_slice(&chunk[s..s + element_size]);
                }
            }
        }
    }

    Ok(output)
}

fn output_strides(region: &IndexExtent) -> AxisMap<usize> {
    let shape = region.shape.map(|_, s| s.max(0) as usize);
    let c = 1;
    let x = c * shape[Axis::C];
    let y = x * shape[Axis::X];
    let z = y * shape[Axis::Y];

    AxisMap([c, x, y, z, 0])
}

#[inline]
fn offset(p: &AxisMap<i64>, minimum: &AxisMap<i64>, strides: &AxisMap<usize>) -> usize {
    Axis::CXYZT
        .iter()
        .map(|&a| (p[a] - minimum[a]) as usize * strides[a])
        .sum()
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
