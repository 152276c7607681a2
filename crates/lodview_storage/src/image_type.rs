use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// The scalar type of each pixel component.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            ComponentType::U8 | ComponentType::I8 => 1,
            ComponentType::U16 | ComponentType::I16 => 2,
            ComponentType::U32 | ComponentType::I32 | ComponentType::F32 => 4,
            ComponentType::U64 | ComponentType::I64 | ComponentType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ComponentType::F32 | ComponentType::F64)
    }
}

/// How the components of one pixel are interpreted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PixelType {
    Scalar,
    Vector,
    Rgb,
    Rgba,
    Offset,
    CovariantVector,
    SymmetricSecondRankTensor,
    DiffusionTensor3D,
    Complex,
    FixedArray,
    Array,
    Matrix,
    VariableLengthVector,
    VariableSizeMatrix,
}

/// The layout of every pixel of a multiscale image. This is fixed for the lifetime of the image.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ImageType {
    /// Number of spatial dimensions, 2 or 3.
    pub dimension: usize,
    pub component_type: ComponentType,
    pub pixel_type: PixelType,
    pub components: usize,
}

impl ImageType {
    pub fn scalar(dimension: usize, component_type: ComponentType) -> Self {
        Self {
            dimension,
            component_type,
            pixel_type: PixelType::Scalar,
            components: 1,
        }
    }

    /// Size of one pixel (all components) in bytes.
    #[inline]
    pub fn pixel_size_bytes(&self) -> usize {
        self.components * self.component_type.size_bytes()
    }
}

/// A dense array of pixel components with a concrete element type.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_buffer {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            PixelBuffer::U8($v) => $body,
            PixelBuffer::I8($v) => $body,
            PixelBuffer::U16($v) => $body,
            PixelBuffer::I16($v) => $body,
            PixelBuffer::U32($v) => $body,
            PixelBuffer::I32($v) => $body,
            PixelBuffer::U64($v) => $body,
            PixelBuffer::I64($v) => $body,
            PixelBuffer::F32($v) => $body,
            PixelBuffer::F64($v) => $body,
        }
    };
}

impl PixelBuffer {
    /// A buffer of `len` zero components.
    pub fn zeroed(component_type: ComponentType, len: usize) -> Self {
        match component_type {
            ComponentType::U8 => PixelBuffer::U8(zeroed(len)),
            ComponentType::I8 => PixelBuffer::I8(zeroed(len)),
            ComponentType::U16 => PixelBuffer::U16(zeroed(len)),
            ComponentType::I16 => PixelBuffer::I16(zeroed(len)),
            ComponentType::U32 => PixelBuffer::U32(zeroed(len)),
            ComponentType::I32 => PixelBuffer::I32(zeroed(len)),
            ComponentType::U64 => PixelBuffer::U64(zeroed(len)),
            ComponentType::I64 => PixelBuffer::I64(zeroed(len)),
            ComponentType::F32 => PixelBuffer::F32(zeroed(len)),
            ComponentType::F64 => PixelBuffer::F64(zeroed(len)),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            PixelBuffer::U8(_) => ComponentType::U8,
            PixelBuffer::I8(_) => ComponentType::I8,
            PixelBuffer::U16(_) => ComponentType::U16,
            PixelBuffer::I16(_) => ComponentType::I16,
            PixelBuffer::U32(_) => ComponentType::U32,
            PixelBuffer::I32(_) => ComponentType::I32,
            PixelBuffer::U64(_) => ComponentType::U64,
            PixelBuffer::I64(_) => ComponentType::I64,
            PixelBuffer::F32(_) => ComponentType::F32,
            PixelBuffer::F64(_) => ComponentType::F64,
        }
    }

    /// The number of components (not pixels).
    pub fn len(&self) -> usize {
        with_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.component_type().size_bytes()
    }

    /// The raw native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        with_buffer!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        with_buffer!(self, v => bytemuck::cast_slice_mut(v.as_mut_slice()))
    }

    /// Component `i`, widened to `f64`.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        with_buffer!(self, v => v.get(i).map(|&x| x as f64))
    }

    /// The `[min, max]` of every `stride`-th component starting at `offset`, ignoring NaN. `None` if there are no values.
    pub fn strided_range(&self, offset: usize, stride: usize) -> Option<[f64; 2]> {
        let stride = stride.max(1);
        let mut range: Option<[f64; 2]> = None;
        with_buffer!(self, v => {
            for x in v.iter().skip(offset).step_by(stride) {
                let x = *x as f64;
                if x.is_nan() {
                    continue;
                }
                range = Some(match range {
                    Some([lo, hi]) => [lo.min(x), hi.max(x)],
                    None => [x, x],
                });
            }
        });

        range
    }
}

fn zeroed<T: Pod>(len: usize) -> Vec<T> {
    vec![T::zeroed(); len]
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
