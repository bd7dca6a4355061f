//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks: N-dimensional arrays of `f32`s stored in
//! row-major order.

use std::fmt;

use anyhow::{anyhow, ensure};
use itertools::zip_eq;
use tinyvec::TinyVec;

type Shape = TinyVec<[usize; 4]>;

/// A dynamically sized tensor.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates an `N`-dimensional tensor of the given shape by calling `f` for each element.
    ///
    /// This will invoke `f` with successive indices to fill, starting with `[0, ..., 0, 0]`, then
    /// `[0, ..., 0, 1]` and so on.
    pub fn from_array_shape_fn<const N: usize, F: FnMut([usize; N]) -> f32>(
        shape: [usize; N],
        mut f: F,
    ) -> Self {
        let len = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut index = [0; N];
        for _ in 0..len {
            data.push(f(index));

            // Advance the innermost index, carrying into outer dimensions.
            for (i, size) in index.iter_mut().zip(shape).rev() {
                *i += 1;
                if *i < size {
                    break;
                }
                *i = 0;
            }
        }

        Self {
            shape: TinyVec::from(&shape[..]),
            data: data.into_boxed_slice(),
        }
    }

    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as specified by `shape` (by multiplying all of
    /// its entries), otherwise this method will panic.
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let data: Box<[f32]> = iter.into_iter().collect();
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "tensor data does not match shape {shape:?}"
        );
        Self {
            shape: TinyVec::from(shape),
            data,
        }
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let data = tract
            .as_slice::<f32>()
            .map_err(|e| anyhow!("unsupported network output: {e}"))?;
        Ok(Self::from_iter(tract.shape(), data.iter().copied()))
    }

    pub(super) fn to_tract(&self) -> anyhow::Result<tract_onnx::prelude::Tensor> {
        Ok(tract_onnx::prelude::Tensor::from_shape(
            self.shape(),
            &self.data,
        )?)
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns all elements of the tensor, in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the element at `indices`.
    ///
    /// Returns an error if `indices` does not address a single element of this tensor.
    pub fn get<const N: usize>(&self, indices: [usize; N]) -> anyhow::Result<f32> {
        ensure!(
            N == self.rank(),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape(),
            indices,
        );

        let mut offset = 0;
        for (&index, &size) in zip_eq(&indices, self.shape()) {
            ensure!(
                index < size,
                "index {:?} out of bounds for tensor of shape {:?}",
                indices,
                self.shape(),
            );
            offset = offset * size + index;
        }
        Ok(self.data[offset])
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor {:?} ", self.shape())?;
        if self.data.len() > 16 {
            write!(f, "[{} elements]", self.data.len())
        } else {
            f.debug_list().entries(self.data.iter()).finish()
        }
    }
}
