//! ONNX inference through `tract`, and conversion of image regions into network inputs.

pub mod tensor;

use std::{ops::Index, ops::RangeInclusive, path::Path, sync::Arc};

use anyhow::{bail, Context};
use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, TypedFact, TypedOp,
};

use crate::image::{Color, Image, Rect, Resolution};
use tensor::Tensor;

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A [`NeuralNetwork`] taking a single RGB image, together with how to lay out and scale its
/// input. Cloning shares the loaded network.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    shape: CnnInputShape,
    input_res: Resolution,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Fails unless `nn` has a single input of the layout given by `shape`, with a batch size of 1
    /// and 3 channels.
    pub fn new(
        nn: NeuralNetwork,
        shape: CnnInputShape,
        color_mapper: ColorMapper,
    ) -> anyhow::Result<Self> {
        let input_res = Self::input_res_of(&nn, shape)?;
        Ok(Self {
            nn,
            shape,
            input_res,
            color_mapper,
        })
    }

    fn input_res_of(nn: &NeuralNetwork, shape: CnnInputShape) -> anyhow::Result<Resolution> {
        let inputs = nn.input_shapes();
        let [tensor_shape] = inputs.as_slice() else {
            bail!(
                "expected an image network with 1 input, got {} inputs",
                inputs.len(),
            );
        };

        let (w, h) = match (shape, tensor_shape.as_slice()) {
            (CnnInputShape::NCHW, [1, 3, h, w]) | (CnnInputShape::NHWC, [1, h, w, 3]) => (*w, *h),
            _ => bail!(
                "input shape {:?} does not match the {:?} layout",
                tensor_shape,
                shape,
            ),
        };

        Ok(Resolution::new(u32::try_from(w)?, u32::try_from(h)?))
    }

    /// Size of the image the network looks at.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Samples the region `roi` of `image` into an input tensor for this network.
    ///
    /// `roi` may extend past the edges of `image`; those parts are filled with black. If the aspect
    /// ratio of `roi` does not match the network's input, the region will be stretched.
    pub fn input_tensor(&self, image: &Image, roi: Rect) -> Tensor {
        sample_roi(image, roi, self.input_res, self.shape, &self.color_mapper)
    }

    /// Runs the network on the region `roi` of `image`, returning the estimated outputs.
    pub fn estimate(&self, image: &Image, roi: Rect) -> anyhow::Result<Outputs> {
        let tensor = self.input_tensor(image, roi);
        self.nn.estimate(&tensor)
    }
}

fn sample_roi(
    image: &Image,
    roi: Rect,
    input_res: Resolution,
    shape: CnnInputShape,
    color_mapper: &ColorMapper,
) -> Tensor {
    let (h, w) = (input_res.height() as usize, input_res.width() as usize);

    // Nearest-neighbor sampling at the center of every input pixel.
    let mut colors = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let uv = [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32];
            let [px, py] = roi.denormalize(uv);
            let color = image
                .get_checked(px.floor() as i64, py.floor() as i64)
                .unwrap_or(Color::BLACK);
            colors.push(color_mapper.map(color));
        }
    }

    match shape {
        CnnInputShape::NCHW => {
            Tensor::from_array_shape_fn([1, 3, h, w], |[_, c, y, x]| colors[y * w + x][c])
        }
        CnnInputShape::NHWC => {
            Tensor::from_array_shape_fn([1, h, w, 3], |[_, y, x, c]| colors[y * w + x][c])
        }
    }
}

/// Maps sRGB colors to the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Scales 0..=255 channel values linearly onto `target_range`. No gamma conversion is done.
    ///
    /// # Panics
    ///
    /// Panics if `target_range` is empty.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        let (lo, hi) = (*self.target_range.start(), *self.target_range.end());
        let scale = (hi - lo) / 255.0;
        [color.r(), color.g(), color.b()].map(|c| lo + f32::from(c) * scale)
    }
}

/// Memory layout of an image network's input tensor: batch (always 1), channels (3), height and
/// width, in some order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CnnInputShape {
    /// Channels first: `[1, 3, H, W]`.
    NCHW,
    /// Channels last: `[1, H, W, 3]`.
    NHWC,
}

/// An optimized, runnable ONNX model. Clones share the same model.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads and optimizes a pre-trained model from an ONNX file.
    ///
    /// Returns an error if the file cannot be read, if the network data is malformed, or if the
    /// network uses unimplemented operations.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.extension().map_or(true, |ext| ext != "onnx") {
            bail!("'{}' is not an ONNX file", path.display());
        }

        log::debug!("loading network from '{}'", path.display());
        let graph = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load network '{}'", path.display()))?
            .into_optimized()?;
        let model = SimplePlan::new(graph)?;
        Ok(Self(Arc::new(model)))
    }

    /// Returns the tensor shapes of the network's inputs.
    ///
    /// Inputs with a symbolic (not fully known) shape are reported as empty shapes.
    pub fn input_shapes(&self) -> Vec<Vec<usize>> {
        let model = self.0.model();
        (0..model.inputs.len())
            .map(|id| {
                model
                    .input_fact(id)
                    .ok()
                    .and_then(|fact| fact.shape.as_concrete())
                    .map(<[usize]>::to_vec)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Number of tensors every [`NeuralNetwork::estimate`] call produces.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Runs the network on `input`, returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, input: &Tensor) -> anyhow::Result<Outputs> {
        let input = TValue::from_const(Arc::new(input.to_tract()?));
        let outputs = self.0.run(tvec![input])?;
        let inner = outputs
            .iter()
            .map(|tract| Tensor::from_tract(tract))
            .collect::<anyhow::Result<_>>()?;
        Ok(Outputs { inner })
    }
}

/// Output tensors of one inference run, in the order of the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<Tensor>,
}

impl Outputs {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Index<usize> for Outputs {
    type Output = Tensor;

    fn index(&self, index: usize) -> &Tensor {
        &self.inner[index]
    }
}

impl FromIterator<Tensor> for Outputs {
    fn from_iter<T: IntoIterator<Item = Tensor>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_index_in_node_order() {
        let outputs: Outputs = [
            Tensor::from_iter(&[1, 2], [1.0, 2.0]),
            Tensor::from_iter(&[1], [3.0]),
        ]
        .into_iter()
        .collect();
        assert_eq!(outputs.len(), 2);
        assert!(!outputs.is_empty());
        assert_eq!(outputs[0].shape(), &[1, 2]);
        assert_eq!(outputs[1].as_slice(), &[3.0]);

        let none: Outputs = std::iter::empty::<Tensor>().collect();
        assert!(none.is_empty());
    }

    #[test]
    fn color_mapper() {
        let signed = ColorMapper::linear(-1.0..=1.0);
        assert_eq!(signed.map(Color::WHITE), [1.0; 3]);
        assert_eq!(signed.map(Color::BLACK), [-1.0; 3]);

        let mapper = ColorMapper::linear(0.0..=1.0);
        assert_eq!(mapper.map(Color::RED), [1.0, 0.0, 0.0]);
        assert_eq!(mapper.map(Color::BLACK), [0.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn color_mapper_empty_range() {
        ColorMapper::linear(1.0..=1.0);
    }

    #[test]
    fn sample_pads_outside_image() {
        let mut image = Image::new(2, 2);
        image.clear(Color::WHITE);
        image.set(1, 0, Color::RED);
        let mapper = ColorMapper::linear(0.0..=1.0);

        // 4x4 input over a 4x4 region whose top-left 2x2 block is the image.
        let roi = Rect::from_top_left(0.0, 0.0, 4.0, 4.0);
        let t = sample_roi(&image, roi, Resolution::new(4, 4), CnnInputShape::NCHW, &mapper);
        assert_eq!(t.shape(), &[1, 3, 4, 4]);
        assert_eq!(t.get([0, 0, 0, 0]).unwrap(), 1.0);
        assert_eq!(t.get([0, 0, 0, 1]).unwrap(), 1.0);
        assert_eq!(t.get([0, 1, 0, 1]).unwrap(), 0.0, "red pixel has no green");
        assert_eq!(t.get([0, 0, 3, 3]).unwrap(), 0.0, "padding is black");

        let t = sample_roi(&image, roi, Resolution::new(4, 4), CnnInputShape::NHWC, &mapper);
        assert_eq!(t.shape(), &[1, 4, 4, 3]);
        assert_eq!(t.get([0, 0, 1, 0]).unwrap(), 1.0);
        assert_eq!(t.get([0, 0, 1, 1]).unwrap(), 0.0);
        assert_eq!(t.get([0, 2, 2, 0]).unwrap(), 0.0);
    }

    #[test]
    fn sample_scales_roi() {
        let mut image = Image::new(8, 8);
        image.clear(Color::BLACK);
        image.set(6, 6, Color::WHITE);
        image.set(7, 7, Color::WHITE);
        image.set(6, 7, Color::WHITE);
        image.set(7, 6, Color::WHITE);
        let mapper = ColorMapper::linear(0.0..=1.0);

        // A 2x2 input covering the whole image samples one pixel per 4x4 block.
        let roi = Rect::from_top_left(0.0, 0.0, 8.0, 8.0);
        let t = sample_roi(&image, roi, Resolution::new(2, 2), CnnInputShape::NCHW, &mapper);
        assert_eq!(t.get([0, 0, 1, 1]).unwrap(), 1.0);
        assert_eq!(t.get([0, 0, 0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn missing_model_file() {
        assert!(NeuralNetwork::load("does/not/exist.onnx").is_err());
        assert!(NeuralNetwork::load("model.tflite").is_err());
    }
}
