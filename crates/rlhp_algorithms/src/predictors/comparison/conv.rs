//! Convolutional scorer for image observations.
//!
//! Observations are `[height, width, ...]` in row-major order; every trailing axis
//! (colour channels, stacked frames) is folded into the channel dimension.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, LeakyRelu, LeakyReluConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::kernel::{Mlp, SegmentScorer};
use crate::templates::base_predictor::PredictorError;

/// `(kernel, stride)` of each convolution.
const CONV_LAYERS: [(usize, usize); 4] = [(7, 3), (5, 2), (3, 1), (3, 1)];
const CONV_FILTERS: usize = 16;

/// Convolution stack over the observation, then an MLP over the flattened features
/// concatenated with the encoded action.
#[derive(Module, Debug)]
pub struct ConvolutionalScorer<B: Backend> {
    convs: Vec<Conv2d<B>>,
    activation: LeakyRelu,
    dropout: Dropout,
    head: Mlp<B>,
    image_shape: [usize; 3],
    act_dim: usize,
}

impl<B: Backend> ConvolutionalScorer<B> {
    pub fn new(
        observation_shape: &[usize],
        act_dim: usize,
        hidden_sizes: &[usize],
        dropout: f64,
        device: &B::Device,
    ) -> Result<Self, PredictorError> {
        let [height, width, rest @ ..] = observation_shape else {
            return Err(PredictorError::Configuration(format!(
                "convolutional scorer needs [height, width, ...] observations, got {:?}",
                observation_shape
            )));
        };
        let (height, width) = (*height, *width);
        let channels: usize = rest.iter().product();
        if height == 0 || width == 0 || channels == 0 {
            return Err(PredictorError::Configuration(format!(
                "observation shape {:?} has no elements",
                observation_shape
            )));
        }

        let (mut h, mut w, mut in_channels) = (height, width, channels);
        let mut convs = Vec::with_capacity(CONV_LAYERS.len());
        for (kernel, stride) in CONV_LAYERS {
            if h < kernel || w < kernel {
                return Err(PredictorError::Configuration(format!(
                    "observation {}x{} is too small for the convolution stack",
                    height, width
                )));
            }
            convs.push(
                Conv2dConfig::new([in_channels, CONV_FILTERS], [kernel, kernel])
                    .with_stride([stride, stride])
                    .init(device),
            );
            h = (h - kernel) / stride + 1;
            w = (w - kernel) / stride + 1;
            in_channels = CONV_FILTERS;
        }

        Ok(Self {
            convs,
            activation: LeakyReluConfig::new().init(),
            dropout: DropoutConfig::new(dropout).init(),
            head: Mlp::new(h * w * CONV_FILTERS + act_dim, hidden_sizes, 1, dropout, device),
            image_shape: [height, width, channels],
            act_dim,
        })
    }
}

impl<B: Backend> SegmentScorer<B> for ConvolutionalScorer<B> {
    fn forward(&self, obs: Tensor<B, 2>, act: Tensor<B, 2>) -> Tensor<B, 2> {
        let [height, width, channels] = self.image_shape;
        let rows = obs.dims()[0];

        let mut x: Tensor<B, 4> = obs
            .reshape([rows, height, width, channels])
            .permute([0, 3, 1, 2]);
        for conv in &self.convs {
            x = conv.forward(x);
            x = self.activation.forward(x);
            x = self.dropout.forward(x);
        }

        let features: Tensor<B, 2> = x.flatten(1, 3);
        self.head.forward(Tensor::cat(vec![features, act], 1))
    }

    fn input_width(&self) -> usize {
        self.image_shape.iter().product::<usize>() + self.act_dim
    }
}
