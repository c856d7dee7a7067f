use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::relu;

use super::{LatentAutoencoder, LatentExtractor};

#[derive(Config, Debug)]
pub struct DenseExtractorConfig {
    pub input_rows: usize,
    pub input_cols: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 32)]
    pub latent_dim: usize,
}

impl DenseExtractorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseExtractor<B> {
        let input = self.input_rows * self.input_cols;
        DenseExtractor {
            input: LinearConfig::new(input, self.hidden_size).init(device),
            hidden: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.latent_dim).init(device),
            input_size: input,
        }
    }
}

/// Flatten, two ReLU hidden layers, linear projection to the latent code.
#[derive(Module, Debug)]
pub struct DenseExtractor<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    output: Linear<B>,
    input_size: usize,
}

impl<B: Backend> DenseExtractor<B> {
    pub fn forward(&self, source: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, _] = source.dims();
        let x = source.reshape([batch, self.input_size]);
        let x = relu(self.input.forward(x));
        let x = relu(self.hidden.forward(x));
        self.output.forward(x)
    }
}

impl<B: Backend> LatentExtractor<B> for DenseExtractor<B> {
    fn extract(&self, source: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward(source)
    }
}

#[derive(Config, Debug)]
pub struct DenseAutoencoderConfig {
    pub rows: usize,
    pub cols: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 32)]
    pub latent_dim: usize,
}

impl DenseAutoencoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseAutoencoder<B> {
        let size = self.rows * self.cols;
        DenseAutoencoder {
            encode_hidden: LinearConfig::new(size, self.hidden_size).init(device),
            encode_latent: LinearConfig::new(self.hidden_size, self.latent_dim).init(device),
            decode_hidden: LinearConfig::new(self.latent_dim, self.hidden_size).init(device),
            decode_output: LinearConfig::new(self.hidden_size, size).init(device),
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// Symmetric dense autoencoder over `[rows × cols]` targets.
#[derive(Module, Debug)]
pub struct DenseAutoencoder<B: Backend> {
    encode_hidden: Linear<B>,
    encode_latent: Linear<B>,
    decode_hidden: Linear<B>,
    decode_output: Linear<B>,
    rows: usize,
    cols: usize,
}

impl<B: Backend> LatentAutoencoder<B> for DenseAutoencoder<B> {
    fn encode(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, _] = input.dims();
        let x = input.reshape([batch, self.rows * self.cols]);
        let x = relu(self.encode_hidden.forward(x));
        self.encode_latent.forward(x)
    }

    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, _] = latent.dims();
        let x = relu(self.decode_hidden.forward(latent));
        self.decode_output
            .forward(x)
            .reshape([batch, self.rows, self.cols])
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn extractor_maps_features_to_latent() {
        let device = Default::default();
        let model = DenseExtractorConfig::new(4, 6)
            .with_hidden_size(8)
            .with_latent_dim(3)
            .init::<TestBackend>(&device);
        let source = Tensor::<TestBackend, 3>::zeros([2, 4, 6], &device);
        assert_eq!(model.extract(source).dims(), [2, 3]);
    }

    #[test]
    fn autoencoder_round_trips_shapes() {
        let device = Default::default();
        let model = DenseAutoencoderConfig::new(2, 5)
            .with_hidden_size(8)
            .with_latent_dim(3)
            .init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 3>::ones([3, 2, 5], &device);
        let latent = model.encode(input);
        assert_eq!(latent.dims(), [3, 3]);
        assert_eq!(model.decode(latent).dims(), [3, 2, 5]);
    }
}
