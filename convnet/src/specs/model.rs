use serde::{Deserialize, Serialize};

/// The specification of a parameter initializer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    TruncatedNormal { mean: f32, std_dev: f32 },
}

impl InitSpec {
    fn truncated_normal(std_dev: f32) -> Self {
        Self::TruncatedNormal { mean: 0., std_dev }
    }
}

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    /// Convolution (VALID padding) followed by batch normalization, a bias and a ReLU.
    ConvBlock {
        name: String,
        kernel: (usize, usize),
        filters: usize,
        #[serde(default = "default_stride")]
        stride: usize,
        init: InitSpec,
        bias: f32,
        #[serde(default)]
        weight_decay: Option<f32>,
    },
    /// Average pooling over VALID windows.
    AvgPool {
        name: String,
        size: usize,
        stride: usize,
    },
    /// A fully connected layer, `units` defaults to the number of classes.
    Dense {
        name: String,
        #[serde(default)]
        units: Option<usize>,
        init: InitSpec,
        bias: f32,
        #[serde(default)]
        weight_decay: Option<f32>,
        #[serde(default)]
        act_fn: Option<ActFnSpec>,
    },
}

impl LayerSpec {
    /// The variable scope of the layer.
    pub fn name(&self) -> &str {
        match self {
            LayerSpec::ConvBlock { name, .. }
            | LayerSpec::AvgPool { name, .. }
            | LayerSpec::Dense { name, .. } => name,
        }
    }

    fn conv_block(name: &str, kernel: usize, bias: f32) -> Self {
        Self::ConvBlock {
            name: name.into(),
            kernel: (kernel, kernel),
            filters: 64,
            stride: 1,
            init: InitSpec::truncated_normal(5e-2),
            bias,
            weight_decay: Some(0.),
        }
    }
}

/// The specification of the whole inference graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Height, width and channels of the input images.
    pub input: (usize, usize, usize),
    pub num_classes: usize,
    #[serde(default = "default_batch_norm_epsilon")]
    pub batch_norm_epsilon: f32,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl ModelSpec {
    /// The reference topology: seven convolution blocks, a 2x2 average pool, a 1024 unit hidden
    /// layer and the linear classifier.
    ///
    /// # Arguments
    /// * `input` - Height, width and channels of the input images.
    /// * `num_classes` - The amount of classes to tell apart.
    pub fn standard(input: (usize, usize, usize), num_classes: usize) -> Self {
        Self {
            input,
            num_classes,
            batch_norm_epsilon: default_batch_norm_epsilon(),
            layers: standard_layers(),
        }
    }

    /// Fills in the reference topology when the spec lists no layers.
    pub fn or_standard_layers(mut self) -> Self {
        if self.layers.is_empty() {
            self.layers = standard_layers();
        }

        self
    }
}

fn standard_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec::conv_block("conv1", 3, 0.0),
        LayerSpec::conv_block("conv2", 3, 0.0),
        LayerSpec::conv_block("conv3", 3, 0.1),
        LayerSpec::conv_block("conv4", 3, 0.1),
        LayerSpec::conv_block("conv5", 3, 0.1),
        LayerSpec::conv_block("conv6", 2, 0.1),
        LayerSpec::conv_block("conv7", 2, 0.1),
        LayerSpec::AvgPool {
            name: "pool_global".into(),
            size: 2,
            stride: 2,
        },
        LayerSpec::Dense {
            name: "Fully_connected".into(),
            units: Some(1024),
            init: InitSpec::truncated_normal(0.04),
            bias: 0.1,
            weight_decay: Some(0.001),
            act_fn: Some(ActFnSpec::Relu),
        },
        LayerSpec::Dense {
            name: "softmax_linear".into(),
            units: None,
            init: InitSpec::truncated_normal(0.04),
            bias: 0.0,
            weight_decay: Some(0.0),
            act_fn: None,
        },
    ]
}

fn default_stride() -> usize {
    1
}

fn default_batch_norm_epsilon() -> f32 {
    1e-4
}
