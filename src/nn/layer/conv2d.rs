/*
 * @Author       : 老董
 * @Description  : Conv2d (2D 卷积) 层
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 计算：output = conv2d(x, K) + b
 */

use crate::nn::{Graph, GraphError, Init, Module, Regularizer, Var};
use serde::{Deserialize, Serialize};

/// 填充方式（与 Keras 同名）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// 不填充：H' = (H - k) / s + 1
    #[default]
    Valid,
    /// 填充使 H' = ceil(H / s)；总填充为奇数时，多出的一行/列补在下/右侧
    Same,
}

impl Padding {
    /// 一个空间维度上的 (前, 后) 填充量
    pub fn amounts(self, input: usize, kernel: usize, stride: usize) -> (usize, usize) {
        match self {
            Self::Valid => (0, 0),
            Self::Same => {
                let output = input.div_ceil(stride);
                let total = ((output - 1) * stride + kernel).saturating_sub(input);
                (total / 2, total - total / 2)
            }
        }
    }
}

/// Conv2d 的可选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conv2dOptions {
    pub stride: (usize, usize),
    pub padding: Padding,
    pub use_bias: bool,
    /// 卷积核初始化方式（偏置总是零初始化）
    pub init: Init,
    /// 卷积核正则项
    pub regularizer: Option<Regularizer>,
}

impl Default for Conv2dOptions {
    fn default() -> Self {
        Self {
            stride: (1, 1),
            padding: Padding::Valid,
            use_bias: true,
            init: Init::GlorotUniform,
            regularizer: None,
        }
    }
}

/// Conv2d (2D 卷积) 层
///
/// # 使用示例
/// ```ignore
/// let conv = Conv2d::new(&graph, 3, 96, (7, 7), Conv2dOptions {
///     stride: (2, 2),
///     padding: Padding::Same,
///     ..Default::default()
/// }, "stem")?;
/// let h = conv.forward(&x)?.relu()?;
/// ```
pub struct Conv2d {
    /// 卷积核参数 [out_channels, in_channels, kernel_h, kernel_w]
    kernel: Var,
    /// 偏置参数 [1, out_channels]（可选）
    bias: Option<Var>,
    out_channels: usize,
    kernel_size: (usize, usize),
    stride: (usize, usize),
    padding: Padding,
    name: String,
}

impl Conv2d {
    pub fn new(
        graph: &Graph,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        options: Conv2dOptions,
        name: &str,
    ) -> Result<Self, GraphError> {
        let (k_h, k_w) = kernel_size;
        let (s_h, s_w) = options.stride;
        if [in_channels, out_channels, k_h, k_w, s_h, s_w].contains(&0) {
            return Err(GraphError::InvalidOperation(format!(
                "Conv2d {name} 的通道数、卷积核尺寸与步长必须为正"
            )));
        }

        let kernel = graph.parameter_with_regularizer(
            &[out_channels, in_channels, k_h, k_w],
            options.init,
            options.regularizer,
            &format!("{name}_K"),
        )?;
        let bias = if options.use_bias {
            Some(graph.parameter(&[1, out_channels], Init::Zeros, &format!("{name}_b"))?)
        } else {
            None
        };

        Ok(Self {
            kernel,
            bias,
            out_channels,
            kernel_size,
            stride: options.stride,
            padding: options.padding,
            name: name.to_string(),
        })
    }

    /// 计算 `conv2d(x, K) + b`，`x` 形状 [batch_size, in_channels, H, W]
    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let input_shape = x.value_expected_shape()?;
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: format!("Conv2d {} 的输入必须是 4D [batch, C, H, W]", self.name),
            });
        }
        let (k_h, k_w) = self.kernel_size;
        let (s_h, s_w) = self.stride;
        let (top, bottom) = self.padding.amounts(input_shape[2], k_h, s_h);
        let (left, right) = self.padding.amounts(input_shape[3], k_w, s_w);

        let graph = x.get_graph();
        let conv_id = graph.inner_mut().new_conv2d_node(
            x.node_id(),
            self.kernel.node_id(),
            self.stride,
            (top, bottom, left, right),
            Some(&format!("{}_conv", self.name)),
        )?;

        match &self.bias {
            Some(bias) => {
                let out_id = graph.inner_mut().new_channel_bias_add_node(
                    conv_id,
                    bias.node_id(),
                    Some(&format!("{}_out", self.name)),
                )?;
                Ok(graph.wrap_node_id(out_id))
            }
            None => Ok(graph.wrap_node_id(conv_id)),
        }
    }

    pub const fn kernel(&self) -> &Var {
        &self.kernel
    }

    pub const fn bias(&self) -> Option<&Var> {
        self.bias.as_ref()
    }

    pub const fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Module for Conv2d {
    fn parameters(&self) -> Vec<Var> {
        let mut params = vec![self.kernel.clone()];
        if let Some(bias) = &self.bias {
            params.push(bias.clone());
        }
        params
    }
}
