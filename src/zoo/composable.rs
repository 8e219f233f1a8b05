/*
 * @Author       : 老董
 * @Description  : Composable：模型定义共用的超参数
 *
 * 统一各个模型（及其中各层）的：
 * - 卷积核初始化方式
 * - 卷积核正则项
 * - ReLU 截断上限
 * - 是否使用偏置
 */

use crate::nn::{
    Conv2d, Conv2dOptions, GraphError, Init, Padding, Regularizer, Var, VarActivationOps,
};

/// 模型定义共用的超参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composable {
    /// 卷积核初始化方式
    pub init_weights: Init,
    /// 卷积核正则项（None 表示不加）
    pub reg: Option<Regularizer>,
    /// ReLU 截断上限（None 表示普通 ReLU）
    pub relu: Option<f32>,
    /// 卷积层是否带偏置
    pub bias: bool,
}

impl Default for Composable {
    fn default() -> Self {
        Self {
            init_weights: Init::GlorotUniform,
            reg: Some(Regularizer::L2(0.001)),
            relu: None,
            bias: true,
        }
    }
}

impl Composable {
    pub const fn new(init_weights: Init, reg: Option<Regularizer>, relu: Option<f32>) -> Self {
        Self {
            init_weights,
            reg,
            relu,
            bias: true,
        }
    }

    /// 按本模型的截断策略施加 ReLU
    pub fn relu_activation(&self, x: &Var) -> Result<Var, GraphError> {
        match self.relu {
            Some(max_value) => x.relu_clamped(max_value),
            None => x.relu(),
        }
    }

    /// 按本模型的初始化/正则/偏置策略生成卷积选项
    pub const fn conv_options(&self, stride: (usize, usize), padding: Padding) -> Conv2dOptions {
        Conv2dOptions {
            stride,
            padding,
            use_bias: self.bias,
            init: self.init_weights,
            regularizer: self.reg,
        }
    }

    /// 2D 卷积（输入通道数取自`x`的形状）
    pub fn conv2d(
        &self,
        x: &Var,
        filters: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
        name: &str,
    ) -> Result<Var, GraphError> {
        self.conv2d_with(x, filters, kernel_size, self.conv_options(stride, padding), name)
    }

    /// 与`conv2d`相同，但由调用方给出完整的卷积选项（可覆盖初始化、正则等）
    pub fn conv2d_with(
        &self,
        x: &Var,
        filters: usize,
        kernel_size: (usize, usize),
        options: Conv2dOptions,
        name: &str,
    ) -> Result<Var, GraphError> {
        let shape = x.value_expected_shape()?;
        if shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: shape.len(),
                message: format!("卷积层 {name} 的输入必须是 4D [batch, C, H, W]"),
            });
        }
        let conv = Conv2d::new(&x.get_graph(), shape[1], filters, kernel_size, options, name)?;
        conv.forward(x)
    }
}
