/*
 * @Author       : 老董
 * @Description  : ChannelBiasAdd 节点：卷积层的通道级偏置广播
 *
 * output[b, c, h, w] = input[b, c, h, w] + bias[0, c]
 *
 * 父节点：
 * - parents[0]: 输入 [batch, C, H, W]
 * - parents[1]: 偏置 [1, C]
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, expect_4d, nchw, parent_value};
use crate::tensor::Tensor;

pub(in crate::nn) struct ChannelBiasAdd {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl ChannelBiasAdd {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "ChannelBiasAdd 节点需要恰好 2 个父节点（input 和 bias）".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        let bias_shape = parents[1].value_expected_shape();
        expect_4d(input_shape, "ChannelBiasAdd")?;
        let channels = input_shape[1];
        if bias_shape != [1, channels] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1, channels],
                got: bias_shape.to_vec(),
                message: "偏置形状须为 [1, C]".to_string(),
            });
        }
        Ok(Self {
            value: None,
            grad: None,
            shape: input_shape.to_vec(),
        })
    }
}

impl TraitNode for ChannelBiasAdd {
    fn type_name(&self) -> &'static str {
        "ChannelBiasAdd"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        let bias = parent_value(parents, 1)?;
        let channels = bias.size();
        // [1, C] -> [1, C, 1, 1] 后借助广播相加
        self.value = Some(input + bias.reshape(&[1, channels, 1, 1]));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        match parent_index {
            0 => Ok(upstream_grad.clone()),
            1 => {
                // 对 batch、H、W 求和
                let (batch, channels, h, w) = nchw(upstream_grad.shape());
                let g = upstream_grad.to_vec();
                let plane = h * w;
                let mut bias_grad = vec![0.0f32; channels];
                for b in 0..batch {
                    for (c, acc) in bias_grad.iter_mut().enumerate() {
                        let start = (b * channels + c) * plane;
                        *acc += g[start..start + plane].iter().sum::<f32>();
                    }
                }
                Ok(Tensor::from_vec(bias_grad, &[1, channels]))
            }
            _ => Err(GraphError::InvalidOperation(format!(
                "ChannelBiasAdd 只有 2 个父节点，不存在第{parent_index}个"
            ))),
        }
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
