/*
 * @Author       : 老董
 * @Description  : Concat 节点：沿通道维（axis=1）拼接多个父节点
 *
 * 反向传播时把上游梯度按各父节点的通道数切回去
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, parent_value};
use crate::tensor::Tensor;

const CHANNEL_AXIS: usize = 1;

pub(in crate::nn) struct Concat {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    /// 各父节点在通道维上的长度
    split_sizes: Vec<usize>,
}

impl Concat {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        let first = parents.first().ok_or_else(|| {
            GraphError::InvalidOperation("Concat 节点至少需要 1 个父节点".to_string())
        })?;
        let first_shape = first.value_expected_shape();
        if first_shape.len() < 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: first_shape.len(),
                message: "Concat 的输入至少是 2D [batch, C, ...]".to_string(),
            });
        }

        let mut split_sizes = Vec::with_capacity(parents.len());
        for parent in parents {
            let shape = parent.value_expected_shape();
            let compatible = shape.len() == first_shape.len()
                && shape
                    .iter()
                    .zip(first_shape)
                    .enumerate()
                    .all(|(i, (a, b))| i == CHANNEL_AXIS || a == b);
            if !compatible {
                return Err(GraphError::ShapeMismatch {
                    expected: first_shape.to_vec(),
                    got: shape.to_vec(),
                    message: format!("{parent}与首个父节点除通道维外的形状不一致"),
                });
            }
            split_sizes.push(shape[CHANNEL_AXIS]);
        }

        let mut shape = first_shape.to_vec();
        shape[CHANNEL_AXIS] = split_sizes.iter().sum();
        Ok(Self {
            value: None,
            grad: None,
            shape,
            split_sizes,
        })
    }
}

impl TraitNode for Concat {
    fn type_name(&self) -> &'static str {
        "Concat"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let values = (0..parents.len())
            .map(|i| parent_value(parents, i))
            .collect::<Result<Vec<_>, _>>()?;
        self.value = Some(Tensor::concat(&values, CHANNEL_AXIS)?);
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
        let mut parts = upstream_grad.split_axis(CHANNEL_AXIS, &self.split_sizes)?;
        if parent_index >= parts.len() {
            return Err(GraphError::InvalidOperation(format!(
                "Concat 只有 {} 个父节点，不存在第{parent_index}个",
                parts.len()
            )));
        }
        Ok(parts.swap_remove(parent_index))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
