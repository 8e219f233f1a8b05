/*
 * @Author       : 老董
 * @Description  : ReLU 激活节点，可选上限截断：y = min(max(x, 0), max_value)
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, parent_value};
use crate::tensor::Tensor;

pub(in crate::nn) struct ReLU {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    max_value: Option<f32>,
}

impl ReLU {
    pub(in crate::nn) fn new(
        parents: &[&NodeHandle],
        max_value: Option<f32>,
    ) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "ReLU 节点需要 1 个父节点".to_string(),
            ));
        }
        if let Some(max) = max_value
            && (max.is_nan() || max <= 0.0)
        {
            return Err(GraphError::InvalidOperation(format!(
                "ReLU 的截断上限须为正数，得到 {max}"
            )));
        }
        Ok(Self {
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            max_value,
        })
    }
}

impl TraitNode for ReLU {
    fn type_name(&self) -> &'static str {
        "ReLU"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        let max_value = self.max_value;
        self.value = Some(input.map(|x| match max_value {
            Some(max) => x.clamp(0.0, max),
            None => x.max(0.0),
        }));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    /// 导数在 (0, max_value) 内为 1，其余为 0
    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let input = parent_value(parents, 0)?;
        let max_value = self.max_value;
        let local_grad = input.map(|x| {
            if x > 0.0 && max_value.is_none_or(|max| x < max) {
                1.0
            } else {
                0.0
            }
        });
        Ok(upstream_grad * local_grad)
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
