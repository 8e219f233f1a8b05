/*
 * @Author       : 老董
 * @Description  : Softmax 激活节点，沿最后一维：softmax(x)_i = exp(x_i) / Σ exp(x_j)
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, parent_value};
use crate::tensor::Tensor;
use rayon::prelude::*;

/// 对 [batch, K] 的输入逐行计算 softmax
///
/// 先减去每行最大值再取指数，避免溢出。
pub(in crate::nn::nodes) fn stable_softmax_rows(logits: &Tensor) -> Tensor {
    let num_classes = logits.shape()[1];
    let mut data = logits.to_vec();
    data.par_chunks_mut(num_classes).for_each(|row| {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for x in row.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in row.iter_mut() {
            *x /= sum;
        }
    });
    Tensor::from_vec(data, logits.shape())
}

pub(in crate::nn) struct Softmax {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl Softmax {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Softmax 节点需要正好 1 个父节点".to_string(),
            ));
        }
        let shape = parents[0].value_expected_shape().to_vec();
        if shape.len() != 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!("Softmax 节点需要 2D 输入 [batch, num_classes]，但得到 {shape:?}"),
            });
        }
        Ok(Self {
            value: None,
            grad: None,
            shape,
        })
    }
}

impl TraitNode for Softmax {
    fn type_name(&self) -> &'static str {
        "Softmax"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        self.value = Some(stable_softmax_rows(input));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    /// dx_i = s_i * (g_i - Σ_j g_j s_j)
    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let output = self
            .value
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少前向输出缓存".to_string()))?;
        let num_classes = output.shape()[1];
        let s = output.to_vec();
        let mut grad = upstream_grad.to_vec();
        grad.par_chunks_mut(num_classes)
            .zip(s.par_chunks(num_classes))
            .for_each(|(g_row, s_row)| {
                let dot: f32 = g_row.iter().zip(s_row).map(|(g, s)| g * s).sum();
                for (g, s) in g_row.iter_mut().zip(s_row) {
                    *g = s * (*g - dot);
                }
            });
        Ok(Tensor::from_vec(grad, output.shape()))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
