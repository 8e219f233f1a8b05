/*
 * @Author       : 老董
 * @Description  : 全局平均池化节点：[batch, C, H, W] -> [batch, C]
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, expect_4d, nchw, parent_value};
use crate::tensor::Tensor;

pub(in crate::nn) struct GlobalAvgPool2d {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl GlobalAvgPool2d {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "GlobalAvgPool2d 节点需要 1 个父节点".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        expect_4d(input_shape, "GlobalAvgPool2d")?;
        Ok(Self {
            value: None,
            grad: None,
            shape: vec![input_shape[0], input_shape[1]],
        })
    }
}

impl TraitNode for GlobalAvgPool2d {
    fn type_name(&self) -> &'static str {
        "GlobalAvgPool2d"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        let (batch, channels, h, w) = nchw(input.shape());
        let plane = h * w;
        let means = input
            .to_vec()
            .chunks(plane)
            .map(|p| p.iter().sum::<f32>() / plane as f32)
            .collect();
        self.value = Some(Tensor::from_vec(means, &[batch, channels]));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let input_shape = parent_value(parents, 0)?.shape();
        let (_, _, h, w) = nchw(input_shape);
        let plane = h * w;
        let scale = 1.0 / plane as f32;
        let grad = upstream_grad
            .to_vec()
            .into_iter()
            .flat_map(|g| std::iter::repeat_n(g * scale, plane))
            .collect();
        Ok(Tensor::from_vec(grad, input_shape))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
