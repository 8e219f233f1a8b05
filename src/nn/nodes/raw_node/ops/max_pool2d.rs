/*
 * @Author       : 老董
 * @Description  : 2D 最大池化节点（无填充，即 Keras 的 `valid`）
 *
 * - 记录最大值位置用于反向传播（稀疏梯度）
 * - 输入必须是 4D [batch, C, H, W]，输出 [batch, C, H', W']
 * - 使用 Rayon 在 batch 维度并行
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, expect_4d, nchw, parent_value};
use crate::tensor::Tensor;
use rayon::prelude::*;

pub(in crate::nn) struct MaxPool2d {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    kernel_size: (usize, usize),
    stride: (usize, usize),
    // 每个输出位置对应的最大值在输入（整个 batch 展平后）中的下标
    max_indices: Option<Vec<usize>>,
}

impl MaxPool2d {
    /// `stride` 为 None 时等于 `kernel_size`
    pub(in crate::nn) fn new(
        parents: &[&NodeHandle],
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
    ) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "MaxPool2d 节点需要 1 个父节点".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        expect_4d(input_shape, "MaxPool2d")?;
        let (batch, channels, in_h, in_w) = nchw(input_shape);

        let (k_h, k_w) = kernel_size;
        let (s_h, s_w) = stride.unwrap_or(kernel_size);
        if k_h == 0 || k_w == 0 || s_h == 0 || s_w == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "MaxPool2d 的窗口与步长必须为正，得到窗口 {kernel_size:?}、步长 {:?}",
                (s_h, s_w)
            )));
        }
        if k_h > in_h || k_w > in_w {
            return Err(GraphError::InvalidOperation(format!(
                "MaxPool2d 池化窗口 {k_h}x{k_w} 超出输入尺寸 {in_h}x{in_w}"
            )));
        }

        let out_h = (in_h - k_h) / s_h + 1;
        let out_w = (in_w - k_w) / s_w + 1;
        Ok(Self {
            value: None,
            grad: None,
            shape: vec![batch, channels, out_h, out_w],
            kernel_size,
            stride: (s_h, s_w),
            max_indices: None,
        })
    }
}

impl TraitNode for MaxPool2d {
    fn type_name(&self) -> &'static str {
        "MaxPool2d"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        let (batch, channels, in_h, in_w) = nchw(input.shape());
        let (k_h, k_w) = self.kernel_size;
        let (s_h, s_w) = self.stride;
        let out_h = (in_h - k_h) / s_h + 1;
        let out_w = (in_w - k_w) / s_w + 1;
        let x = input.to_vec();
        let sample_len = channels * out_h * out_w;

        let (values, indices): (Vec<Vec<f32>>, Vec<Vec<usize>>) = (0..batch)
            .into_par_iter()
            .map(|b| {
                let mut sample_values = vec![0.0f32; sample_len];
                let mut sample_indices = vec![0usize; sample_len];
                for c in 0..channels {
                    let plane_start = (b * channels + c) * in_h * in_w;
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut max_val = f32::NEG_INFINITY;
                            let mut max_idx = plane_start + oh * s_h * in_w + ow * s_w;
                            for kh in 0..k_h {
                                for kw in 0..k_w {
                                    let idx = plane_start + (oh * s_h + kh) * in_w + ow * s_w + kw;
                                    if x[idx] > max_val {
                                        max_val = x[idx];
                                        max_idx = idx;
                                    }
                                }
                            }
                            let out_idx = (c * out_h + oh) * out_w + ow;
                            sample_values[out_idx] = max_val;
                            sample_indices[out_idx] = max_idx;
                        }
                    }
                }
                (sample_values, sample_indices)
            })
            .unzip();

        self.value = Some(Tensor::from_vec(
            values.concat(),
            &[batch, channels, out_h, out_w],
        ));
        self.max_indices = Some(indices.concat());
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    /// 梯度只流向各窗口的最大值位置
    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let max_indices = self
            .max_indices
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少最大值索引缓存".to_string()))?;
        let input_shape = parent_value(parents, 0)?.shape();
        let mut grad = vec![0.0f32; input_shape.iter().product()];
        for (&idx, g) in max_indices.iter().zip(upstream_grad.to_vec()) {
            grad[idx] += g;
        }
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
