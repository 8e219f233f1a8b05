/*
 * @Author       : 老董
 * @Description  : 2D 卷积节点（NCHW，互相关）
 *
 * - 输入必须是 4D [batch, C_in, H, W]，输出 [batch, C_out, H', W']
 * - 填充可以上下、左右不对称（Keras `same` 在总填充为奇数时多出的一行/列补在下/右侧）
 * - 使用 Rayon 在 batch 维度并行
 *
 * 父节点：
 * - parents[0]: 输入数据
 * - parents[1]: 卷积核参数 [C_out, C_in, kH, kW]
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, expect_4d, nchw, parent_value};
use crate::tensor::Tensor;
use rayon::prelude::*;

/// 四边零填充量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(in crate::nn) struct Pad2d {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Pad2d {
    const fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

pub(in crate::nn) struct Conv2d {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    stride: (usize, usize),
    padding: Pad2d,
    // 反向传播缓存：填充后的输入
    padded_input: Option<Tensor>,
}

impl Conv2d {
    pub(in crate::nn) fn new(
        parents: &[&NodeHandle],
        stride: (usize, usize),
        padding: Pad2d,
    ) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "Conv2d 节点需要 2 个父节点：[输入, 卷积核]".to_string(),
            ));
        }
        if stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "Conv2d 的步长必须为正，得到 {stride:?}"
            )));
        }

        let input_shape = parents[0].value_expected_shape();
        let kernel_shape = parents[1].value_expected_shape();
        expect_4d(input_shape, "Conv2d")?;
        if kernel_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: kernel_shape.len(),
                message: format!("卷积核必须是 4D [C_out, C_in, kH, kW]，得到 {kernel_shape:?}"),
            });
        }

        let (batch, in_c, in_h, in_w) = nchw(input_shape);
        let (out_c, kernel_in_c, k_h, k_w) = nchw(kernel_shape);
        if in_c != kernel_in_c {
            return Err(GraphError::ShapeMismatch {
                expected: vec![kernel_in_c],
                got: vec![in_c],
                message: format!("输入通道数 {in_c} 与卷积核输入通道数 {kernel_in_c} 不匹配"),
            });
        }

        let padded_h = in_h + padding.top + padding.bottom;
        let padded_w = in_w + padding.left + padding.right;
        if padded_h < k_h || padded_w < k_w {
            return Err(GraphError::InvalidOperation(format!(
                "卷积核 {k_h}x{k_w} 大于填充后的输入 {padded_h}x{padded_w}"
            )));
        }
        let out_h = (padded_h - k_h) / stride.0 + 1;
        let out_w = (padded_w - k_w) / stride.1 + 1;

        Ok(Self {
            value: None,
            grad: None,
            shape: vec![batch, out_c, out_h, out_w],
            stride,
            padding,
            padded_input: None,
        })
    }

    fn pad_input(&self, input: &Tensor) -> Tensor {
        if self.padding.is_zero() {
            return input.clone();
        }
        let (batch, c, h, w) = nchw(input.shape());
        let Pad2d { top, bottom, left, right } = self.padding;
        let (new_h, new_w) = (h + top + bottom, w + left + right);
        let src = input.to_vec();

        let mut data = vec![0.0f32; batch * c * new_h * new_w];
        data.par_chunks_mut(c * new_h * new_w)
            .enumerate()
            .for_each(|(b, sample)| {
                for ci in 0..c {
                    for hi in 0..h {
                        let src_row = ((b * c + ci) * h + hi) * w;
                        let dst_row = (ci * new_h + hi + top) * new_w + left;
                        sample[dst_row..dst_row + w].copy_from_slice(&src[src_row..src_row + w]);
                    }
                }
            });
        Tensor::from_vec(data, &[batch, c, new_h, new_w])
    }

    fn convolve(&self, padded: &Tensor, kernel: &Tensor) -> Tensor {
        let (batch, in_c, in_h, in_w) = nchw(padded.shape());
        let (out_c, _, k_h, k_w) = nchw(kernel.shape());
        let (s_h, s_w) = self.stride;
        let out_h = (in_h - k_h) / s_h + 1;
        let out_w = (in_w - k_w) / s_w + 1;
        let x = padded.to_vec();
        let k = kernel.to_vec();

        let mut data = vec![0.0f32; batch * out_c * out_h * out_w];
        data.par_chunks_mut(out_c * out_h * out_w)
            .enumerate()
            .for_each(|(b, sample)| {
                for oc in 0..out_c {
                    let out_plane = &mut sample[oc * out_h * out_w..(oc + 1) * out_h * out_w];
                    for ic in 0..in_c {
                        let in_plane = &x[(b * in_c + ic) * in_h * in_w..];
                        for kh in 0..k_h {
                            for kw in 0..k_w {
                                let weight = k[((oc * in_c + ic) * k_h + kh) * k_w + kw];
                                for oh in 0..out_h {
                                    let row = (oh * s_h + kh) * in_w + kw;
                                    for ow in 0..out_w {
                                        out_plane[oh * out_w + ow] += weight * in_plane[row + ow * s_w];
                                    }
                                }
                            }
                        }
                    }
                }
            });
        Tensor::from_vec(data, &[batch, out_c, out_h, out_w])
    }

    /// dL/dX：先对填充后的输入求梯度（转置卷积），再裁掉填充区
    fn grad_to_input(&self, kernel: &Tensor, upstream_grad: &Tensor, input_shape: &[usize]) -> Tensor {
        let (batch, in_c, in_h, in_w) = nchw(input_shape);
        let (out_c, _, k_h, k_w) = nchw(kernel.shape());
        let (_, _, out_h, out_w) = nchw(upstream_grad.shape());
        let (s_h, s_w) = self.stride;
        let Pad2d { top, bottom, left, right } = self.padding;
        let (p_h, p_w) = (in_h + top + bottom, in_w + left + right);
        let k = kernel.to_vec();
        let g = upstream_grad.to_vec();

        let mut data = vec![0.0f32; batch * in_c * in_h * in_w];
        data.par_chunks_mut(in_c * in_h * in_w)
            .enumerate()
            .for_each(|(b, sample)| {
                let mut padded_grad = vec![0.0f32; in_c * p_h * p_w];
                for oc in 0..out_c {
                    let g_plane = &g[(b * out_c + oc) * out_h * out_w..];
                    for ic in 0..in_c {
                        let dst_plane = &mut padded_grad[ic * p_h * p_w..(ic + 1) * p_h * p_w];
                        for kh in 0..k_h {
                            for kw in 0..k_w {
                                let weight = k[((oc * in_c + ic) * k_h + kh) * k_w + kw];
                                for oh in 0..out_h {
                                    let row = (oh * s_h + kh) * p_w + kw;
                                    for ow in 0..out_w {
                                        dst_plane[row + ow * s_w] += weight * g_plane[oh * out_w + ow];
                                    }
                                }
                            }
                        }
                    }
                }
                for ic in 0..in_c {
                    for hi in 0..in_h {
                        let src_row = (ic * p_h + hi + top) * p_w + left;
                        let dst_row = (ic * in_h + hi) * in_w;
                        sample[dst_row..dst_row + in_w]
                            .copy_from_slice(&padded_grad[src_row..src_row + in_w]);
                    }
                }
            });
        Tensor::from_vec(data, input_shape)
    }

    /// dL/dK：各样本分别求相关，再跨 batch 累加
    fn grad_to_kernel(&self, padded: &Tensor, kernel_shape: &[usize], upstream_grad: &Tensor) -> Tensor {
        let (batch, in_c, in_h, in_w) = nchw(padded.shape());
        let (out_c, _, k_h, k_w) = nchw(kernel_shape);
        let (_, _, out_h, out_w) = nchw(upstream_grad.shape());
        let (s_h, s_w) = self.stride;
        let x = padded.to_vec();
        let g = upstream_grad.to_vec();
        let kernel_len = out_c * in_c * k_h * k_w;

        let data = (0..batch)
            .into_par_iter()
            .map(|b| {
                let mut sample_grad = vec![0.0f32; kernel_len];
                for oc in 0..out_c {
                    let g_plane = &g[(b * out_c + oc) * out_h * out_w..];
                    for ic in 0..in_c {
                        let in_plane = &x[(b * in_c + ic) * in_h * in_w..];
                        for kh in 0..k_h {
                            for kw in 0..k_w {
                                let mut acc = 0.0f32;
                                for oh in 0..out_h {
                                    let row = (oh * s_h + kh) * in_w + kw;
                                    for ow in 0..out_w {
                                        acc += g_plane[oh * out_w + ow] * in_plane[row + ow * s_w];
                                    }
                                }
                                sample_grad[((oc * in_c + ic) * k_h + kh) * k_w + kw] += acc;
                            }
                        }
                    }
                }
                sample_grad
            })
            .reduce(
                || vec![0.0f32; kernel_len],
                |mut total, sample| {
                    total.iter_mut().zip(sample).for_each(|(t, s)| *t += s);
                    total
                },
            );
        Tensor::from_vec(data, kernel_shape)
    }
}

impl TraitNode for Conv2d {
    fn type_name(&self) -> &'static str {
        "Conv2d"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        let kernel = parent_value(parents, 1)?;
        if input.dimension() != 4 || input.shape()[1] != kernel.shape()[1] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.shape[0], kernel.shape()[1], 0, 0],
                got: input.shape().to_vec(),
                message: "Conv2d 的输入必须是 4D 且通道数与卷积核一致".to_string(),
            });
        }

        let padded = self.pad_input(input);
        self.value = Some(self.convolve(&padded, kernel));
        self.padded_input = Some(padded);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        let padded = self
            .padded_input
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少填充后的输入缓存".to_string()))?;
        let kernel = parent_value(parents, 1)?;
        match parent_index {
            0 => {
                let input = parent_value(parents, 0)?;
                Ok(self.grad_to_input(kernel, upstream_grad, input.shape()))
            }
            1 => Ok(self.grad_to_kernel(padded, kernel.shape(), upstream_grad)),
            _ => Err(GraphError::InvalidOperation(format!(
                "Conv2d 只有 2 个父节点，不存在第{parent_index}个"
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
