use super::Tensor;
use crate::errors::{Operator, TensorError};
use ndarray::{Axis, Slice};

impl Tensor {
    /// 返回一个形状为`shape`的新张量，元素按行优先顺序保持不变
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let new_total_elements: usize = shape.iter().product();
        assert!(
            self.size() == new_total_elements,
            "{}",
            TensorError::IncompatibleShape
        );
        Self::from_vec(self.to_vec(), shape)
    }

    /// 将多个张量沿`axis`维拼接成一个新张量。
    /// 除`axis`维以外，其余各维必须一致；`axis`维的长度可以不同。
    ///
    /// 如两个形状分别为`[2, 3, 4, 4]`和`[2, 5, 4, 4]`的张量沿`axis=1`拼接，得到`[2, 8, 4, 4]`。
    pub fn concat(tensors: &[&Self], axis: usize) -> Result<Self, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyList)?;
        if axis >= first.dimension() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                dimension: first.dimension(),
            });
        }
        for t in &tensors[1..] {
            let compatible = t.dimension() == first.dimension()
                && t.shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::OperatorError {
                    operator: Operator::Concat,
                    tensor1_shape: first.shape().to_vec(),
                    tensor2_shape: t.shape().to_vec(),
                });
            }
        }

        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = ndarray::concatenate(Axis(axis), &views)
            .map_err(|_| TensorError::InconsistentShape)?;
        Ok(Self::from_array(data))
    }

    /// `concat`的逆操作：将张量沿`axis`维按`sizes`切分成多个张量
    pub fn split_axis(&self, axis: usize, sizes: &[usize]) -> Result<Vec<Self>, TensorError> {
        if axis >= self.dimension() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                dimension: self.dimension(),
            });
        }
        let len = self.shape()[axis];
        let total: usize = sizes.iter().sum();
        if total != len {
            return Err(TensorError::SplitSizeMismatch { total, len });
        }

        let mut start = 0;
        let mut parts = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let view = self
                .data
                .slice_axis(Axis(axis), Slice::from(start..start + size));
            parts.push(Self::from_array(view.to_owned()));
            start += size;
        }
        Ok(parts)
    }
}
