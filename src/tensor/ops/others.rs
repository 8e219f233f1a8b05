use crate::tensor::Tensor;
use ndarray::{Axis, Zip};
use std::cmp::PartialEq;

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Tensor {
    /// 对张量中的所有元素求和，返回纯数
    pub fn sum(&self) -> f32 {
        let mut value = 0.0;
        Zip::from(&self.data).for_each(|a| value += a);
        value
    }

    /// 所有元素的均值（空张量返回0）
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            return 0.0;
        }
        self.sum() / self.size() as f32
    }

    /// 所有元素的平方和，用于 L2 正则项
    pub fn sum_of_squares(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// 所有元素的绝对值之和，用于 L1 正则项
    pub fn sum_of_abs(&self) -> f32 {
        self.data.iter().map(|x| x.abs()).sum()
    }

    /// 逐元素映射，返回新张量
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Self {
        Self::from_array(self.data.mapv(f))
    }

    /// 逐元素符号：正数为1，负数为-1，零为0
    pub fn signum(&self) -> Self {
        self.map(|x| if x == 0.0 { 0.0 } else { x.signum() })
    }

    /// 沿最后一维求最大值的下标（如对`[batch, num_classes]`的概率求预测类别）
    pub fn argmax_last_axis(&self) -> Vec<usize> {
        let last = Axis(self.dimension().saturating_sub(1));
        self.data
            .lanes(last)
            .into_iter()
            .map(|lane| {
                lane.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
                        if v > best_v { (i, v) } else { (best_i, best_v) }
                    })
                    .0
            })
            .collect()
    }

    /// 沿某一维求和，且保留该维（长度变为1）
    pub fn sum_axis_keepdim(&self, axis: usize) -> Self {
        Self::from_array(self.data.sum_axis(Axis(axis)).insert_axis(Axis(axis)))
    }
}
