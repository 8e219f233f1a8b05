/*
 * @Author       : 老董
 * @Description  : 张量的只读属性
 */

use super::Tensor;

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 阶数，即`shape()`的长度
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 元素总数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 形状是否逐维相同（[1, 4]与[4]视为不同）
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 只含一个元素时返回该元素，如形状为[]、[1]、[1, 1]的张量
    pub fn number(&self) -> Option<f32> {
        match self.size() {
            1 => self.data.iter().next().copied(),
            _ => None,
        }
    }

    /// 行优先顺序的全部元素
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// 右对齐后每一维相等或其一为 1 即可广播
    pub fn can_broadcast_with(&self, other: &Self) -> bool {
        self.shape()
            .iter()
            .rev()
            .zip(other.shape().iter().rev())
            .all(|(&a, &b)| a == b || a == 1 || b == 1)
    }

    pub(in crate::tensor) fn has_zero_value(&self) -> bool {
        self.data.iter().any(|&x| x == 0.0)
    }
}
