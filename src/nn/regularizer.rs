/*
 * @Author       : 老董
 * @Description  : 权重正则项（对应 Keras 的 kernel_regularizer）
 *
 * 正则项挂在参数节点上：
 * - 前向：`penalty()` 计入总损失
 * - 反向：`grad()` 累加到参数梯度
 */

use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 权重正则项
///
/// 与 Keras 一致：
/// - `L1(l1)`：`l1 * Σ|w|`
/// - `L2(l2)`：`l2 * Σw²`（注意没有 1/2 系数）
/// - `L1L2`：二者之和
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularizer {
    L1(f32),
    L2(f32),
    L1L2 { l1: f32, l2: f32 },
}

impl Regularizer {
    /// 正则惩罚值
    pub fn penalty(&self, weights: &Tensor) -> f32 {
        match *self {
            Self::L1(l1) => l1 * weights.sum_of_abs(),
            Self::L2(l2) => l2 * weights.sum_of_squares(),
            Self::L1L2 { l1, l2 } => l1 * weights.sum_of_abs() + l2 * weights.sum_of_squares(),
        }
    }

    /// 正则惩罚对权重的梯度，形状与权重相同
    pub fn grad(&self, weights: &Tensor) -> Tensor {
        match *self {
            Self::L1(l1) => weights.signum() * l1,
            Self::L2(l2) => weights * (2.0 * l2),
            Self::L1L2 { l1, l2 } => weights.signum() * l1 + weights * (2.0 * l2),
        }
    }
}

impl Default for Regularizer {
    /// 默认与 `keras.regularizers.l2()` 相同，系数 0.01
    fn default() -> Self {
        Self::L2(0.01)
    }
}
