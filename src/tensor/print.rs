use crate::tensor::Tensor;
use std::fmt;

/// 打印元素值（保留 4 位小数，过长的轴由`ndarray`以`...`省略）及形状
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:.4}", self.data)?;
        write!(f, "形状: {:?}", self.shape())
    }
}
