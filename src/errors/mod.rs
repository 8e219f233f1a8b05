/*
 * @Author       : 老董
 * @Description  : 张量层面的错误。张量运算出错时以该错误的文本 panic（与 ndarray 的行为一致），
 *                 计算图层面则改用可恢复的`GraphError`
 */

use thiserror::Error;

mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: usize,
    },
    #[error("形状{tensor1_shape:?}与{tensor2_shape:?}不一致，无法{operator}")]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("{data_len}个元素无法构成形状{shape:?}")]
    DataShapeMismatch { data_len: usize, shape: Vec<usize> },
    #[error("张量列表为空")]
    EmptyList,
    /// 待拼接的张量除拼接轴外形状不同
    #[error("张量形状不一致")]
    InconsistentShape,
    #[error("张量形状不兼容")]
    IncompatibleShape,
    #[error("轴{axis}超出张量维数{dimension}")]
    AxisOutOfRange { axis: usize, dimension: usize },
    #[error("拆分尺寸之和{total}与该轴长度{len}不一致")]
    SplitSizeMismatch { total: usize, len: usize },
    #[error("除数张量中含有零")]
    DivByZeroElement,
}
