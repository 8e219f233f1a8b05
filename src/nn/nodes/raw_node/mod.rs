mod input;
mod loss;
mod ops;
mod parameter;

pub(in crate::nn) use input::Input;
pub(in crate::nn) use loss::SoftmaxCrossEntropy;
pub(in crate::nn) use ops::*;
pub(in crate::nn) use parameter::Parameter;

use super::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

#[enum_dispatch]
pub(in crate::nn) enum NodeType {
    Input(Input),
    Parameter(Parameter),
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Conv2d(Conv2d),
    ChannelBiasAdd(ChannelBiasAdd),
    MaxPool2d(MaxPool2d),
    GlobalAvgPool2d(GlobalAvgPool2d),
    Concat(Concat),
    Dropout(Dropout),
    ReLU(ReLU),
    Softmax(Softmax),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    SoftmaxCrossEntropy(SoftmaxCrossEntropy),
}

#[enum_dispatch(NodeType)]
pub(in crate::nn) trait TraitNode {
    /// 节点类型名，用于自动命名和显示
    fn type_name(&self) -> &'static str;

    /// 构图时推断出的输出形状（第一维为构图时声明的 batch）
    fn value_expected_shape(&self) -> &[usize];

    // 根据父节点的值计算本节点的值（由 Graph 保证调用前所有父节点的值都已计算）
    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError>;

    fn value(&self) -> Option<&Tensor>;

    fn set_value(&mut self, _value: Option<&Tensor>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "该类型节点的值不应该被手动设置".to_string(),
        ))
    }

    /// VJP：给定本节点的上游梯度，计算对第`parent_index`个父节点的梯度（形状与该父节点的值相同）
    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError>;

    fn grad(&self) -> Option<&Tensor>;

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError>;

    /// 训练/评估模式切换，只有行为随模式变化的节点需要关心
    fn set_train_mode(&mut self, _is_train: bool) {}
}

/// 取第`index`个父节点的值，未计算时报错
pub(in crate::nn::nodes) fn parent_value<'a>(
    parents: &[&'a NodeHandle],
    index: usize,
) -> Result<&'a Tensor, GraphError> {
    let parent = parents.get(index).ok_or_else(|| {
        GraphError::ComputationError(format!("缺少第{index}个父节点"))
    })?;
    parent
        .value()
        .ok_or_else(|| GraphError::ComputationError(format!("父{parent}没有值")))
}

/// 取 4D 张量的 (N, C, H, W)
pub(in crate::nn::nodes) fn nchw(shape: &[usize]) -> (usize, usize, usize, usize) {
    (shape[0], shape[1], shape[2], shape[3])
}

/// 构图时校验父节点输出为 4D `[batch, C, H, W]`
pub(in crate::nn::nodes) fn expect_4d(shape: &[usize], op: &str) -> Result<(), GraphError> {
    if shape.len() != 4 {
        return Err(GraphError::DimensionMismatch {
            expected: 4,
            got: shape.len(),
            message: format!("{op} 的输入必须是 4D [batch, C, H, W]，得到 {shape:?}"),
        });
    }
    Ok(())
}
