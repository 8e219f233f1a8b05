/*
 * @Author       : 老董
 * @Description  : Var 激活函数扩展 trait
 */

use crate::nn::{GraphError, Var};

/// 激活函数扩展 trait
///
/// ```ignore
/// use squeeze_torch::nn::{Var, VarActivationOps};
///
/// let h = x.relu()?;
/// let h6 = x.relu_clamped(6.0)?;
/// let probs = logits.softmax()?;
/// ```
pub trait VarActivationOps {
    /// `ReLU` 激活：max(0, x)
    fn relu(&self) -> Result<Var, GraphError>;

    /// 带上限的 `ReLU`：min(max(0, x), `max_value`)（如 ReLU6）
    fn relu_clamped(&self, max_value: f32) -> Result<Var, GraphError>;

    /// Softmax：沿最后一维把 logits 转换为概率分布
    ///
    /// 输入形状 [batch, `num_classes`]，输出形状相同。
    fn softmax(&self) -> Result<Var, GraphError>;
}

impl VarActivationOps for Var {
    fn relu(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_relu_node(self.node_id(), None, None)?;
        Ok(self.sibling(id))
    }

    fn relu_clamped(&self, max_value: f32) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_relu_node(self.node_id(), Some(max_value), None)?;
        Ok(self.sibling(id))
    }

    fn softmax(&self) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_softmax_node(self.node_id(), None)?;
        Ok(self.sibling(id))
    }
}
