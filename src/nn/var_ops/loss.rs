use crate::nn::{GraphError, Var};

pub trait VarLossOps {
    /// 带 softmax 的交叉熵，按 batch 取平均，结果形状为[1, 1]
    ///
    /// `self`是尚未 softmax 的 logits `[N, K]`，`target`是同形状的 one-hot 标签：
    ///
    /// ```ignore
    /// let loss = logits.cross_entropy(&labels)?;
    /// let total = loss.backward()?;
    /// ```
    fn cross_entropy(&self, target: &Var) -> Result<Var, GraphError>;
}

impl VarLossOps for Var {
    fn cross_entropy(&self, target: &Var) -> Result<Var, GraphError> {
        self.check_same_graph(target)?;
        let loss_id = self
            .graph()
            .borrow_mut()
            .new_softmax_cross_entropy_node(self.node_id(), target.node_id(), None)?;
        Ok(self.sibling(loss_id))
    }
}
