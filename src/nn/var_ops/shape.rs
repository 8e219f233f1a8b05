/*
 * @Author       : 老董
 * @Description  : Var 通道拼接、Dropout 扩展 trait
 */

use crate::nn::{GraphError, Var};

pub trait VarShapeOps {
    /// 与`others`沿通道维（axis=1）拼接，`self`在最前
    fn concat(&self, others: &[&Var]) -> Result<Var, GraphError>;

    /// Dropout（训练模式下以概率`rate`丢弃，评估模式下恒等）
    fn dropout(&self, rate: f32) -> Result<Var, GraphError>;
}

impl VarShapeOps for Var {
    fn concat(&self, others: &[&Var]) -> Result<Var, GraphError> {
        let mut ids = Vec::with_capacity(others.len() + 1);
        ids.push(self.node_id());
        for other in others {
            self.check_same_graph(other)?;
            ids.push(other.node_id());
        }
        let id = self.graph().borrow_mut().new_concat_node(&ids, None)?;
        Ok(self.sibling(id))
    }

    fn dropout(&self, rate: f32) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_dropout_node(self.node_id(), rate, None)?;
        Ok(self.sibling(id))
    }
}
