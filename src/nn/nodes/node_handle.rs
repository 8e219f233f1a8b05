/*
 * @Author       : 老董
 * @Description  : 节点句柄：在具体节点（NodeType）之外记录 id、名称与前向传播批次
 */

use super::NodeId;
use super::raw_node::{NodeType, TraitNode};
use crate::nn::{GraphError, Regularizer};
use crate::tensor::Tensor;
use std::fmt;

pub(in crate::nn) struct NodeHandle {
    id: NodeId,
    name: String,
    raw_node: NodeType,
    /// 最后一次参与的前向传播 id，用于同一次传播内去重
    last_forward_pass_id: u64,
}

impl NodeHandle {
    pub(in crate::nn) fn new<T: Into<NodeType>>(id: NodeId, name: &str, raw_node: T) -> Self {
        Self {
            id,
            name: name.to_string(),
            raw_node: raw_node.into(),
            last_forward_pass_id: 0,
        }
    }

    pub(in crate::nn) const fn id(&self) -> NodeId {
        self.id
    }

    pub(in crate::nn) fn name(&self) -> &str {
        &self.name
    }

    pub(in crate::nn) fn type_name(&self) -> &'static str {
        self.raw_node.type_name()
    }

    pub(in crate::nn) const fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub(in crate::nn) fn value_expected_shape(&self) -> &[usize] {
        self.raw_node.value_expected_shape()
    }

    /// 输入、参数节点的值由外部设置，不依赖父节点
    pub(in crate::nn) const fn is_leaf(&self) -> bool {
        matches!(self.raw_node, NodeType::Input(_) | NodeType::Parameter(_))
    }

    pub(in crate::nn) const fn is_parameter(&self) -> bool {
        matches!(self.raw_node, NodeType::Parameter(_))
    }

    pub(in crate::nn) fn regularizer(&self) -> Option<Regularizer> {
        match &self.raw_node {
            NodeType::Parameter(p) => p.regularizer(),
            _ => None,
        }
    }

    pub(in crate::nn) const fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub(in crate::nn) const fn set_last_forward_pass_id(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
    }

    // ========== 值 ==========

    pub(in crate::nn) fn value(&self) -> Option<&Tensor> {
        self.raw_node.value()
    }

    pub(in crate::nn) fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node
            .set_value(value)
            .map_err(|e| self.with_node_context(e))
    }

    pub(in crate::nn) fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
    ) -> Result<(), GraphError> {
        let result = self.raw_node.calc_value_by_parents(parents);
        result.map_err(|e| self.with_node_context(e))
    }

    // ========== 梯度 ==========

    pub(in crate::nn) fn grad(&self) -> Option<&Tensor> {
        self.raw_node.grad()
    }

    pub(in crate::nn) fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node
            .set_grad(grad)
            .map_err(|e| self.with_node_context(e))
    }

    pub(in crate::nn) fn clear_grad(&mut self) {
        // 不存储梯度的节点（如输入）会返回错误，清空时可忽略
        let _ = self.raw_node.set_grad(None);
    }

    pub(in crate::nn) fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        self.raw_node
            .calc_grad_to_parent(parent_index, parents, upstream_grad)
            .map_err(|e| self.with_node_context(e))
    }

    pub(in crate::nn) fn set_train_mode(&mut self, is_train: bool) {
        self.raw_node.set_train_mode(is_train);
    }

    // 计算类错误补上节点信息，其余错误原样返回
    fn with_node_context(&self, error: GraphError) -> GraphError {
        match error {
            GraphError::ComputationError(msg) => {
                GraphError::ComputationError(format!("{self}: {msg}"))
            }
            GraphError::InvalidOperation(msg) => {
                GraphError::InvalidOperation(format!("{self}: {msg}"))
            }
            other => other,
        }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "节点[{}: {}（{}）]", self.id, self.name, self.type_name())
    }
}
