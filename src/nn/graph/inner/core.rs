/*
 * @Author       : 老董
 * @Description  : 节点表的增查与前向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{NodeHandle, NodeType};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::trace;

impl GraphInner {
    pub fn new() -> Self {
        Self::with_name("graph")
    }

    /// 带固定种子的图，参数初始化与 Dropout 掩码均可复现
    pub fn new_with_seed(seed: u64) -> Self {
        let mut graph = Self::new();
        graph.set_seed(seed);
        graph
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            nodes: HashMap::new(),
            parents: HashMap::new(),
            pass_id: 0,
            next_id: 0,
            training: true,
            rng: None,
        }
    }

    /// 重新设定随机种子，之后的随机序列从头开始
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Some(StdRng::seed_from_u64(seed));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 全部节点 id，按创建先后排列
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<&NodeHandle>, GraphError> {
        ids.iter().map(|id| self.get_node(*id)).collect()
    }

    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.get_node(id)?;
        Ok(self.parents.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        self.get_node(id).map(NodeHandle::name)
    }

    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        self.get_node(id).map(NodeHandle::value)
    }

    pub fn set_node_value(&mut self, id: NodeId, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_value(value)
    }

    pub fn get_node_value_expected_shape(&self, id: NodeId) -> Result<&[usize], GraphError> {
        self.get_node(id).map(NodeHandle::value_expected_shape)
    }

    /// 节点的梯度；输入节点不参与求导，对其取梯度视为误用
    pub fn get_node_grad(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        let node = self.get_node(id)?;
        match node.node_type() {
            NodeType::Input(_) => Err(GraphError::InvalidOperation(format!(
                "{node}是输入节点，没有梯度"
            ))),
            _ => Ok(node.grad()),
        }
    }

    /// 可训练的参数节点，按创建先后排列
    pub fn get_trainable_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|id| self.nodes[id].is_parameter())
            .collect()
    }

    /// 参数元素总数
    pub fn parameter_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.is_parameter())
            .map(|node| node.value_expected_shape().iter().product::<usize>())
            .sum()
    }

    /// 各参数正则惩罚之和
    pub fn regularization_loss(&self) -> f32 {
        self.nodes
            .values()
            .filter_map(|node| Some(node.regularizer()?.penalty(node.value()?)))
            .sum()
    }

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // id 从 1 起
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(
        &self,
        name: &str,
    ) -> Result<(), GraphError> {
        match self.nodes.values().find(|node| node.name() == name) {
            Some(node) => Err(GraphError::DuplicateNodeName(format!(
                "图{}中已有名为{}的节点（{}）",
                self.name,
                name,
                node.type_name()
            ))),
            None => Ok(()),
        }
    }

    /// 给了名字就校验重名；没给则按`{类型}_{序号}`取第一个未被占用的
    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_owned());
        }
        Ok((1..)
            .map(|i| format!("{node_type}_{i}"))
            .find(|name| self.check_duplicate_node_name(name).is_ok())
            .unwrap_or_default())
    }

    /// 计算`node_id`及其所有尚未在本轮算过的祖先
    pub fn forward(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.get_node(node_id)?;
        if node.is_leaf() {
            return match node.value() {
                Some(_) => Ok(()),
                None => Err(GraphError::InvalidOperation(format!(
                    "{node}是叶子节点，须先 set_value 再使用"
                ))),
            };
        }

        let pass_id = self.pass_id + 1;
        self.forward_from(node_id, pass_id)?;
        self.pass_id = pass_id;
        Ok(())
    }

    fn forward_from(&mut self, node_id: NodeId, pass_id: u64) -> Result<(), GraphError> {
        let node = self.get_node_mut(node_id)?;
        if node.last_forward_pass_id() == pass_id {
            return Ok(());
        }
        if node.is_leaf() {
            if node.value().is_none() {
                return Err(GraphError::InvalidOperation(format!(
                    "{node}没有值，不能参与前向传播"
                )));
            }
            node.set_last_forward_pass_id(pass_id);
            return Ok(());
        }

        let parent_ids = self.get_node_parents(node_id)?;
        for &parent_id in &parent_ids {
            self.forward_from(parent_id, pass_id)?;
        }

        // 先把本节点移出表，父节点才能同时被借用
        let mut node = self
            .nodes
            .remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let result = self
            .get_nodes(&parent_ids)
            .and_then(|parents| node.calc_value_by_parents(&parents));
        if result.is_ok() {
            node.set_last_forward_pass_id(pass_id);
            trace!(node = %node, "前向计算完成");
        }
        self.nodes.insert(node_id, node);
        result
    }
}
