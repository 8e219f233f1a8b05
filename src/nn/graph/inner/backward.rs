/*
 * @Author       : 老董
 * @Description  : GraphInner VJP 反向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::tensor::Tensor;
use std::collections::HashSet;
use tracing::warn;

impl GraphInner {
    // ========== VJP 反向传播核心 ==========

    /// 反向传播
    ///
    /// 从标量损失节点出发，按逆拓扑序把梯度传给所有（直接或间接）依赖参数节点的父节点；
    /// 参数梯度会累加（需手动 `clear_grad`），之后再叠加各参数正则项的梯度。
    ///
    /// # 返回值
    /// 总损失：损失节点的值 + 所有正则项惩罚
    pub fn backward(&mut self, loss_id: NodeId) -> Result<f32, GraphError> {
        let loss_node = self.get_node(loss_id)?;
        let loss_value = loss_node.value().ok_or_else(|| {
            GraphError::ComputationError(format!("损失{loss_node}没有值，请先执行 forward"))
        })?;
        let loss_scalar = loss_value.number().ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "反向传播要求损失为标量，但得到形状 {:?}",
                loss_value.shape()
            ))
        })?;
        let loss_shape = loss_value.shape().to_vec();

        if !self.is_train_mode() {
            warn!("在 eval 模式下调用 backward，这通常是误用");
        }

        self.reset_intermediate_grad();

        let topo_order = self.topological_order(loss_id)?;
        let requires_grad = self.collect_requires_grad(&topo_order)?;

        self.get_node_mut(loss_id)?
            .set_grad(Some(&Tensor::ones(&loss_shape)))?;

        // 逆拓扑序：保证一个节点的所有子节点都已把梯度传给它之后，它才向上传播
        for node_id in topo_order.iter().rev() {
            self.propagate_grad_to_parents(*node_id, &requires_grad)?;
        }

        self.apply_regularization_grads()?;

        Ok(loss_scalar + self.regularization_loss())
    }

    /// 将梯度从当前节点传播到其父节点
    fn propagate_grad_to_parents(
        &mut self,
        node_id: NodeId,
        requires_grad: &HashSet<NodeId>,
    ) -> Result<(), GraphError> {
        let parent_ids = self.get_node_parents(node_id)?;
        if parent_ids.is_empty() {
            return Ok(());
        }

        let parent_grads: Vec<(NodeId, Tensor)> = {
            let node = self.get_node(node_id)?;
            let upstream_grad = match node.grad() {
                Some(g) => g,
                None => return Ok(()),
            };
            let parents = self.get_nodes(&parent_ids)?;

            let mut grads = Vec::with_capacity(parent_ids.len());
            for (index, parent_id) in parent_ids.iter().enumerate() {
                if !requires_grad.contains(parent_id) {
                    continue;
                }
                let parent_grad = node.calc_grad_to_parent(index, &parents, upstream_grad)?;
                grads.push((*parent_id, parent_grad));
            }
            grads
        };

        for (parent_id, parent_grad) in parent_grads {
            self.accumulate_grad(parent_id, &parent_grad)?;
        }

        Ok(())
    }

    fn accumulate_grad(&mut self, node_id: NodeId, grad: &Tensor) -> Result<(), GraphError> {
        let node = self.get_node_mut(node_id)?;
        let new_grad = match node.grad() {
            Some(existing_grad) => existing_grad + grad,
            None => grad.clone(),
        };
        node.set_grad(Some(&new_grad))
    }

    /// 把各参数正则项的梯度累加到参数梯度上
    fn apply_regularization_grads(&mut self) -> Result<(), GraphError> {
        let reg_grads: Vec<(NodeId, Tensor)> = self
            .nodes
            .iter()
            .filter_map(|(&id, node)| match (node.regularizer(), node.value()) {
                (Some(reg), Some(value)) => Some((id, reg.grad(value))),
                _ => None,
            })
            .collect();
        for (id, grad) in reg_grads {
            self.accumulate_grad(id, &grad)?;
        }
        Ok(())
    }

    /// 拓扑排序：返回以父节点在前、子节点在后的顺序排列的、`root_id` 的所有祖先（含自身）
    fn topological_order(&self, root_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        fn dfs(
            graph: &GraphInner,
            node_id: NodeId,
            visited: &mut HashSet<NodeId>,
            result: &mut Vec<NodeId>,
        ) -> Result<(), GraphError> {
            if !visited.insert(node_id) {
                return Ok(());
            }
            for parent_id in graph.get_node_parents(node_id)? {
                dfs(graph, parent_id, visited, result)?;
            }
            // 后序：所有父节点都已在结果中
            result.push(node_id);
            Ok(())
        }

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        dfs(self, root_id, &mut visited, &mut result)?;
        Ok(result)
    }

    /// 需要梯度的节点：参数节点，以及（直接或间接）依赖参数节点的节点
    fn collect_requires_grad(&self, topo_order: &[NodeId]) -> Result<HashSet<NodeId>, GraphError> {
        let mut requires_grad = HashSet::new();
        for &node_id in topo_order {
            let node = self.get_node(node_id)?;
            let needed = node.is_parameter()
                || self
                    .get_node_parents(node_id)?
                    .iter()
                    .any(|p| requires_grad.contains(p));
            if needed {
                requires_grad.insert(node_id);
            }
        }
        Ok(requires_grad)
    }

    /// 重置中间节点（非参数节点）的 grad
    pub(in crate::nn::graph) fn reset_intermediate_grad(&mut self) {
        for node in self.nodes.values_mut() {
            if !node.is_parameter() {
                node.clear_grad();
            }
        }
    }

    /// 清除所有节点的梯度
    pub fn clear_grad(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_grad();
        }
    }
}
