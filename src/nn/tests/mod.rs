mod node_conv2d;
mod node_softmax;

use crate::nn::{GraphError, GraphInner, NodeId};
use crate::tensor::Tensor;

/// 以给定上游梯度，对`node`的第`parent_index`个父节点做一次 VJP（要求已 forward）
fn vjp(
    graph: &GraphInner,
    node: NodeId,
    parent_index: usize,
    upstream: &Tensor,
) -> Result<Tensor, GraphError> {
    let parent_ids = graph.get_node_parents(node)?;
    let parents = graph.get_nodes(&parent_ids)?;
    graph
        .get_node(node)?
        .calc_grad_to_parent(parent_index, &parents, upstream)
}

/// 中心差分近似 d(Σ upstream ⊙ node)/d(parent)，`parent`须为输入/参数节点
fn numeric_vjp(
    graph: &mut GraphInner,
    node: NodeId,
    parent: NodeId,
    upstream: &Tensor,
    eps: f32,
) -> Result<Tensor, GraphError> {
    let base = graph
        .get_node_value(parent)?
        .cloned()
        .ok_or(GraphError::NodeNotFound(parent))?;
    let shape = base.shape().to_vec();
    let base_data = base.to_vec();

    let objective = |graph: &mut GraphInner, data: &[f32]| -> Result<f32, GraphError> {
        graph.set_node_value(parent, Some(&Tensor::new(data, &shape)))?;
        graph.forward(node)?;
        let output = graph
            .get_node_value(node)?
            .ok_or(GraphError::NodeNotFound(node))?;
        Ok((output * upstream).sum())
    };

    let mut grad = vec![0.0; base_data.len()];
    for (i, g) in grad.iter_mut().enumerate() {
        let mut plus = base_data.clone();
        plus[i] += eps;
        let mut minus = base_data.clone();
        minus[i] -= eps;
        *g = (objective(graph, &plus)? - objective(graph, &minus)?) / (2.0 * eps);
    }
    // 还原
    objective(graph, &base_data)?;
    Ok(Tensor::new(&grad, &shape))
}

/// 逐元素比较两个张量
fn assert_tensor_close(actual: &Tensor, expected: &Tensor, epsilon: f32) {
    assert_eq!(actual.shape(), expected.shape());
    for (i, (a, e)) in actual.to_vec().iter().zip(expected.to_vec()).enumerate() {
        assert!(
            (a - e).abs() <= epsilon,
            "第{i}个元素不一致：实际 {a}，预期 {e}（容差 {epsilon}）"
        );
    }
}
