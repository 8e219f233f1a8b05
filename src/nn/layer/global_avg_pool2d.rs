use crate::nn::{GraphError, Var};

/// 全局平均池化层：[batch, C, H, W] -> [batch, C]
pub struct GlobalAvgPool2d {
    name: String,
}

impl GlobalAvgPool2d {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let graph = x.get_graph();
        let id = graph
            .inner_mut()
            .new_global_avg_pool2d_node(x.node_id(), Some(&self.name))?;
        Ok(graph.wrap_node_id(id))
    }
}
