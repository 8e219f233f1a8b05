use crate::nn::{GraphError, Var};

/// Dropout 层（inverted dropout）
///
/// 只在训练模式下生效，`graph.eval()` 后为恒等映射。
pub struct Dropout {
    rate: f32,
    name: String,
}

impl Dropout {
    pub fn new(rate: f32, name: &str) -> Result<Self, GraphError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout 的丢弃率须在 [0, 1) 内，得到 {rate}"
            )));
        }
        Ok(Self {
            rate,
            name: name.to_string(),
        })
    }

    pub const fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let graph = x.get_graph();
        let id = graph
            .inner_mut()
            .new_dropout_node(x.node_id(), self.rate, Some(&self.name))?;
        Ok(graph.wrap_node_id(id))
    }
}
