/*
 * @Author       : 老董
 * @Description  : MaxPool2d (2D 最大池化) 层，等价于 Keras 的 `MaxPooling2D(padding="valid")`
 *
 * H' = (H - kernel_h) / stride_h + 1
 */

use crate::nn::{GraphError, Var};

pub struct MaxPool2d {
    kernel_size: (usize, usize),
    stride: Option<(usize, usize)>,
    name: String,
}

impl MaxPool2d {
    /// `stride` 为 None 时默认等于 `kernel_size`
    pub fn new(kernel_size: (usize, usize), stride: Option<(usize, usize)>, name: &str) -> Self {
        Self {
            kernel_size,
            stride,
            name: name.to_string(),
        }
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let graph = x.get_graph();
        let id = graph.inner_mut().new_max_pool2d_node(
            x.node_id(),
            self.kernel_size,
            self.stride,
            Some(&self.name),
        )?;
        Ok(graph.wrap_node_id(id))
    }
}
