use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::ops::stable_softmax_rows;
use crate::nn::nodes::raw_node::{TraitNode, parent_value};
use crate::tensor::Tensor;

/// Softmax + CrossEntropy 融合损失节点
///
/// ## 输入
/// - 父节点 0: logits [batch, K]（未经 softmax 的原始分数）
/// - 父节点 1: labels [batch, K]（one-hot 或概率分布）
///
/// ## 输出
/// - [1, 1] 的 batch 平均损失 L = -(1/N) Σ_n Σ_i y_ni * log(softmax(x_n)_i)
///
/// 对 logits 的梯度为 (softmax(x) - y) / N。
pub(in crate::nn) struct SoftmaxCrossEntropy {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    softmax_cache: Option<Tensor>,
}

impl SoftmaxCrossEntropy {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "SoftmaxCrossEntropy 节点需要 2 个父节点（logits 和 labels）".to_string(),
            ));
        }
        let logits_shape = parents[0].value_expected_shape();
        let labels_shape = parents[1].value_expected_shape();
        if logits_shape.len() != 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: logits_shape.len(),
                message: "logits 须为 2D [batch, num_classes]".to_string(),
            });
        }
        // batch 维可变，只比较类别数
        if labels_shape.len() != 2 || labels_shape[1] != logits_shape[1] {
            return Err(GraphError::ShapeMismatch {
                expected: logits_shape.to_vec(),
                got: labels_shape.to_vec(),
                message: "logits 和 labels 的类别数必须相同".to_string(),
            });
        }
        Ok(Self {
            value: None,
            grad: None,
            shape: vec![1, 1],
            softmax_cache: None,
        })
    }
}

impl TraitNode for SoftmaxCrossEntropy {
    fn type_name(&self) -> &'static str {
        "SoftmaxCrossEntropy"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let logits = parent_value(parents, 0)?;
        let labels = parent_value(parents, 1)?;
        if !logits.is_same_shape(labels) {
            return Err(GraphError::ShapeMismatch {
                expected: logits.shape().to_vec(),
                got: labels.shape().to_vec(),
                message: "logits 和 labels 形状必须相同".to_string(),
            });
        }

        let softmax = stable_softmax_rows(logits);
        let batch = logits.shape()[0] as f32;
        // 下限避免 log(0)
        let total: f32 = softmax
            .to_vec()
            .iter()
            .zip(labels.to_vec())
            .map(|(&s, y)| -y * s.max(f32::MIN_POSITIVE).ln())
            .sum();
        self.value = Some(Tensor::new(&[total / batch], &[1, 1]));
        self.softmax_cache = Some(softmax);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_grad_to_parent(
        &self,
        parent_index: usize,
        parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        if parent_index != 0 {
            return Err(GraphError::InvalidOperation(
                "SoftmaxCrossEntropy 不对 labels 求梯度".to_string(),
            ));
        }
        let softmax = self
            .softmax_cache
            .as_ref()
            .ok_or_else(|| GraphError::ComputationError("缺少 softmax 缓存".to_string()))?;
        let labels = parent_value(parents, 1)?;
        let upstream = upstream_grad.number().ok_or_else(|| {
            GraphError::ComputationError("损失节点的上游梯度须为标量".to_string())
        })?;
        let batch = softmax.shape()[0] as f32;
        Ok((softmax - labels) * (upstream / batch))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
