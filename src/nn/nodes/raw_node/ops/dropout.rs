/*
 * @Author       : 老董
 * @Description  : Dropout 节点（inverted dropout）
 *
 * - 训练模式：每个元素以概率 rate 置 0，其余放大 1/(1-rate)，保持期望不变
 * - 评估模式：恒等映射
 */

use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::nn::nodes::raw_node::{TraitNode, parent_value};
use crate::tensor::Tensor;
use rand::Rng;
use rand::rngs::StdRng;

pub(in crate::nn) struct Dropout {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    rate: f32,
    is_train: bool,
    rng: StdRng,
    // 最近一次训练模式前向传播使用的掩码（已含缩放）
    mask: Option<Tensor>,
}

impl Dropout {
    pub(in crate::nn) fn new(
        parents: &[&NodeHandle],
        rate: f32,
        is_train: bool,
        rng: StdRng,
    ) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Dropout 节点需要 1 个父节点".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&rate) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout 的丢弃率须在 [0, 1) 内，得到 {rate}"
            )));
        }
        Ok(Self {
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            rate,
            is_train,
            rng,
            mask: None,
        })
    }
}

impl TraitNode for Dropout {
    fn type_name(&self) -> &'static str {
        "Dropout"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let input = parent_value(parents, 0)?;
        if !self.is_train || self.rate == 0.0 {
            self.mask = None;
            self.value = Some(input.clone());
            return Ok(());
        }

        let keep_prob = 1.0 - self.rate;
        let scale = 1.0 / keep_prob;
        let mask_data = (0..input.size())
            .map(|_| {
                if self.rng.r#gen::<f32>() < keep_prob {
                    scale
                } else {
                    0.0
                }
            })
            .collect();
        let mask = Tensor::from_vec(mask_data, input.shape());
        self.value = Some(input * &mask);
        self.mask = Some(mask);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        _parents: &[&NodeHandle],
        upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        Ok(match &self.mask {
            Some(mask) => upstream_grad * mask,
            None => upstream_grad.clone(),
        })
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }

    fn set_train_mode(&mut self, is_train: bool) {
        self.is_train = is_train;
    }
}
