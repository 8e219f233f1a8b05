use super::TraitNode;
use crate::nn::GraphError;
use crate::nn::nodes::NodeHandle;
use crate::tensor::Tensor;

pub(in crate::nn) struct Input {
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Input {
    pub(in crate::nn) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(GraphError::InvalidOperation(format!(
                "输入节点的形状不能为空或含0维，得到 {shape:?}"
            )));
        }
        Ok(Self {
            value: None,
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for Input {
    fn type_name(&self) -> &'static str {
        "Input"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[&NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "输入节点没有父节点，其值应通过 set_value 设置".to_string(),
        ))
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    /// 除第一维（batch）外，其余维度须与声明的形状一致
    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(v) = value {
            let got = v.shape();
            if got.len() != self.shape.len() || got[1..] != self.shape[1..] || got[0] == 0 {
                return Err(GraphError::ShapeMismatch {
                    expected: self.shape.clone(),
                    got: got.to_vec(),
                    message: "输入值除 batch 维外须与声明形状一致".to_string(),
                });
            }
        }
        self.value = value.cloned();
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _parent_index: usize,
        _parents: &[&NodeHandle],
        _upstream_grad: &Tensor,
    ) -> Result<Tensor, GraphError> {
        Err(GraphError::InvalidOperation(
            "输入节点没有父节点".to_string(),
        ))
    }

    fn grad(&self) -> Option<&Tensor> {
        None
    }

    fn set_grad(&mut self, _grad: Option<&Tensor>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "输入节点不应该有梯度".to_string(),
        ))
    }
}
