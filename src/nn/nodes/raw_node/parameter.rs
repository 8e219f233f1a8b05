use super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::{GraphError, Regularizer};
use crate::tensor::Tensor;

pub(in crate::nn) struct Parameter {
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    regularizer: Option<Regularizer>,
}

impl Parameter {
    pub(in crate::nn) fn new(
        init_value: &Tensor,
        regularizer: Option<Regularizer>,
    ) -> Result<Self, GraphError> {
        if init_value.size() == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "参数节点的形状不能含0维，得到 {:?}",
                init_value.shape()
            )));
        }
        Ok(Self {
            value: Some(init_value.clone()),
            grad: None,
            shape: init_value.shape().to_vec(),
            regularizer,
        })
    }

    pub(in crate::nn) const fn regularizer(&self) -> Option<Regularizer> {
        self.regularizer
    }
}

impl TraitNode for Parameter {
    fn type_name(&self) -> &'static str {
        "Parameter"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[&NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "参数节点没有父节点，其值应通过 set_value 设置".to_string(),
        ))
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(v) = value
            && v.shape() != self.shape.as_slice()
        {
            return Err(GraphError::ShapeMismatch {
                expected: self.shape.clone(),
                got: v.shape().to_vec(),
                message: "参数的新值形状须与原形状一致".to_string(),
            });
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
            "参数节点没有父节点".to_string(),
        ))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(g) = grad
            && g.shape() != self.shape.as_slice()
        {
            return Err(GraphError::ShapeMismatch {
                expected: self.shape.clone(),
                got: g.shape().to_vec(),
                message: "参数梯度形状须与参数一致".to_string(),
            });
        }
        self.grad = grad.cloned();
        Ok(())
    }
}
