/*
 * @Author       : 老董
 * @Description  : Graph 句柄：对`GraphInner`的共享引用，负责创建变量、驱动前向/反向与模式切换
 */

use super::error::GraphError;
use super::inner::GraphInner;
use crate::nn::var::{Init, Var};
use crate::nn::{NodeId, Regularizer};
use crate::tensor::Tensor;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// 计算图句柄
///
/// 克隆得到的句柄指向同一张图；由它创建的每个`Var`也各持一份引用，
/// 所以`layer.forward(&x)`这类调用无需再传图。
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::wrap(GraphInner::new())
    }

    /// 参数初始化、Dropout 掩码均可复现的图
    pub fn new_with_seed(seed: u64) -> Self {
        Self::wrap(GraphInner::new_with_seed(seed))
    }

    pub fn with_name(name: &str, seed: Option<u64>) -> Self {
        let mut inner = GraphInner::with_name(name);
        if let Some(seed) = seed {
            inner.set_seed(seed);
        }
        Self::wrap(inner)
    }

    fn wrap(inner: GraphInner) -> Self {
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub(crate) const fn from_rc(inner: Rc<RefCell<GraphInner>>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> Ref<'_, GraphInner> {
        self.inner.borrow()
    }

    pub fn inner_mut(&self) -> RefMut<'_, GraphInner> {
        self.inner.borrow_mut()
    }

    /// 把底层`NodeId`包成本图的`Var`
    pub fn wrap_node_id(&self, node_id: NodeId) -> Var {
        Var::new(node_id, Rc::clone(&self.inner))
    }

    pub fn owns(&self, var: &Var) -> bool {
        Rc::ptr_eq(&self.inner, var.graph())
    }

    /// 新建输入节点并立即喂入`data`，节点形状取自`data`
    pub fn input(&self, data: &Tensor) -> Result<Var, GraphError> {
        let node_id = {
            let mut g = self.inner.borrow_mut();
            let id = g.new_input_node(data.shape(), None)?;
            g.set_node_value(id, Some(data))?;
            id
        };
        Ok(self.wrap_node_id(node_id))
    }

    /// 只声明形状的输入节点（首维为 batch，可在喂值时改变）
    pub fn input_shape(&self, shape: &[usize], name: Option<&str>) -> Result<Var, GraphError> {
        let node_id = self.inner.borrow_mut().new_input_node(shape, name)?;
        Ok(self.wrap_node_id(node_id))
    }

    pub fn parameter(&self, shape: &[usize], init: Init, name: &str) -> Result<Var, GraphError> {
        self.parameter_with_regularizer(shape, init, None, name)
    }

    /// 按`init`生成初值的参数节点；图有种子时用图的随机源
    pub fn parameter_with_regularizer(
        &self,
        shape: &[usize],
        init: Init,
        regularizer: Option<Regularizer>,
        name: &str,
    ) -> Result<Var, GraphError> {
        let node_id = {
            let mut g = self.inner.borrow_mut();
            let value = match g.rng.as_mut() {
                Some(rng) => init.generate_with_rng(shape, rng),
                None => init.generate(shape),
            };
            g.new_parameter_node(&value, regularizer, Some(name))?
        };
        Ok(self.wrap_node_id(node_id))
    }

    pub fn forward(&self, output: &Var) -> Result<(), GraphError> {
        self.inner.borrow_mut().forward(output.node_id())
    }

    /// 等同`loss.backward()`，返回含正则项的总损失
    pub fn backward(&self, loss: &Var) -> Result<f32, GraphError> {
        loss.backward()
    }

    pub fn zero_grad(&self) {
        self.inner.borrow_mut().clear_grad();
    }

    pub fn train(&self) {
        self.inner.borrow_mut().set_train_mode();
    }

    pub fn eval(&self) {
        self.inner.borrow_mut().set_eval_mode();
    }

    pub fn is_train_mode(&self) -> bool {
        self.inner.borrow().is_train_mode()
    }

    /// 全部参数，按创建先后排列
    pub fn parameters(&self) -> Vec<Var> {
        let ids = self.inner.borrow().get_trainable_nodes();
        ids.into_iter().map(|id| self.wrap_node_id(id)).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.inner.borrow().parameter_count()
    }

    pub fn regularization_loss(&self) -> f32 {
        self.inner.borrow().regularization_loss()
    }

    pub fn nodes_count(&self) -> usize {
        self.inner.borrow().nodes_count()
    }

    /// 逐节点的形状/参数量表格，末尾附总参数量
    pub fn summary_string(&self) -> String {
        self.inner.borrow().summary_string()
    }
}
