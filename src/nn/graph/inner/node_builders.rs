/*
 * @Author       : 老董
 * @Description  : GraphInner 节点构建方法（new_*_node）
 *
 * 所有节点在构建时即完成形状推断，形状不兼容时直接返回错误
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::nodes::{
    ChannelBiasAdd, Concat, Conv2d, Dropout, GlobalAvgPool2d, Input, MaxPool2d, NodeHandle,
    NodeType, Pad2d, Parameter, ReLU, Softmax, SoftmaxCrossEntropy,
};
use crate::nn::{NodeId, Regularizer};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

impl GraphInner {
    /// 添加节点到列表
    pub(in crate::nn::graph) fn add_node_to_list<T: Into<NodeType>>(
        &mut self,
        raw_node: T,
        name: Option<&str>,
        node_type: &str,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), node_type)?;
        let node_id = self.generate_valid_node_id();

        self.parents.insert(node_id, parents.to_vec());

        let node_handle = NodeHandle::new(node_id, &node_name, raw_node);
        debug!(
            node = %node_handle,
            shape = ?node_handle.value_expected_shape(),
            "新增节点"
        );
        self.nodes.insert(node_id, node_handle);
        Ok(node_id)
    }

    /// 创建输入节点（第一维为 batch，喂值时可变）
    pub fn new_input_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Input::new(shape)?;
        self.add_node_to_list(node, name, "input", &[])
    }

    /// 以给定初值创建参数节点
    pub fn new_parameter_node(
        &mut self,
        init_value: &Tensor,
        regularizer: Option<Regularizer>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Parameter::new(init_value, regularizer)?;
        self.add_node_to_list(node, name, "parameter", &[])
    }

    /// 创建 2D 卷积节点
    ///
    /// `padding` 为上、下、左、右四边的零填充
    pub fn new_conv2d_node(
        &mut self,
        input_id: NodeId,
        kernel_id: NodeId,
        stride: (usize, usize),
        padding: (usize, usize, usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let (top, bottom, left, right) = padding;
        let pad = Pad2d {
            top,
            bottom,
            left,
            right,
        };
        let parent_ids = [input_id, kernel_id];
        let node = Conv2d::new(&self.get_nodes(&parent_ids)?, stride, pad)?;
        self.add_node_to_list(node, name, "conv2d", &parent_ids)
    }

    /// 创建通道偏置节点
    pub fn new_channel_bias_add_node(
        &mut self,
        input_id: NodeId,
        bias_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parent_ids = [input_id, bias_id];
        let node = ChannelBiasAdd::new(&self.get_nodes(&parent_ids)?)?;
        self.add_node_to_list(node, name, "channel_bias_add", &parent_ids)
    }

    /// 创建最大池化节点
    pub fn new_max_pool2d_node(
        &mut self,
        input_id: NodeId,
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = MaxPool2d::new(&self.get_nodes(&[input_id])?, kernel_size, stride)?;
        self.add_node_to_list(node, name, "max_pool2d", &[input_id])
    }

    /// 创建全局平均池化节点
    pub fn new_global_avg_pool2d_node(
        &mut self,
        input_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = GlobalAvgPool2d::new(&self.get_nodes(&[input_id])?)?;
        self.add_node_to_list(node, name, "global_avg_pool2d", &[input_id])
    }

    /// 创建通道拼接节点
    pub fn new_concat_node(
        &mut self,
        parent_ids: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Concat::new(&self.get_nodes(parent_ids)?)?;
        self.add_node_to_list(node, name, "concat", parent_ids)
    }

    /// 创建 Dropout 节点
    ///
    /// 图带种子时，掩码的随机源由图的随机数生成器派生，保证可复现
    pub fn new_dropout_node(
        &mut self,
        input_id: NodeId,
        rate: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let rng = match self.rng.as_mut() {
            Some(graph_rng) => StdRng::seed_from_u64(graph_rng.r#gen()),
            None => StdRng::from_entropy(),
        };
        let is_train = self.is_train_mode();
        let node = Dropout::new(&self.get_nodes(&[input_id])?, rate, is_train, rng)?;
        self.add_node_to_list(node, name, "dropout", &[input_id])
    }

    /// 创建 ReLU 节点，`max_value` 为可选的截断上限
    pub fn new_relu_node(
        &mut self,
        input_id: NodeId,
        max_value: Option<f32>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = ReLU::new(&self.get_nodes(&[input_id])?, max_value)?;
        self.add_node_to_list(node, name, "relu", &[input_id])
    }

    /// 创建 Softmax 节点
    pub fn new_softmax_node(
        &mut self,
        input_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Softmax::new(&self.get_nodes(&[input_id])?)?;
        self.add_node_to_list(node, name, "softmax", &[input_id])
    }

    /// 创建 Softmax 交叉熵损失节点
    pub fn new_softmax_cross_entropy_node(
        &mut self,
        logits_id: NodeId,
        labels_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parent_ids = [logits_id, labels_id];
        let node = SoftmaxCrossEntropy::new(&self.get_nodes(&parent_ids)?)?;
        self.add_node_to_list(node, name, "softmax_cross_entropy", &parent_ids)
    }
}
