/*
 * @Author       : 老董
 * @Description  : 计算图节点：NodeId、NodeHandle 以及各具体节点（raw_node）
 */

mod node_handle;
mod raw_node;

pub(in crate::nn) use node_handle::NodeHandle;
pub(in crate::nn) use raw_node::NodeType;
pub(in crate::nn) use raw_node::{
    ChannelBiasAdd, Concat, Conv2d, Dropout, GlobalAvgPool2d, Input, MaxPool2d, Pad2d, Parameter,
    ReLU, Softmax, SoftmaxCrossEntropy,
};

use std::fmt;

/// 节点在图内的唯一标识（按创建顺序递增，从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
