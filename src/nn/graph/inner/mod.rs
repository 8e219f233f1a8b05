/*
 * @Author       : 老董
 * @Description  : GraphInner：计算图本体。各 impl 块按职责拆到子模块：
 *                 core（节点表/前向）、backward（VJP）、mode（train/eval）、
 *                 node_builders（new_*_node）、describe（摘要）
 */

mod backward;
mod core;
mod describe;
mod mode;
mod node_builders;

use crate::nn::NodeId;
use crate::nn::nodes::NodeHandle;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// 计算图本体
///
/// 一般经由`Graph`句柄共享使用；需要直接按`NodeId`操作节点时可通过`graph.inner_mut()`拿到它。
pub struct GraphInner {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle>,
    /// 节点 -> 父节点（顺序即运算的参数顺序）
    pub(in crate::nn::graph) parents: HashMap<NodeId, Vec<NodeId>>,
    /// 前向传播的轮次，同一轮内已算过的节点不再重算
    pub(in crate::nn::graph) pass_id: u64,
    pub(in crate::nn::graph) next_id: u64,
    pub(in crate::nn::graph) training: bool,
    /// 参数初始化与 Dropout 掩码共用的随机源；None 时退回线程级随机数
    pub(in crate::nn::graph) rng: Option<StdRng>,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
