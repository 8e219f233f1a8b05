/*
 * @Author       : 老董
 * @Description  : Smart Var - 智能变量句柄，以及参数初始化策略 Init
 */

use super::graph::{Graph, GraphInner};
use super::{GraphError, NodeId};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

// ==================== Init 枚举 ====================

/// 参数初始化策略
///
/// 无参数的变体可以用 Keras 的名字表示（如 `"glorot_uniform"`、`"he_normal"`），
/// 既可通过 `FromStr` 解析，也可从 JSON 配置中直接反序列化。
///
/// 卷积核 `[C_out, C_in, kH, kW]` 的扇入/扇出：
/// `fan_in = C_in·kH·kW`，`fan_out = C_out·kH·kW`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Init {
    /// 常数初始化
    Constant(f32),
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// 正态分布
    Normal { mean: f32, std: f32 },
    /// [min, max] 上的均匀分布
    Uniform { min: f32, max: f32 },
    /// U(-limit, limit)，limit = √(6 / (fan_in + fan_out))
    #[default]
    GlorotUniform,
    /// N(0, √(2 / (fan_in + fan_out)))
    GlorotNormal,
    /// N(0, √(2 / fan_in))，适用于 ReLU
    HeNormal,
    /// U(-limit, limit)，limit = √(6 / fan_in)
    HeUniform,
    /// N(0, √(1 / fan_in))
    LecunNormal,
}

impl FromStr for Init {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zeros" => Ok(Self::Zeros),
            "ones" => Ok(Self::Ones),
            "glorot_uniform" => Ok(Self::GlorotUniform),
            "glorot_normal" => Ok(Self::GlorotNormal),
            "he_normal" => Ok(Self::HeNormal),
            "he_uniform" => Ok(Self::HeUniform),
            "lecun_normal" => Ok(Self::LecunNormal),
            _ => Err(GraphError::InvalidOperation(format!(
                "未知的初始化方式：{s}"
            ))),
        }
    }
}

// 初始化最终归结为的采样方式
enum Sampling {
    Constant(f32),
    Uniform(f32, f32),
    Normal(f32, f32),
}

impl Init {
    /// 生成初始化后的 Tensor（使用线程级 RNG）
    pub fn generate(&self, shape: &[usize]) -> Tensor {
        match self.sampling(shape) {
            Sampling::Constant(v) => &Tensor::ones(shape) * v,
            Sampling::Uniform(min, max) => Tensor::new_random(min, max, shape),
            Sampling::Normal(mean, std) => Tensor::normal(mean, std, shape),
        }
    }

    /// 生成初始化后的 Tensor（使用指定的 RNG，确保可重复性）
    pub fn generate_with_rng(&self, shape: &[usize], rng: &mut StdRng) -> Tensor {
        match self.sampling(shape) {
            Sampling::Constant(v) => &Tensor::ones(shape) * v,
            Sampling::Uniform(min, max) => Tensor::uniform_with_rng(min, max, shape, rng),
            Sampling::Normal(mean, std) => Tensor::normal_with_rng(mean, std, shape, rng),
        }
    }

    fn sampling(&self, shape: &[usize]) -> Sampling {
        let (fan_in, fan_out) = compute_fans(shape);
        match *self {
            Self::Constant(v) => Sampling::Constant(v),
            Self::Zeros => Sampling::Constant(0.0),
            Self::Ones => Sampling::Constant(1.0),
            Self::Normal { mean, std } => Sampling::Normal(mean, std),
            Self::Uniform { min, max } => Sampling::Uniform(min, max),
            Self::GlorotUniform => {
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                Sampling::Uniform(-limit, limit)
            }
            Self::GlorotNormal => Sampling::Normal(0.0, (2.0 / (fan_in + fan_out)).sqrt()),
            Self::HeNormal => Sampling::Normal(0.0, (2.0 / fan_in).sqrt()),
            Self::HeUniform => {
                let limit = (6.0 / fan_in).sqrt();
                Sampling::Uniform(-limit, limit)
            }
            Self::LecunNormal => Sampling::Normal(0.0, (1.0 / fan_in).sqrt()),
        }
    }
}

/// 计算扇入/扇出
///
/// - 4D 卷积核 `[C_out, C_in, kH, kW]`：感受野 kH·kW 分别乘以输入、输出通道
/// - 2D `[in, out]`：即行、列
/// - 其余形状退化为元素数的平方根
fn compute_fans(shape: &[usize]) -> (f32, f32) {
    let (fan_in, fan_out) = match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [fan_in, fan_out] => (*fan_in, *fan_out),
        [out_c, in_c, kh, kw] => (in_c * kh * kw, out_c * kh * kw),
        _ => {
            let size = (shape.iter().product::<usize>() as f32).sqrt() as usize;
            (size, size)
        }
    };
    (fan_in.max(1) as f32, fan_out.max(1) as f32)
}

// ==================== Var 结构 ====================

/// 智能变量句柄 - 携带图引用，支持链式调用
///
/// # 设计原则
/// - 持有 `Rc<RefCell<GraphInner>>` 引用
/// - Clone 语义（非 Copy），但开销极低（Rc clone）
///
/// # 使用示例
/// ```ignore
/// let graph = Graph::new();
/// let x = graph.input(&images)?;
/// let h = x.relu()?;
/// let probs = h.softmax()?;
/// let loss = h.cross_entropy(&target)?;
/// loss.backward()?;
/// ```
#[derive(Clone)]
pub struct Var {
    id: NodeId,
    graph: Rc<RefCell<GraphInner>>,
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Var").field("id", &self.id).finish()
    }
}

impl Var {
    /// 创建新的 Var（内部使用）
    pub(crate) const fn new(id: NodeId, graph: Rc<RefCell<GraphInner>>) -> Self {
        Self { id, graph }
    }

    /// 获取节点 ID
    pub const fn node_id(&self) -> NodeId {
        self.id
    }

    /// 获取内部图引用（供 trait 和内部模块使用）
    pub(crate) const fn graph(&self) -> &Rc<RefCell<GraphInner>> {
        &self.graph
    }

    /// 检查两个 Var 是否来自同一个 Graph
    pub fn same_graph(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.graph, &other.graph)
    }

    /// 获取 Var 所属的 Graph handle
    pub fn get_graph(&self) -> Graph {
        Graph::from_rc(Rc::clone(&self.graph))
    }

    pub(crate) fn check_same_graph(&self, other: &Self) -> Result<(), GraphError> {
        if self.same_graph(other) {
            Ok(())
        } else {
            Err(GraphError::InvalidOperation(
                "不能对来自不同 Graph 的 Var 进行操作".to_string(),
            ))
        }
    }

    /// 在同一图中把节点 id 包装成 Var
    pub(crate) fn sibling(&self, id: NodeId) -> Self {
        Self::new(id, Rc::clone(&self.graph))
    }

    /// 节点的预期输出形状（构图时即已确定，第一维为声明的 batch）
    pub fn value_expected_shape(&self) -> Result<Vec<usize>, GraphError> {
        Ok(self
            .graph
            .borrow()
            .get_node_value_expected_shape(self.id)?
            .to_vec())
    }

    /// 节点名称
    pub fn name(&self) -> Result<String, GraphError> {
        Ok(self.graph.borrow().get_node_name(self.id)?.to_string())
    }

    // ==================== 执行 ====================

    /// 前向传播
    pub fn forward(&self) -> Result<(), GraphError> {
        self.graph.borrow_mut().forward(self.id)
    }

    /// 反向传播（ensure-forward 语义：先前向计算再反向传播）
    ///
    /// # 返回值
    /// loss 值与所有正则项惩罚之和
    pub fn backward(&self) -> Result<f32, GraphError> {
        let mut g = self.graph.borrow_mut();
        g.forward(self.id)?;
        g.backward(self.id)
    }

    // ==================== 值访问和设置 ====================

    /// 获取节点的值（克隆的 Tensor）
    pub fn value(&self) -> Result<Option<Tensor>, GraphError> {
        Ok(self.graph.borrow().get_node_value(self.id)?.cloned())
    }

    /// 设置节点的值（仅输入和参数节点）
    pub fn set_value(&self, value: &Tensor) -> Result<(), GraphError> {
        self.graph.borrow_mut().set_node_value(self.id, Some(value))
    }

    /// 获取标量值
    pub fn item(&self) -> Result<f32, GraphError> {
        let val = self.value()?.ok_or_else(|| {
            GraphError::ComputationError(format!("节点{}没有值，请先执行 forward", self.id))
        })?;
        val.number()
            .ok_or_else(|| GraphError::InvalidOperation("Tensor 不是标量".to_string()))
    }

    /// 获取节点的梯度
    pub fn grad(&self) -> Result<Option<Tensor>, GraphError> {
        Ok(self.graph.borrow().get_node_grad(self.id)?.cloned())
    }
}
