/*
 * @Author       : 老董
 * @Description  : 负责神经网络（neural network）的构建：计算图、节点、智能变量句柄与常用层
 */

mod graph;
pub mod layer;
mod module;
mod nodes;
mod regularizer;
mod var;
mod var_ops;

pub use graph::{Graph, GraphError, GraphInner};
pub use layer::{Conv2d, Conv2dOptions, Dropout, GlobalAvgPool2d, MaxPool2d, Padding};
pub use module::Module;
pub use nodes::NodeId;
pub use regularizer::Regularizer;
pub use var::{Init, Var};
pub use var_ops::{VarActivationOps, VarLossOps, VarShapeOps};

#[cfg(test)]
mod tests;
