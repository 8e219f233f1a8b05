/*
 * @Author       : 老董
 * @Description  : `Var`上的算子方法，按用途拆成三个扩展 trait（需先 import 才能调用）：
 *                 激活（relu/softmax）、损失（cross_entropy）、通道拼接与 dropout
 */

mod activation;
mod loss;
mod shape;

pub use activation::VarActivationOps;
pub use loss::VarLossOps;
pub use shape::VarShapeOps;
