/*
 * @Author       : 老董
 * @Description  : 模型库：在 nn 之上组装的完整网络
 *
 * - `Composable`：模型定义共用的超参数（初始化、正则、ReLU 截断、偏置）
 * - `SqueezeNet`：SqueezeNet v1.0（stem -> learner -> classifier）
 */

mod composable;
mod config;
mod error;
mod squeezenet;

pub use composable::Composable;
pub use config::{FireSpec, SqueezeNetConfig};
pub use error::ModelError;
pub use squeezenet::SqueezeNet;

#[cfg(test)]
mod tests;
