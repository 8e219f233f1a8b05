/*
 * @Author       : 老董
 * @Description  : Layer 模块 - 组合 Node 构建常见网络结构
 *
 * Layer 不是新的抽象层，只是语法糖！
 */

mod conv2d;
mod dropout;
mod global_avg_pool2d;
mod max_pool2d;

pub use conv2d::{Conv2d, Conv2dOptions, Padding};
pub use dropout::Dropout;
pub use global_avg_pool2d::GlobalAvgPool2d;
pub use max_pool2d::MaxPool2d;
