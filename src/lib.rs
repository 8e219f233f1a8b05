//! # Squeeze Torch
//!
//! `squeeze_torch`用纯rust实现了一个仿[pytorch](https://pytorch.org)的轻量计算图（张量、自动求导、
//! 卷积/池化等常用节点），并在其上按论文[SqueezeNet](https://arxiv.org/pdf/1602.07360.pdf)
//! 组装出 SqueezeNet v1.0 图像分类模型。
//!
//! - `tensor`：基于`ndarray`的张量
//! - `nn`：计算图、节点、`Var`、层与参数初始化
//! - `zoo`：模型库（`Composable`基础超参数与`SqueezeNet`）
//!
//! ```ignore
//! use squeeze_torch::zoo::{SqueezeNet, SqueezeNetConfig};
//!
//! let model = SqueezeNet::new(SqueezeNetConfig::default())?;
//! let probs = model.predict(&images)?; // [N, 1000]
//! ```

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
pub mod zoo;
