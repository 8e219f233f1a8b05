mod composable;
mod squeezenet;

use crate::zoo::{FireSpec, SqueezeNetConfig};

/// 小尺寸配置：[3, 32, 32] -> stem 后 7x7 -> 第 1 组后 3x3，5 个类别
fn tiny_config() -> SqueezeNetConfig {
    SqueezeNetConfig {
        groups: vec![vec![FireSpec::new(4), FireSpec::new(4)], vec![FireSpec::new(8)]],
        input_shape: [3, 32, 32],
        n_classes: 5,
        seed: Some(42),
        ..Default::default()
    }
}
