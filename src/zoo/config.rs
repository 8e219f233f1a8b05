/*
 * @Author       : 老董
 * @Description  : SqueezeNet 的构建配置（可从 JSON 加载）
 *
 * JSON 中缺省的字段取 `Default`，即论文中的 SqueezeNet v1.0：
 * ```json
 * {
 *   "groups": [[{"n_filters": 16}, {"n_filters": 16}, {"n_filters": 32}],
 *              [{"n_filters": 32}, {"n_filters": 48}, {"n_filters": 48}, {"n_filters": 64}],
 *              [{"n_filters": 64}]],
 *   "dropout": 0.5,
 *   "input_shape": [3, 224, 224],
 *   "n_classes": 1000,
 *   "init_weights": "glorot_uniform",
 *   "reg": {"l2": 0.001},
 *   "relu": null
 * }
 * ```
 */

use super::{Composable, ModelError};
use crate::nn::{Init, Regularizer};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 单个 fire 模块的配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireSpec {
    /// squeeze 层的卷积核个数；两个 expand 分支各为其 4 倍
    pub n_filters: usize,
}

impl FireSpec {
    pub const fn new(n_filters: usize) -> Self {
        Self { n_filters }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqueezeNetConfig {
    /// 各组 fire 模块；最后一组只取第一个模块，且其后不再下采样
    pub groups: Vec<Vec<FireSpec>>,
    /// learner 末尾的 dropout 丢弃率
    pub dropout: f32,
    /// 单个样本的形状 [C, H, W]
    pub input_shape: [usize; 3],
    pub n_classes: usize,
    pub init_weights: Init,
    pub reg: Option<Regularizer>,
    /// ReLU 截断上限
    pub relu: Option<f32>,
    /// 图的随机种子（参数初始化与 dropout 掩码可复现）
    pub seed: Option<u64>,
}

impl Default for SqueezeNetConfig {
    fn default() -> Self {
        let fire = |filters: &[usize]| -> Vec<FireSpec> {
            filters.iter().copied().map(FireSpec::new).collect()
        };
        Self {
            groups: vec![fire(&[16, 16, 32]), fire(&[32, 48, 48, 64]), fire(&[64])],
            dropout: 0.5,
            input_shape: [3, 224, 224],
            n_classes: 1000,
            init_weights: Init::GlorotUniform,
            reg: Some(Regularizer::L2(0.001)),
            relu: None,
            seed: None,
        }
    }
}

impl SqueezeNetConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件解析并校验
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 校验超参数
    ///
    /// 特征图尺寸是否足够经过全部下采样，由构图时的形状检查负责。
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));

        match self.groups.last() {
            None => return invalid("groups 不能为空".to_string()),
            Some(last) if last.is_empty() => {
                return invalid("最后一组至少需要 1 个 fire 模块".to_string());
            }
            _ => {}
        }
        if let Some((g, b)) = self.groups.iter().enumerate().find_map(|(g, group)| {
            group
                .iter()
                .position(|block| block.n_filters == 0)
                .map(|b| (g, b))
        }) {
            return invalid(format!("第{}组第{}个 fire 模块的 n_filters 须为正", g + 1, b + 1));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout 须在 [0, 1) 内，得到 {}", self.dropout));
        }
        if self.input_shape.contains(&0) {
            return invalid(format!("input_shape 各维须为正，得到 {:?}", self.input_shape));
        }
        if self.n_classes == 0 {
            return invalid("n_classes 须为正".to_string());
        }
        if let Some(max) = self.relu.filter(|max| max.is_nan() || *max <= 0.0) {
            return invalid(format!("relu 截断上限须为正数，得到 {max}"));
        }
        Ok(())
    }

    /// 由本配置得到的共用超参数
    pub const fn composable(&self) -> Composable {
        Composable::new(self.init_weights, self.reg, self.relu)
    }
}
