/*
 * @Author       : 老董
 * @Description  : SqueezeNet v1.0（https://arxiv.org/pdf/1602.07360.pdf）
 *
 * 结构：
 * - stem：Conv 96@7x7/2（same）-> ReLU -> MaxPool 3x3/2
 * - learner：若干组 fire 模块，每组之后 MaxPool 3x3/2（延迟下采样）；
 *   最后一组只有一个 fire 模块，之后接 Dropout
 * - classifier：Conv n_classes@1x1 -> ReLU -> 全局平均池化 -> Softmax
 *
 * fire 模块：squeeze Conv n@1x1 -> [expand Conv 4n@1x1, expand Conv 4n@3x3] -> 通道拼接（8n）
 */

use super::{Composable, FireSpec, ModelError, SqueezeNetConfig};
use crate::nn::{
    Dropout, GlobalAvgPool2d, Graph, GraphError, MaxPool2d, Padding, Var, VarActivationOps,
    VarLossOps, VarShapeOps,
};
use crate::tensor::Tensor;
use tracing::{debug, info, warn};

/// SqueezeNet 模型：构图完成后即可交给推理/训练代码使用
pub struct SqueezeNet {
    graph: Graph,
    composable: Composable,
    config: SqueezeNetConfig,
    input: Var,
    /// learner 的输出（classifier 之前的特征）
    encoding: Var,
    /// 全局平均池化的输出（softmax 之前）
    probabilities: Var,
    /// softmax 输出
    output: Var,
}

impl SqueezeNet {
    pub fn new(config: SqueezeNetConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let composable = config.composable();
        let graph = Graph::with_name("squeezenet", config.seed);

        let [channels, height, width] = config.input_shape;
        let input = graph.input_shape(&[1, channels, height, width], Some("input"))?;

        let x = Self::stem(&composable, &input)?;
        let x = Self::learner(&composable, &x, &config.groups, config.dropout)?;
        let encoding = x.clone();
        let (probabilities, output) = Self::classifier(&composable, &x, config.n_classes)?;

        info!(
            input_shape = ?config.input_shape,
            n_classes = config.n_classes,
            params = graph.parameter_count(),
            nodes = graph.nodes_count(),
            "SqueezeNet 构建完成"
        );

        Ok(Self {
            graph,
            composable,
            config,
            input,
            encoding,
            probabilities,
            output,
        })
    }

    /// stem：将输入分辨率降为 1/4 左右
    pub fn stem(composable: &Composable, inputs: &Var) -> Result<Var, GraphError> {
        let x = composable.conv2d(inputs, 96, (7, 7), (2, 2), Padding::Same, "stem")?;
        let x = composable.relu_activation(&x)?;
        MaxPool2d::new((3, 3), Some((2, 2)), "stem_pool").forward(&x)
    }

    /// learner：除最后一组外逐组构建，最后一组只取第一个 fire 模块，之后接 dropout
    pub fn learner(
        composable: &Composable,
        x: &Var,
        groups: &[Vec<FireSpec>],
        dropout: f32,
    ) -> Result<Var, GraphError> {
        let (last, rest) = groups
            .split_last()
            .ok_or_else(|| GraphError::InvalidOperation("learner 至少需要 1 组".to_string()))?;
        let last_block = last.first().ok_or_else(|| {
            GraphError::InvalidOperation("最后一组至少需要 1 个 fire 模块".to_string())
        })?;
        if last.len() > 1 {
            warn!(ignored = last.len() - 1, "最后一组只使用第一个 fire 模块");
        }

        let mut x = x.clone();
        for (index, blocks) in rest.iter().enumerate() {
            x = Self::group(composable, &x, blocks, index + 1)?;
        }

        let last_name = format!("fire{}_1", groups.len());
        x = Self::fire_block(composable, &x, last_block.n_filters, &last_name)?;

        // dropout 延迟到所有 fire 组之后
        Dropout::new(dropout, "dropout")?.forward(&x)
    }

    /// 一组 fire 模块，之后 MaxPool 3x3/2
    ///
    /// 模块依次命名为 `fire{group_index}_{1..}`
    pub fn group(
        composable: &Composable,
        x: &Var,
        blocks: &[FireSpec],
        group_index: usize,
    ) -> Result<Var, GraphError> {
        let mut x = x.clone();
        for (index, block) in blocks.iter().enumerate() {
            let name = format!("fire{group_index}_{}", index + 1);
            x = Self::fire_block(composable, &x, block.n_filters, &name)?;
        }
        MaxPool2d::new((3, 3), Some((2, 2)), &format!("group{group_index}_pool")).forward(&x)
    }

    /// fire 模块，输出 8 * `n_filters` 个通道
    pub fn fire_block(
        composable: &Composable,
        x: &Var,
        n_filters: usize,
        name: &str,
    ) -> Result<Var, GraphError> {
        // squeeze 层固定使用不截断的 ReLU
        let squeeze = composable
            .conv2d(x, n_filters, (1, 1), (1, 1), Padding::Same, &format!("{name}_squeeze"))?
            .relu()?;

        let expand1x1 = composable.conv2d(
            &squeeze,
            n_filters * 4,
            (1, 1),
            (1, 1),
            Padding::Same,
            &format!("{name}_expand1x1"),
        )?;
        let expand1x1 = composable.relu_activation(&expand1x1)?;

        let expand3x3 = composable.conv2d(
            &squeeze,
            n_filters * 4,
            (3, 3),
            (1, 1),
            Padding::Same,
            &format!("{name}_expand3x3"),
        )?;
        let expand3x3 = composable.relu_activation(&expand3x3)?;

        let out = expand1x1.concat(&[&expand3x3])?;
        debug!(block = name, n_filters, shape = ?out.value_expected_shape()?, "fire 模块");
        Ok(out)
    }

    /// classifier：返回 (softmax 之前的输出, softmax 输出)
    pub fn classifier(
        composable: &Composable,
        x: &Var,
        n_classes: usize,
    ) -> Result<(Var, Var), GraphError> {
        // 卷积核个数等于类别数
        let x = composable.conv2d(x, n_classes, (1, 1), (1, 1), Padding::Same, "classifier")?;
        let x = composable.relu_activation(&x)?;
        // 每个类别的特征图归约为一个值
        let probabilities = GlobalAvgPool2d::new("gap").forward(&x)?;
        let output = probabilities.softmax()?;
        Ok((probabilities, output))
    }

    // ==================== 访问器 ====================

    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    pub const fn input(&self) -> &Var {
        &self.input
    }

    pub const fn output(&self) -> &Var {
        &self.output
    }

    pub const fn encoding(&self) -> &Var {
        &self.encoding
    }

    pub const fn probabilities(&self) -> &Var {
        &self.probabilities
    }

    pub const fn composable(&self) -> &Composable {
        &self.composable
    }

    pub const fn config(&self) -> &SqueezeNetConfig {
        &self.config
    }

    // ==================== 推理 / 训练辅助 ====================

    /// 推理：`images` 形状为 [N, C, H, W]，返回 [N, n_classes] 的类别概率
    ///
    /// 在 eval 模式下执行（dropout 不生效），结束后恢复原模式。
    pub fn predict(&self, images: &Tensor) -> Result<Tensor, ModelError> {
        let input_id = self.input.node_id();
        let output_id = self.output.node_id();
        let probs = self.graph.inner_mut().no_grad_scope(|g| -> Result<Tensor, GraphError> {
            g.set_node_value(input_id, Some(images))?;
            g.forward(output_id)?;
            g.get_node_value(output_id)?
                .cloned()
                .ok_or_else(|| GraphError::ComputationError("输出节点没有值".to_string()))
        })?;
        Ok(probs)
    }

    /// 以 softmax 之前的输出与 one-hot 标签构建交叉熵损失节点
    ///
    /// ```ignore
    /// let labels = model.graph().input_shape(&[1, 10], Some("labels"))?;
    /// let loss = model.loss(&labels)?;
    /// model.input().set_value(&images)?;
    /// labels.set_value(&one_hot)?;
    /// let total = loss.backward()?;
    /// ```
    pub fn loss(&self, target: &Var) -> Result<Var, ModelError> {
        Ok(self.probabilities.cross_entropy(target)?)
    }

    /// 参数元素总数
    pub fn parameter_count(&self) -> usize {
        self.graph.parameter_count()
    }

    /// 所有卷积核正则项惩罚之和
    pub fn regularization_loss(&self) -> f32 {
        self.graph.regularization_loss()
    }

    pub fn summary(&self) -> String {
        self.graph.summary_string()
    }
}
