/*
 * @Author       : 老董
 * @Description  : SqueezeNet 构图与推理测试
 */

use super::tiny_config;
use crate::assert_err;
use crate::nn::{GraphError, Init};
use crate::tensor::Tensor;
use crate::zoo::{Composable, FireSpec, ModelError, SqueezeNet, SqueezeNetConfig};
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn images(batch: usize, config: &SqueezeNetConfig, seed: u64) -> Tensor {
    let [c, h, w] = config.input_shape;
    let mut rng = StdRng::seed_from_u64(seed);
    Tensor::uniform_with_rng(0.0, 1.0, &[batch, c, h, w], &mut rng)
}

#[test]
fn test_default_squeezenet_topology() -> Result<(), ModelError> {
    let model = SqueezeNet::new(SqueezeNetConfig::default())?;

    assert_eq!(model.input().value_expected_shape()?, vec![1, 3, 224, 224]);
    // 224 -> 112 -> 55 -> 27 -> 13，最后一个 fire 模块输出 8*64 通道
    assert_eq!(model.encoding().value_expected_shape()?, vec![1, 512, 13, 13]);
    assert_eq!(model.probabilities().value_expected_shape()?, vec![1, 1000]);
    assert_eq!(model.output().value_expected_shape()?, vec![1, 1000]);
    // 论文中 SqueezeNet v1.0 的参数量
    assert_eq!(model.parameter_count(), 1_248_424);
    assert!(model.regularization_loss() > 0.0);
    Ok(())
}

#[test]
fn test_stem_and_fire_block_shapes() -> Result<(), GraphError> {
    let graph = crate::nn::Graph::new_with_seed(0);
    let base = Composable::default();
    let x = graph.input_shape(&[2, 3, 224, 224], Some("x"))?;

    let stem = SqueezeNet::stem(&base, &x)?;
    assert_eq!(stem.value_expected_shape()?, vec![2, 96, 55, 55]);

    let fire = SqueezeNet::fire_block(&base, &stem, 16, "fire")?;
    assert_eq!(fire.value_expected_shape()?, vec![2, 128, 55, 55]);
    assert!(fire.name()?.starts_with("concat"));

    let group = SqueezeNet::group(&base, &fire, &[FireSpec::new(16), FireSpec::new(32)], 1)?;
    assert_eq!(group.value_expected_shape()?, vec![2, 256, 27, 27]);
    assert_eq!(group.name()?, "group1_pool");
    Ok(())
}

#[test]
fn test_learner_uses_only_first_block_of_last_group() -> Result<(), ModelError> {
    let base = tiny_config();
    let extra = SqueezeNetConfig {
        groups: vec![
            vec![FireSpec::new(4), FireSpec::new(4)],
            vec![FireSpec::new(8), FireSpec::new(16)],
        ],
        ..tiny_config()
    };
    let a = SqueezeNet::new(base)?;
    let b = SqueezeNet::new(extra)?;
    assert_eq!(a.parameter_count(), b.parameter_count());
    assert_eq!(b.encoding().value_expected_shape()?, vec![1, 64, 3, 3]);
    Ok(())
}

#[test]
fn test_tiny_squeezenet_parameter_count_and_summary() -> Result<(), ModelError> {
    let model = SqueezeNet::new(tiny_config())?;
    // stem 14208 + fire1_1 1060 + fire1_2 804 + fire2_1 2888 + classifier 325
    assert_eq!(model.parameter_count(), 19_285);

    let summary = model.summary();
    assert!(summary.contains("模型摘要: squeezenet"));
    assert!(summary.contains("fire1_2_expand3x3_K"));
    assert!(summary.contains("fire2_1_squeeze_out"));
    assert!(summary.contains("总参数量: 19,285"));
    Ok(())
}

#[test]
fn test_predict_outputs_probabilities() -> Result<(), ModelError> {
    let config = tiny_config();
    let model = SqueezeNet::new(config.clone())?;

    let probs = model.predict(&images(3, &config, 1))?;
    assert_eq!(probs.shape(), &[3, 5]);
    for row in 0..3 {
        let sum: f32 = (0..5).map(|col| probs[[row, col]]).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        assert!((0..5).all(|col| (0.0..=1.0).contains(&probs[[row, col]])));
    }
    // 推理结束后恢复训练模式
    assert!(model.graph().is_train_mode());

    // batch 维可变
    let single = model.predict(&images(1, &config, 2))?;
    assert_eq!(single.shape(), &[1, 5]);
    Ok(())
}

#[test]
fn test_predict_is_deterministic() -> Result<(), ModelError> {
    let config = tiny_config();
    let a = SqueezeNet::new(config.clone())?;
    let b = SqueezeNet::new(config.clone())?;
    let x = images(2, &config, 3);

    // 同一种子的两个模型参数相同；eval 模式下 dropout 不生效
    let first = a.predict(&x)?;
    assert_eq!(first, b.predict(&x)?);
    assert_eq!(first, a.predict(&x)?);
    Ok(())
}

#[test]
fn test_predict_rejects_wrong_image_shape() -> Result<(), ModelError> {
    let model = SqueezeNet::new(tiny_config())?;
    assert_err!(
        model.predict(&Tensor::zeros(&[1, 1, 32, 32])),
        ModelError::Graph(GraphError::ShapeMismatch { .. })
    );
    assert_err!(
        model.predict(&Tensor::zeros(&[3, 32, 32])),
        ModelError::Graph(GraphError::ShapeMismatch { .. })
    );
    Ok(())
}

#[test]
fn test_invalid_config_and_too_small_input() {
    assert_err!(
        SqueezeNet::new(SqueezeNetConfig {
            dropout: -0.5,
            ..tiny_config()
        }),
        ModelError::InvalidConfig(_)
    );
    // 8 -> 4 -> 1，第 1 组之后的 3x3 池化无法进行
    assert_err!(
        SqueezeNet::new(SqueezeNetConfig {
            input_shape: [3, 8, 8],
            ..tiny_config()
        }),
        ModelError::Graph(GraphError::InvalidOperation(_))
    );
}

#[test]
fn test_loss_backward_reaches_stem() -> Result<(), ModelError> {
    let config = SqueezeNetConfig {
        dropout: 0.0,
        ..tiny_config()
    };
    let model = SqueezeNet::new(config.clone())?;
    let labels = model.graph().input_shape(&[1, 5], Some("labels"))?;
    let loss = model.loss(&labels)?;

    model.input().set_value(&images(2, &config, 4))?;
    labels.set_value(&Tensor::one_hot(&[0, 2], 5))?;
    let total = loss.backward()?;
    let ce = loss.item()?;

    assert!(total.is_finite());
    assert_abs_diff_eq!(total, ce + model.regularization_loss(), epsilon = 1e-4);

    let params = model.graph().parameters();
    assert_eq!(params.len(), 2 + 3 * 6 + 2);
    for param in &params {
        assert!(param.grad()?.is_some(), "{} 没有梯度", param.name()?);
    }
    Ok(())
}

#[test]
fn test_clamped_relu_and_custom_init() -> Result<(), ModelError> {
    let config = SqueezeNetConfig {
        relu: Some(6.0),
        init_weights: Init::HeUniform,
        reg: None,
        ..tiny_config()
    };
    let model = SqueezeNet::new(config.clone())?;
    assert_eq!(model.composable().relu, Some(6.0));
    assert_eq!(model.config(), &config);
    assert_abs_diff_eq!(model.regularization_loss(), 0.0);

    let probs = model.predict(&images(1, &config, 5))?;
    assert_abs_diff_eq!(probs.sum(), 1.0, epsilon = 1e-5);
    Ok(())
}
