/*
 * @Author       : 老董
 * @Description  : Softmax 与 SoftmaxCrossEntropy 节点单元测试
 */

use super::{assert_tensor_close, numeric_vjp, vjp};
use crate::assert_err;
use crate::nn::{GraphError, GraphInner};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ==================== Softmax ====================

#[test]
fn test_softmax_rows_sum_to_one() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_input_node(&[2, 3], Some("x"))?;
    let softmax = graph.new_softmax_node(x, Some("softmax"))?;

    graph.set_node_value(x, Some(&Tensor::new(&[1.0, 2.0, 3.0, -1.0, 0.0, 1.0], &[2, 3])))?;
    graph.forward(softmax)?;

    let output = graph.get_node_value(softmax)?.unwrap();
    // 平移不变：两行结果相同
    let expected = [0.090_030_57, 0.244_728_48, 0.665_240_94];
    for row in 0..2 {
        let mut sum = 0.0;
        for (col, e) in expected.iter().enumerate() {
            assert_abs_diff_eq!(output[[row, col]], *e, epsilon = 1e-6);
            sum += output[[row, col]];
        }
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_softmax_is_stable_for_large_logits() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_input_node(&[1, 3], Some("x"))?;
    let softmax = graph.new_softmax_node(x, Some("softmax"))?;

    graph.set_node_value(x, Some(&Tensor::new(&[1000.0, 1000.0, -1000.0], &[1, 3])))?;
    graph.forward(softmax)?;

    let output = graph.get_node_value(softmax)?.unwrap();
    assert!(output.to_vec().iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(output[[0, 0]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 2]], 0.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_softmax_requires_2d_input() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_input_node(&[1, 3, 2, 2], Some("x"))?;
    assert_err!(
        graph.new_softmax_node(x, None),
        GraphError::DimensionMismatch { expected: 2, got: 4, .. }
    );
    Ok(())
}

#[test]
fn test_softmax_grad_matches_numeric() -> Result<(), GraphError> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut graph = GraphInner::new();
    let x = graph.new_input_node(&[3, 4], Some("x"))?;
    let softmax = graph.new_softmax_node(x, Some("softmax"))?;

    graph.set_node_value(x, Some(&Tensor::uniform_with_rng(-2.0, 2.0, &[3, 4], &mut rng)))?;
    graph.forward(softmax)?;
    let upstream = Tensor::uniform_with_rng(-1.0, 1.0, &[3, 4], &mut rng);

    let grad = vjp(&graph, softmax, 0, &upstream)?;
    let numeric = numeric_vjp(&mut graph, softmax, x, &upstream, 1e-2)?;
    assert_tensor_close(&grad, &numeric, 2e-3);
    Ok(())
}

// ==================== SoftmaxCrossEntropy ====================

#[test]
fn test_cross_entropy_uniform_logits_is_ln_k() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let logits = graph.new_input_node(&[2, 4], Some("logits"))?;
    let labels = graph.new_input_node(&[2, 4], Some("labels"))?;
    let loss = graph.new_softmax_cross_entropy_node(logits, labels, Some("loss"))?;
    assert_eq!(graph.get_node_value_expected_shape(loss)?, &[1, 1]);

    graph.set_node_value(logits, Some(&Tensor::zeros(&[2, 4])))?;
    let one_hot = Tensor::new(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[2, 4]);
    graph.set_node_value(labels, Some(&one_hot))?;
    graph.forward(loss)?;

    let value = graph.get_node_value(loss)?.unwrap().number().unwrap();
    assert_abs_diff_eq!(value, 4.0f32.ln(), epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_cross_entropy_grad_is_softmax_minus_labels_over_batch() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let logits = graph.new_input_node(&[2, 2], Some("logits"))?;
    let labels = graph.new_input_node(&[2, 2], Some("labels"))?;
    let loss = graph.new_softmax_cross_entropy_node(logits, labels, Some("loss"))?;

    graph.set_node_value(logits, Some(&Tensor::zeros(&[2, 2])))?;
    graph.set_node_value(labels, Some(&Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2])))?;
    graph.forward(loss)?;

    let grad = vjp(&graph, loss, 0, &Tensor::new(&[1.0], &[1, 1]))?;
    // (0.5 - y) / 2
    assert_tensor_close(&grad, &Tensor::new(&[-0.25, 0.25, 0.25, -0.25], &[2, 2]), 1e-6);

    // 不对 labels 求梯度
    assert_err!(
        vjp(&graph, loss, 1, &Tensor::new(&[1.0], &[1, 1])),
        GraphError::InvalidOperation(_)
    );
    Ok(())
}

#[test]
fn test_cross_entropy_grad_matches_numeric() -> Result<(), GraphError> {
    let mut rng = StdRng::seed_from_u64(5);
    let mut graph = GraphInner::new();
    let logits = graph.new_input_node(&[3, 5], Some("logits"))?;
    let labels = graph.new_input_node(&[3, 5], Some("labels"))?;
    let loss = graph.new_softmax_cross_entropy_node(logits, labels, Some("loss"))?;

    #[rustfmt::skip]
    let one_hot = Tensor::new(
        &[
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0,
            1.0, 0.0, 0.0, 0.0, 0.0,
        ],
        &[3, 5],
    );
    graph.set_node_value(logits, Some(&Tensor::uniform_with_rng(-1.0, 1.0, &[3, 5], &mut rng)))?;
    graph.set_node_value(labels, Some(&one_hot))?;
    graph.forward(loss)?;

    let upstream = Tensor::new(&[1.0], &[1, 1]);
    let grad = vjp(&graph, loss, 0, &upstream)?;
    let numeric = numeric_vjp(&mut graph, loss, logits, &upstream, 1e-2)?;
    assert_tensor_close(&grad, &numeric, 2e-3);
    Ok(())
}

#[test]
fn test_cross_entropy_class_mismatch() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let logits = graph.new_input_node(&[2, 4], Some("logits"))?;
    let labels = graph.new_input_node(&[2, 3], Some("labels"))?;
    assert_err!(
        graph.new_softmax_cross_entropy_node(logits, labels, None),
        GraphError::ShapeMismatch { .. }
    );
    Ok(())
}
