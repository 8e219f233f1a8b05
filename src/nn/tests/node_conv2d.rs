/*
 * @Author       : 老董
 * @Description  : Conv2d 节点单元测试
 *
 * 1. 形状推断（valid、对称/不对称填充、stride）
 * 2. 前向传播数值
 * 3. 反向传播：与中心差分结果比对
 */

use super::{assert_tensor_close, numeric_vjp, vjp};
use crate::assert_err;
use crate::nn::{GraphError, GraphInner};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ==================== 形状推断 ====================

#[test]
fn test_conv2d_output_shape() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    // 输入: [batch=4, C_in=3, H=28, W=28]；卷积核: [C_out=16, C_in=3, 5, 5]
    let input = graph.new_input_node(&[4, 3, 28, 28], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::zeros(&[16, 3, 5, 5]), None, Some("kernel"))?;

    // H' = (28 + 4 - 5) / 1 + 1 = 28
    let same = graph.new_conv2d_node(input, kernel, (1, 1), (2, 2, 2, 2), Some("same"))?;
    assert_eq!(graph.get_node_value_expected_shape(same)?, &[4, 16, 28, 28]);

    // H' = (28 - 5) / 2 + 1 = 12
    let strided = graph.new_conv2d_node(input, kernel, (2, 2), (0, 0, 0, 0), Some("strided"))?;
    assert_eq!(graph.get_node_value_expected_shape(strided)?, &[4, 16, 12, 12]);
    Ok(())
}

#[test]
fn test_conv2d_asymmetric_padding_shape() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 3, 224, 224], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::zeros(&[96, 3, 7, 7]), None, Some("kernel"))?;

    // 224 / 2 向上取整为 112：总填充 (112-1)*2+7-224 = 5，上 2 下 3
    let conv = graph.new_conv2d_node(input, kernel, (2, 2), (2, 3, 2, 3), Some("stem"))?;
    assert_eq!(graph.get_node_value_expected_shape(conv)?, &[1, 96, 112, 112]);
    Ok(())
}

#[test]
fn test_conv2d_invalid_parents() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 1, 5, 5], Some("input"))?;
    let flat = graph.new_input_node(&[1, 25], Some("flat"))?;
    let kernel = graph.new_parameter_node(&Tensor::zeros(&[2, 3, 3, 3]), None, Some("kernel"))?;
    let big = graph.new_parameter_node(&Tensor::zeros(&[1, 1, 7, 7]), None, Some("big"))?;

    // 通道不匹配
    assert_err!(
        graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), None),
        GraphError::ShapeMismatch { .. }
    );
    // 非 4D 输入
    assert_err!(
        graph.new_conv2d_node(flat, kernel, (1, 1), (0, 0, 0, 0), None),
        GraphError::DimensionMismatch { expected: 4, got: 2, .. }
    );
    // 卷积核大于输入
    assert_err!(
        graph.new_conv2d_node(input, big, (1, 1), (0, 0, 0, 0), None),
        GraphError::InvalidOperation(_)
    );
    // 步长为 0
    assert_err!(
        graph.new_conv2d_node(input, big, (0, 1), (1, 1, 1, 1), None),
        GraphError::InvalidOperation(_)
    );
    Ok(())
}

// ==================== 前向传播 ====================

#[test]
fn test_conv2d_forward_simple() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 1, 3, 3], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::ones(&[1, 1, 2, 2]), None, Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;

    graph.set_node_value(input, Some(&Tensor::ones(&[1, 1, 3, 3])))?;
    graph.forward(conv)?;

    // 2x2 窗口求和 = 4.0
    let output = graph.get_node_value(conv)?.unwrap();
    assert_eq!(output.shape(), &[1, 1, 2, 2]);
    assert!(output.to_vec().iter().all(|&v| (v - 4.0).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_conv2d_forward_with_padding() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 1, 3, 3], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::ones(&[1, 1, 3, 3]), None, Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (1, 1, 1, 1), Some("conv"))?;

    graph.set_node_value(input, Some(&Tensor::ones(&[1, 1, 3, 3])))?;
    graph.forward(conv)?;

    // 角 4、边 6、中心 9
    let output = graph.get_node_value(conv)?.unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0, 0]], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 0, 1]], 6.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 1, 1]], 9.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 2, 2]], 4.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_conv2d_forward_asymmetric_padding() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 1, 4, 4], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::ones(&[1, 1, 3, 3]), None, Some("kernel"))?;
    // 只在下、右补一行/列
    let conv = graph.new_conv2d_node(input, kernel, (2, 2), (0, 1, 0, 1), Some("conv"))?;

    graph.set_node_value(input, Some(&Tensor::ones(&[1, 1, 4, 4])))?;
    graph.forward(conv)?;

    let output = graph.get_node_value(conv)?.unwrap();
    assert_eq!(output, &Tensor::new(&[9.0, 6.0, 6.0, 4.0], &[1, 1, 2, 2]));
    Ok(())
}

#[test]
fn test_conv2d_forward_multi_channel() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 2, 2, 2], Some("input"))?;
    // 2 个输出通道：第 0 个只看通道 0，第 1 个对两通道求和
    let kernel_value = Tensor::new(&[1.0, 0.0, 1.0, 1.0], &[2, 2, 1, 1]);
    let kernel = graph.new_parameter_node(&kernel_value, None, Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;

    let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0], &[1, 2, 2, 2]);
    graph.set_node_value(input, Some(&x))?;
    graph.forward(conv)?;

    let expected = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 11.0, 22.0, 33.0, 44.0], &[1, 2, 2, 2]);
    assert_eq!(graph.get_node_value(conv)?.unwrap(), &expected);
    Ok(())
}

#[test]
fn test_conv2d_forward_dynamic_batch() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[1, 1, 3, 3], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::ones(&[1, 1, 2, 2]), None, Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;

    graph.set_node_value(input, Some(&Tensor::ones(&[3, 1, 3, 3])))?;
    graph.forward(conv)?;
    assert_eq!(graph.get_node_value(conv)?.unwrap().shape(), &[3, 1, 2, 2]);
    Ok(())
}

// ==================== 反向传播 ====================

#[test]
fn test_conv2d_grad_matches_numeric() -> Result<(), GraphError> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[2, 2, 5, 5], Some("input"))?;
    let kernel_value = Tensor::uniform_with_rng(-1.0, 1.0, &[3, 2, 3, 3], &mut rng);
    let kernel = graph.new_parameter_node(&kernel_value, None, Some("kernel"))?;
    // 不对称填充 + stride：H' = (5+2-3)/2+1 = 3，W' = (5+1-3)/2+1 = 2
    let conv = graph.new_conv2d_node(input, kernel, (2, 2), (1, 1, 0, 1), Some("conv"))?;
    assert_eq!(graph.get_node_value_expected_shape(conv)?, &[2, 3, 3, 2]);

    let x = Tensor::uniform_with_rng(-1.0, 1.0, &[2, 2, 5, 5], &mut rng);
    graph.set_node_value(input, Some(&x))?;
    graph.forward(conv)?;
    let upstream = Tensor::uniform_with_rng(-1.0, 1.0, &[2, 3, 3, 2], &mut rng);

    let grad_input = vjp(&graph, conv, 0, &upstream)?;
    let grad_kernel = vjp(&graph, conv, 1, &upstream)?;
    let numeric_input = numeric_vjp(&mut graph, conv, input, &upstream, 1e-2)?;
    let numeric_kernel = numeric_vjp(&mut graph, conv, kernel, &upstream, 1e-2)?;

    assert_tensor_close(&grad_input, &numeric_input, 1e-3);
    assert_tensor_close(&grad_kernel, &numeric_kernel, 1e-3);
    Ok(())
}

#[test]
fn test_conv2d_kernel_grad_accumulates_over_batch() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_input_node(&[2, 1, 2, 2], Some("input"))?;
    let kernel = graph.new_parameter_node(&Tensor::ones(&[1, 1, 2, 2]), None, Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;

    let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[2, 1, 2, 2]);
    graph.set_node_value(input, Some(&x))?;
    graph.forward(conv)?;

    // 输出 [2,1,1,1]，上游梯度全 1：dK = 两个样本之和
    let grad_kernel = vjp(&graph, conv, 1, &Tensor::ones(&[2, 1, 1, 1]))?;
    assert_eq!(grad_kernel, Tensor::new(&[6.0, 8.0, 10.0, 12.0], &[1, 1, 2, 2]));
    Ok(())
}
