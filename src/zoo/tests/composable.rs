use crate::assert_err;
use crate::nn::{Conv2dOptions, Graph, GraphError, Init, Padding, Regularizer};
use crate::tensor::Tensor;
use crate::zoo::Composable;
use approx::assert_abs_diff_eq;

#[test]
fn test_composable_default() {
    let base = Composable::default();
    assert_eq!(base.init_weights, Init::GlorotUniform);
    assert_eq!(base.reg, Some(Regularizer::L2(0.001)));
    assert_eq!(base.relu, None);
    assert!(base.bias);

    let custom = Composable::new(Init::HeNormal, None, Some(6.0));
    assert_eq!(custom.init_weights, Init::HeNormal);
    assert!(custom.reg.is_none());
    assert!(custom.bias);
}

#[test]
fn test_composable_relu_activation_honours_clamp() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input(&Tensor::new(&[-3.0, 2.0, 8.0], &[1, 3]))?;

    let plain = Composable::default().relu_activation(&x)?;
    let clamped = Composable::new(Init::GlorotUniform, None, Some(6.0)).relu_activation(&x)?;
    plain.forward()?;
    clamped.forward()?;

    assert_eq!(plain.value()?.unwrap(), Tensor::new(&[0.0, 2.0, 8.0], &[1, 3]));
    assert_eq!(clamped.value()?.unwrap(), Tensor::new(&[0.0, 2.0, 6.0], &[1, 3]));
    Ok(())
}

#[test]
fn test_composable_conv2d_follows_policy() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(0);
    let x = graph.input_shape(&[1, 8, 10, 10], Some("x"))?;
    let base = Composable {
        init_weights: Init::Constant(1.0),
        reg: Some(Regularizer::L2(0.5)),
        relu: None,
        bias: false,
    };

    let y = base.conv2d(&x, 4, (3, 3), (2, 2), Padding::Same, "conv")?;
    assert_eq!(y.value_expected_shape()?, vec![1, 4, 5, 5]);

    // 无偏置，只有一个卷积核参数
    let params = graph.parameters();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name()?, "conv_K");
    assert!(params[0].value()?.unwrap().to_vec().iter().all(|&v| v == 1.0));
    // 0.5 * (4*8*3*3)
    assert_abs_diff_eq!(graph.regularization_loss(), 0.5 * 288.0, epsilon = 1e-3);
    Ok(())
}

#[test]
fn test_composable_conv2d_with_overrides() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input_shape(&[1, 2, 4, 4], Some("x"))?;
    let base = Composable::default();

    let options = Conv2dOptions {
        init: Init::Zeros,
        regularizer: None,
        ..base.conv_options((1, 1), Padding::Valid)
    };
    let y = base.conv2d_with(&x, 3, (3, 3), options, "conv")?;
    assert_eq!(y.value_expected_shape()?, vec![1, 3, 2, 2]);
    assert_eq!(graph.parameter_count(), 3 * 2 * 9 + 3);
    assert_abs_diff_eq!(graph.regularization_loss(), 0.0);
    Ok(())
}

#[test]
fn test_composable_conv2d_requires_4d_input() -> Result<(), GraphError> {
    let graph = Graph::new();
    let x = graph.input_shape(&[1, 8], Some("x"))?;
    assert_err!(
        Composable::default().conv2d(&x, 4, (1, 1), (1, 1), Padding::Same, "conv"),
        GraphError::DimensionMismatch { expected: 4, got: 2, .. }
    );
    Ok(())
}
