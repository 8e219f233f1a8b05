use crate::assert_panic;
use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

#[test]
fn test_reshape() {
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let r = t.reshape(&[3, 2]);
    assert_eq!(r.shape(), &[3, 2]);
    assert_eq!(r.to_vec(), t.to_vec());
    assert_panic!(t.reshape(&[4, 2]), TensorError::IncompatibleShape);
}

#[test]
fn test_concat_along_channel_axis() -> Result<(), TensorError> {
    // [1, 1, 2, 2] + [1, 2, 2, 2] -> [1, 3, 2, 2]
    let a = Tensor::new(&[1., 2., 3., 4.], &[1, 1, 2, 2]);
    let b = Tensor::new(&[5., 6., 7., 8., 9., 10., 11., 12.], &[1, 2, 2, 2]);
    let c = Tensor::concat(&[&a, &b], 1)?;
    assert_eq!(c.shape(), &[1, 3, 2, 2]);
    assert_eq!(
        c.to_vec(),
        vec![1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 11., 12.]
    );
    Ok(())
}

#[test]
fn test_concat_keeps_samples_separate() -> Result<(), TensorError> {
    // batch=2 时，拼接发生在每个样本内部
    let a = Tensor::new(&[1., 2.], &[2, 1, 1, 1]);
    let b = Tensor::new(&[10., 20.], &[2, 1, 1, 1]);
    let c = Tensor::concat(&[&a, &b], 1)?;
    assert_eq!(c.shape(), &[2, 2, 1, 1]);
    assert_eq!(c.to_vec(), vec![1., 10., 2., 20.]);
    Ok(())
}

#[test]
fn test_concat_errors() {
    let a = Tensor::zeros(&[1, 2, 3, 3]);
    let b = Tensor::zeros(&[1, 2, 4, 4]);
    assert_eq!(
        Tensor::concat(&[&a, &b], 1),
        Err(TensorError::OperatorError {
            operator: Operator::Concat,
            tensor1_shape: vec![1, 2, 3, 3],
            tensor2_shape: vec![1, 2, 4, 4],
        })
    );
    assert_eq!(Tensor::concat(&[], 0), Err(TensorError::EmptyList));
    assert_eq!(
        Tensor::concat(&[&a], 4),
        Err(TensorError::AxisOutOfRange {
            axis: 4,
            dimension: 4
        })
    );
}

#[test]
fn test_split_axis_inverts_concat() -> Result<(), TensorError> {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2, 1, 1]);
    let b = Tensor::new(&[5., 6., 7., 8., 9., 10.], &[2, 3, 1, 1]);
    let c = Tensor::concat(&[&a, &b], 1)?;
    let parts = c.split_axis(1, &[2, 3])?;
    assert_eq!(parts[0], a);
    assert_eq!(parts[1], b);

    assert_eq!(
        c.split_axis(1, &[2, 2]),
        Err(TensorError::SplitSizeMismatch { total: 4, len: 5 })
    );
    Ok(())
}
