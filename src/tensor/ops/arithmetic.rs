/*
 * @Author       : 老董
 * @Description  : 张量的加减乘除。与纯数运算时逐元素进行；张量间运算支持 NumPy 风格广播，
 *                 形状无法广播或除数含零时 panic
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

impl_tensor_binary_op!(Add, add, +);
impl_tensor_binary_op!(Sub, sub, -);
impl_tensor_binary_op!(Mul, mul, *);
impl_tensor_binary_op!(Div, div, /);

fn check_operands(lhs: &Tensor, rhs: &Tensor, operator: Operator) {
    assert!(
        lhs.can_broadcast_with(rhs),
        "{}",
        TensorError::OperatorError {
            operator,
            tensor1_shape: lhs.shape().to_vec(),
            tensor2_shape: rhs.shape().to_vec(),
        }
    );
    if operator == Operator::Div {
        assert!(!rhs.has_zero_value(), "{}", TensorError::DivByZeroElement);
    }
}
