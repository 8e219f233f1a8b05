/// 为某个算术运算符生成张量的全部重载：`f32 ∘ Tensor`、`Tensor ∘ f32`、`Tensor ∘ Tensor`（各含引用版本）。
/// 与纯数运算时形状不变；张量间运算先经`check_operands`校验，再按 NumPy 规则广播。
/// `$trait`须与`Operator`的变体同名。
macro_rules! impl_tensor_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl std::ops::$trait<Tensor> for f32 {
            type Output = Tensor;

            fn $method(self, tensor: Tensor) -> Tensor {
                Tensor::from_array(self $op &tensor.data)
            }
        }
        impl std::ops::$trait<&Tensor> for f32 {
            type Output = Tensor;

            fn $method(self, tensor: &Tensor) -> Tensor {
                Tensor::from_array(self $op &tensor.data)
            }
        }

        impl std::ops::$trait<f32> for Tensor {
            type Output = Self;

            fn $method(self, scalar: f32) -> Self {
                Tensor::from_array(self.data $op scalar)
            }
        }
        impl std::ops::$trait<f32> for &Tensor {
            type Output = Tensor;

            fn $method(self, scalar: f32) -> Tensor {
                Tensor::from_array(&self.data $op scalar)
            }
        }

        impl std::ops::$trait<&Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: &Tensor) -> Tensor {
                check_operands(self, other, Operator::$trait);
                Tensor::from_array(&self.data $op &other.data)
            }
        }
        impl std::ops::$trait for Tensor {
            type Output = Self;

            fn $method(self, other: Self) -> Self {
                &self $op &other
            }
        }
        impl std::ops::$trait<&Tensor> for Tensor {
            type Output = Self;

            fn $method(self, other: &Tensor) -> Self {
                &self $op other
            }
        }
        impl std::ops::$trait<Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, other: Tensor) -> Tensor {
                self $op &other
            }
        }
    };
}
