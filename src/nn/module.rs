/*
 * @Author       : 老董
 * @Description  : 带可训练参数的层的公共接口
 */

use super::Var;

/// 带参数的层（如`Conv2d`）实现的 trait
///
/// 只约定参数的查询；各层`forward(&x)`的签名不同，不放进 trait。
pub trait Module {
    /// 本层的全部参数节点
    fn parameters(&self) -> Vec<Var>;

    /// 参数节点个数（卷积层带偏置时为 2）
    fn num_params(&self) -> usize {
        self.parameters().len()
    }

    /// 参数元素总数
    fn num_param_elements(&self) -> usize {
        self.parameters()
            .iter()
            .filter_map(|p| p.value_expected_shape().ok())
            .map(|shape| shape.iter().product::<usize>())
            .sum()
    }
}
