/*
 * @Author       : 老董
 * @Description  : 计算图：`Graph`句柄、底层的`GraphInner`，以及图操作的错误类型
 */

mod error;
mod handle;
mod inner;

pub use error::GraphError;
pub use handle::Graph;
pub use inner::GraphInner;
