/*
 * @Author       : 老董
 * @Description  : 训练/评估模式切换
 */

use super::GraphInner;

impl GraphInner {
    pub fn set_train_mode(&mut self) {
        self.switch_mode(true);
    }

    pub fn set_eval_mode(&mut self) {
        self.switch_mode(false);
    }

    pub const fn is_train_mode(&self) -> bool {
        self.training
    }

    /// 临时切到评估模式执行`f`（Dropout 直通），返回前恢复调用前的模式
    pub fn no_grad_scope<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let previous = self.training;
        self.switch_mode(false);
        let result = f(self);
        self.switch_mode(previous);
        result
    }

    // 节点各自持有模式标记（Dropout 前向时要用），这里统一下发
    fn switch_mode(&mut self, training: bool) {
        if self.training == training {
            return;
        }
        self.training = training;
        self.nodes
            .values_mut()
            .for_each(|node| node.set_train_mode(training));
    }
}
