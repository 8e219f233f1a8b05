//! 杂项工具：目前只有单元测试用的断言宏
