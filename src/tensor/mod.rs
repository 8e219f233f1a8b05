/*
 * @Author       : 老董
 * @Description  : 张量（Tensor）：本库所有数值计算的基本载体，底层由`ndarray`的动态维数组承载
 */

use ndarray::{Array, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::errors::{ComparisonOperator, TensorError};

mod ops {
    // 宏须先于使用它的子模块声明
    #[macro_use]
    mod macros;

    mod arithmetic;
    mod others;
}

mod index;
mod print;
mod property;
mod shape;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]、[1,1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]；
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        Self::from_vec(data.to_vec(), shape)
    }

    /// 与`new`相同，但直接接管`Vec`的所有权，省去一次拷贝
    pub(crate) fn from_vec(data: Vec<f32>, shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert!(
            data.len() == expected,
            "{}",
            TensorError::DataShapeMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        let data = Array::from_shape_vec(IxDyn(shape), data)
            .expect("数据长度已校验，构造ndarray不应失败");
        Self { data }
    }

    pub(crate) const fn from_array(data: Array<f32, IxDyn>) -> Self {
        Self { data }
    }

    /// 全零张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    /// 全一张量
    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: Array::ones(IxDyn(shape)),
        }
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间（使用线程级随机数生成器）
    pub fn new_random(min: f32, max: f32, shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        Self::uniform_from(&mut rng, min, max, shape)
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间（使用指定的随机数生成器，确保可重复性）
    pub fn uniform_with_rng(min: f32, max: f32, shape: &[usize], rng: &mut StdRng) -> Self {
        Self::uniform_from(rng, min, max, shape)
    }

    /// 创建一个服从正态分布的随机张量
    pub fn normal(mean: f32, std_dev: f32, shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        Self::normal_from(&mut rng, mean, std_dev, shape)
    }

    /// 创建一个服从正态分布的随机张量（使用指定的随机数生成器）
    pub fn normal_with_rng(mean: f32, std_dev: f32, shape: &[usize], rng: &mut StdRng) -> Self {
        Self::normal_from(rng, mean, std_dev, shape)
    }

    /// 由类别下标创建 one-hot 矩阵，形状为[labels.len(), n_classes]
    /// 注：`labels`为空或存在不小于`n_classes`的下标时panic。
    pub fn one_hot(labels: &[usize], n_classes: usize) -> Self {
        assert!(!labels.is_empty(), "{}", TensorError::EmptyList);
        let mut data = vec![0.0; labels.len() * n_classes];
        for (row, &label) in labels.iter().enumerate() {
            assert!(
                label < n_classes,
                "{}",
                TensorError::ValueMustSatisfyComparison {
                    value_name: "类别下标".to_string(),
                    operator: ComparisonOperator::LessThan,
                    threshold: n_classes,
                }
            );
            data[row * n_classes + label] = 1.0;
        }
        Self::from_vec(data, &[labels.len(), n_classes])
    }
}

// 私有方法
impl Tensor {
    fn uniform_from<R: Rng>(rng: &mut R, min: f32, max: f32, shape: &[usize]) -> Self {
        let distribution = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| distribution.sample(rng))
            .collect::<Vec<_>>();
        Self::from_vec(data, shape)
    }

    /// Box-Muller 变换生成正态分布样本
    fn normal_from<R: Rng>(rng: &mut R, mean: f32, std_dev: f32, shape: &[usize]) -> Self {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.r#gen();
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Self::from_vec(data, shape)
    }
}
