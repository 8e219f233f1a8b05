mod channel_bias_add;
mod concat;
mod conv2d;
mod dropout;
mod global_avg_pool2d;
mod max_pool2d;
mod relu;
mod softmax;

pub(in crate::nn) use channel_bias_add::ChannelBiasAdd;
pub(in crate::nn) use concat::Concat;
pub(in crate::nn) use conv2d::{Conv2d, Pad2d};
pub(in crate::nn) use dropout::Dropout;
pub(in crate::nn) use global_avg_pool2d::GlobalAvgPool2d;
pub(in crate::nn) use max_pool2d::MaxPool2d;
pub(in crate::nn) use relu::ReLU;
pub(in crate::nn) use softmax::Softmax;
pub(in crate::nn::nodes) use softmax::stable_softmax_rows;
