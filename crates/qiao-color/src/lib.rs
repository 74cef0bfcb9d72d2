//! # qiao-color
//!
//! 远程桌面图形管线的颜色转换原语.
//!
//! 所有转换都以 [`Roi`](qiao_core::Roi) 为作用范围, 在带行跨度的平面缓冲区上工作:
//! - YUV 4:2:0 → BGRA
//! - YUV 4:4:4 → BGRA
//! - BGRA → YUV 4:2:0
//! - YUV 4:2:0 主信号 + 辅助信号 → YUV 4:4:4
//!
//! 转换前先校验每个平面的长度与行跨度, 任何越界都以错误返回, 不会读写缓冲区之外的内存.

pub mod bt601;
pub mod planes;
pub mod yuv;

pub use planes::{PlaneSet, PlaneSetMut};
pub use yuv::{rgb_to_yuv420, yuv420_combine_to_yuv444, yuv420_to_rgb, yuv444_to_rgb};
