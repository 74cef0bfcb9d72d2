//! # qiao-core
//!
//! Qiao 核心库, 提供基础类型定义、错误处理和比特流工具.
//!
//! 为 `qiao-codec` (H.264 码流解析) 与 `qiao-color` (颜色空间转换) 提供底层基础设施.

pub mod bitreader;
pub mod bitwriter;
pub mod cpu;
pub mod error;
pub mod geometry;
pub mod pixel_format;

// 重导出常用类型
pub use bitreader::BitCursor;
pub use error::{QiaoError, QiaoResult, RegionBound};
pub use geometry::{Rect16, Roi};
pub use pixel_format::PixelFormat;
