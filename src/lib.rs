//! # Qiao (桥)
//!
//! 纯 Rust 实现的远程桌面图形管线 H.264 部分.
//!
//! - **码流解析**: Annex B 解复用, NAL 分类, SPS/PPS 解析
//! - **颜色转换**: BT.601 定点 YUV ↔ BGRA, AVC444 色度重建
//! - **后端调度**: 按优先级选择编解码后端, 解码结果按区域合成到目标表面
//!
//! # 快速开始
//!
//! ```rust
//! use qiao::codec::parsers::h264::{DemuxOptions, NalUnitType, parse_byte_stream};
//!
//! let stream = [0x00, 0x00, 0x01, 0x09, 0xF0, 0x00, 0x00, 0x01, 0x65, 0x88];
//! let summary = parse_byte_stream(&stream, &DemuxOptions::default()).unwrap();
//! assert_eq!(summary.units[1].unit.nal_type(), NalUnitType::SliceIdr);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `qiao-core` | 错误类型, 比特流读取, 几何与像素格式 |
//! | `qiao-color` | YUV/RGB 颜色转换原语 |
//! | `qiao-codec` | H.264 码流解析, 后端调度与区域合成 |

pub mod config;
pub mod logging;

/// 核心类型与工具
pub use qiao_core as core;

/// H.264 码流解析与后端调度
pub use qiao_codec as codec;

/// 颜色转换原语
pub use qiao_color as color;

/// 获取 Qiao 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置后端的注册表
pub fn default_backend_registry() -> qiao_codec::BackendRegistry {
    let mut registry = qiao_codec::BackendRegistry::new();
    qiao_codec::register_all(&mut registry);
    registry
}

/// 按配置创建 H.264 上下文
pub fn context_from_config(
    config: &config::CodecConfig,
) -> qiao_core::QiaoResult<qiao_codec::H264Context> {
    qiao_codec::H264Context::with_registry(config.to_context_options(), &default_backend_registry())
}
