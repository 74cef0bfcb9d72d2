//! # qiao-codec
//!
//! 远程桌面图形管线的 H.264 部分, 提供:
//! - Annex B 字节流解复用, NAL 单元分类与 SPS/PPS 参数集解析 ([`parsers::h264`])
//! - 可替换的编解码后端接口与按优先级选择的后端注册表
//! - [`H264Context`]: 调用后端解码后按区域合成到 BGRA 目标表面, 以及反向的压缩流程
//!
//! 本 crate 不重建像素: 实际的熵解码与编码由后端完成.
//!
//! ## 使用示例
//!
//! ```rust
//! use qiao_codec::parsers::h264::{DemuxOptions, parse_byte_stream};
//!
//! let stream = [0x00, 0x00, 0x00, 0x01, 0x09, 0xF0];
//! let summary = parse_byte_stream(&stream, &DemuxOptions::default()).unwrap();
//! assert_eq!(summary.units.len(), 1);
//! ```

pub mod backend;
pub mod backends;
pub mod context;
pub mod encoder_params;
pub mod frame;
pub mod parsers;
pub mod registry;

// 重导出常用类型
pub use backend::{BackendCaps, BackendKind, Decoded, H264Backend};
pub use context::{ContextOptions, DecompressOutcome, H264Context};
pub use encoder_params::{EncoderParams, EncoderSettings, ParamDelta, ParamUpdate, RateControlMode};
pub use frame::YuvFrame;
pub use registry::BackendRegistry;

/// 注册所有内置后端
pub fn register_all(registry: &mut BackendRegistry) {
    backends::register_all_backends(registry);
}
