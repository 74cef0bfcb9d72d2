//! H.264 码流解析.
//!
//! - [`annexb`]: Annex B 字节流解复用
//! - [`nal`]: NAL 单元头部与扩展头
//! - [`sps`] / [`pps`]: 参数集解析 (宽松, 永不失败)

pub mod annexb;
pub mod nal;
pub mod pps;
pub mod sps;

pub use annexb::{
    AnnexBReader, ByteStreamSummary, DemuxOptions, ParameterSet, ParsedNal, parse_byte_stream,
};
pub use nal::{NalExtension, NalHeader, NalUnit, NalUnitType, remove_emulation_prevention};
pub use pps::{Pps, parse_pps};
pub use sps::{Sps, Vui, parse_sps};
