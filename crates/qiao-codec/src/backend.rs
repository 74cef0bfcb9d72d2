//! H.264 编解码后端 trait 定义.
//!
//! 实际的熵解码与编码由后端完成 (硬件加速或软件库). 上下文只负责选择后端,
//! 校验区域并完成颜色转换. 每个后端自己持有私有状态.

use std::fmt;

use bitflags::bitflags;
use bytes::Bytes;
use qiao_color::PlaneSet;
use qiao_core::{QiaoError, QiaoResult};

use crate::encoder_params::ParamUpdate;
use crate::frame::YuvFrame;

/// 后端类别, 同时决定选择时的优先级 (硬件 > 软件 > 空后端)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendKind {
    /// 硬件加速
    Hardware,
    /// 软件编解码库
    Software,
    /// 空后端, 总能初始化但不产出任何帧
    Null,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hardware => "hardware",
            Self::Software => "software",
            Self::Null => "null",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// 后端能力
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BackendCaps: u32 {
        /// 支持解码
        const DECODE = 0x01;
        /// 支持编码
        const ENCODE = 0x02;
        /// 使用硬件加速
        const HARDWARE = 0x04;
    }
}

/// 后端解码出的 4:2:0 帧, 借用后端内部缓冲
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    pub planes: PlaneSet<'a>,
    pub width: u32,
    pub height: u32,
}

/// 一次解码调用的结果
#[derive(Debug, Clone, Copy)]
pub enum Decoded<'a> {
    /// 本次调用没有产出帧 (不是错误)
    Pending,
    /// 产出了一帧
    Frame(DecodedFrame<'a>),
}

/// H.264 后端 trait
///
/// 生命周期:
/// 1. 注册表调用 `init()`, 成功的第一个后端成为上下文的活动后端
/// 2. 反复调用 `decompress()` / `compress()`
/// 3. 上下文销毁时调用 `uninit()`, [`reset`](crate::H264Context::reset) 不会释放后端
///
/// 单次调用失败不能破坏后端状态, 后续调用必须仍然可用.
pub trait H264Backend: Send {
    /// 后端名称
    fn name(&self) -> &str;

    /// 后端类别
    fn kind(&self) -> BackendKind;

    /// 后端能力
    fn capabilities(&self) -> BackendCaps;

    /// 初始化, `compressor` 为 true 时以编码模式初始化
    fn init(&mut self, compressor: bool) -> QiaoResult<()>;

    /// 释放后端资源, 可重复调用
    fn uninit(&mut self) {}

    /// 解码一段 Annex B 数据
    ///
    /// 返回的帧借用后端内部缓冲, 在下一次调用前有效.
    fn decompress(&mut self, src: &[u8]) -> QiaoResult<Decoded<'_>>;

    /// 编码一帧 4:2:0 数据, `update` 描述本次需要应用的参数变化
    ///
    /// 默认实现返回 [`QiaoError::Unsupported`].
    fn compress(&mut self, _frame: &YuvFrame, _update: &ParamUpdate) -> QiaoResult<Bytes> {
        Err(QiaoError::Unsupported(format!("后端 {} 不支持编码", self.name())))
    }
}
