//! 统一错误类型定义.
//!
//! 所有 Qiao crate 共用的错误类型, 支持跨模块传播.
//! 每个错误都可以映射为一个稳定的负数状态码, 便于与远程桌面协议栈的其余部分对接.

use std::fmt;

use thiserror::Error;

/// 区域越界的具体边界
///
/// 区域合成时对解码帧尺寸与目标表面尺寸分别校验, 不同边界对应不同状态码.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionBound {
    /// `right` 超出解码帧宽度
    FrameWidth,
    /// `bottom` 超出解码帧高度
    FrameHeight,
    /// `right` 超出目标表面宽度
    SurfaceWidth,
    /// `bottom` 超出目标表面高度
    SurfaceHeight,
    /// `left > right` 或 `top > bottom`
    Inverted,
}

impl RegionBound {
    /// 对应的状态码
    pub const fn status_code(self) -> i32 {
        match self {
            Self::FrameWidth => -1003,
            Self::FrameHeight => -1004,
            Self::SurfaceWidth => -1005,
            Self::SurfaceHeight => -1006,
            Self::Inverted => -1007,
        }
    }
}

impl fmt::Display for RegionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FrameWidth => "超出解码帧宽度",
            Self::FrameHeight => "超出解码帧高度",
            Self::SurfaceWidth => "超出目标表面宽度",
            Self::SurfaceHeight => "超出目标表面高度",
            Self::Inverted => "矩形左上角大于右下角",
        };
        f.write_str(s)
    }
}

/// Qiao 统一错误类型
#[derive(Debug, Error)]
pub enum QiaoError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 缓冲区中找不到起始码
    #[error("未找到起始码: 偏移 {offset}")]
    MissingStartCode { offset: usize },

    /// 期望起始码时剩余字节不足
    #[error("码流截断: 偏移 {offset} 处仅剩 {remaining} 字节")]
    Truncated { offset: usize, remaining: usize },

    /// NAL 头 forbidden_zero_bit 不为 0
    #[error("forbidden_zero_bit 不为 0: 偏移 {offset}")]
    ForbiddenBit { offset: usize },

    /// 区域矩形越界
    #[error("区域 #{index} 越界: {bound}")]
    RegionOutOfBounds { index: usize, bound: RegionBound },

    /// 后端返回的错误, 状态码原样保留
    #[error("后端错误 ({code}): {message}")]
    Backend { code: i32, message: String },

    /// 没有可用的后端
    #[error("没有可用的 H.264 后端")]
    NoBackend,

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl QiaoError {
    /// 映射为稳定的负数状态码
    pub fn status_code(&self) -> i32 {
        match self {
            Self::RegionOutOfBounds { bound, .. } => bound.status_code(),
            Self::InvalidArgument(_) => -1002,
            Self::Backend { code, .. } => *code,
            _ => -1,
        }
    }

    /// 是否属于输入数据畸形 (调用方可丢弃该帧后继续)
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidData(_)
                | Self::Eof
                | Self::MissingStartCode { .. }
                | Self::Truncated { .. }
                | Self::ForbiddenBit { .. }
                | Self::RegionOutOfBounds { .. }
        )
    }
}

/// Qiao 统一 Result 类型
pub type QiaoResult<T> = Result<T, QiaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_区域状态码() {
        let cases = [
            (RegionBound::FrameWidth, -1003),
            (RegionBound::FrameHeight, -1004),
            (RegionBound::SurfaceWidth, -1005),
            (RegionBound::SurfaceHeight, -1006),
            (RegionBound::Inverted, -1007),
        ];
        for (bound, code) in cases {
            let err = QiaoError::RegionOutOfBounds { index: 0, bound };
            assert_eq!(err.status_code(), code, "{bound} 状态码不匹配");
            assert!(err.is_malformed_input());
        }
    }

    #[test]
    fn test_后端状态码原样保留() {
        let err = QiaoError::Backend {
            code: -42,
            message: "decode".into(),
        };
        assert_eq!(err.status_code(), -42);
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_其他错误状态码() {
        assert_eq!(QiaoError::InvalidArgument("dst".into()).status_code(), -1002);
        assert_eq!(QiaoError::ForbiddenBit { offset: 4 }.status_code(), -1);
        assert_eq!(QiaoError::NoBackend.status_code(), -1);
        let msg = format!("{}", QiaoError::ForbiddenBit { offset: 4 });
        assert!(msg.contains("forbidden_zero_bit"), "错误信息应包含字段名: {msg}");
    }
}
