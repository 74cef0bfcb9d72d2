//! 像素格式定义.
//!
//! 远程桌面图形管线只涉及三种格式: 解码输出的 YUV 4:2:0 / 4:4:4 平面格式,
//! 以及目标表面的 32 位 BGRA 打包格式.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// YUV 4:2:0 平面格式, 8 位 (H.264 默认)
    Yuv420p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// BGRA 各 8 位, 打包, A 恒为 0xFF
    Bgra,
}

impl PixelFormat {
    /// 平面数量
    pub const fn plane_count(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv444p => 3,
            Self::Bgra => 1,
        }
    }

    /// 是否为平面格式
    pub const fn is_planar(&self) -> bool {
        self.plane_count() > 1
    }

    /// 色度子采样位移 (log2_chroma_w, log2_chroma_h)
    pub const fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p => (1, 1),
            Self::Yuv444p | Self::Bgra => (0, 0),
        }
    }

    /// 每像素字节数 (仅打包格式)
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Bgra => Some(4),
            _ => None,
        }
    }

    /// 指定平面的最小行字节数
    ///
    /// 色度平面宽度向上取整, 奇数宽度的 4:2:0 帧色度宽度为 `(w + 1) / 2`.
    pub fn plane_linesize(&self, plane: usize, width: u32) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        let w = width as usize;
        match self {
            Self::Bgra => w.checked_mul(4),
            _ if plane == 0 => Some(w),
            _ => {
                let (sw, _) = self.chroma_subsampling();
                Some((w + (1 << sw) - 1) >> sw)
            }
        }
    }

    /// 指定平面的行数
    pub fn plane_height(&self, plane: usize, height: u32) -> Option<usize> {
        if plane >= self.plane_count() {
            return None;
        }
        let h = height as usize;
        if plane == 0 {
            return Some(h);
        }
        let (_, sh) = self.chroma_subsampling();
        Some((h + (1 << sh) - 1) >> sh)
    }

    /// 紧密排列时一帧的总字节数
    pub fn frame_size(&self, width: u32, height: u32) -> Option<usize> {
        let mut total = 0usize;
        for plane in 0..self.plane_count() {
            let bytes = self
                .plane_linesize(plane, width)?
                .checked_mul(self.plane_height(plane, height)?)?;
            total = total.checked_add(bytes)?;
        }
        Some(total)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv444p => "yuv444p",
            Self::Bgra => "bgra",
        };
        write!(f, "{name}")
    }
}
