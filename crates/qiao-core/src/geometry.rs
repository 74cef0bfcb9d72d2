//! 几何类型: 区域矩形与转换作用范围.

use crate::RegionBound;

/// 16 位区域矩形 (`left`, `top` 含, `right`, `bottom` 不含)
///
/// 对应图形管线 PDU 中的矩形字段, 以目标像素坐标表示.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect16 {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl Rect16 {
    /// 创建矩形
    pub const fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// 宽度, 矩形倒置时为 0
    pub fn width(&self) -> u32 {
        u32::from(self.right.saturating_sub(self.left))
    }

    /// 高度, 矩形倒置时为 0
    pub fn height(&self) -> u32 {
        u32::from(self.bottom.saturating_sub(self.top))
    }

    /// 是否为空矩形
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// 作用范围 (宽 x 高)
    pub fn roi(&self) -> Roi {
        Roi::new(self.width(), self.height())
    }

    /// 校验矩形落在解码帧与目标表面之内
    ///
    /// 依次检查帧宽, 帧高, 表面宽, 表面高, 最后检查矩形是否倒置.
    pub fn check_bounds(
        &self,
        frame_width: u32,
        frame_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<(), RegionBound> {
        let (l, t, r, b) = (
            u32::from(self.left),
            u32::from(self.top),
            u32::from(self.right),
            u32::from(self.bottom),
        );
        if r > frame_width || l > frame_width {
            return Err(RegionBound::FrameWidth);
        }
        if t > frame_height || b > frame_height {
            return Err(RegionBound::FrameHeight);
        }
        if r > surface_width || l > surface_width {
            return Err(RegionBound::SurfaceWidth);
        }
        if b > surface_height || t > surface_height {
            return Err(RegionBound::SurfaceHeight);
        }
        if l > r || t > b {
            return Err(RegionBound::Inverted);
        }
        Ok(())
    }
}

/// 颜色转换的作用范围, 以平面组原点为锚点
///
/// 尺寸可以为奇数: 转换内部按 2x2 块向上取整处理, 但不会写出目标缓冲区之外.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Roi {
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// 创建作用范围
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 是否为空
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 4:2:0 色度平面对应的尺寸 (向上取整)
    pub const fn chroma_420(&self) -> Roi {
        Roi::new(self.width.div_ceil(2), self.height.div_ceil(2))
    }

    /// 向下取整到偶数尺寸
    pub const fn round_down_even(&self) -> Roi {
        Roi::new(self.width & !1, self.height & !1)
    }

    /// 向上取整到偶数尺寸
    pub const fn round_up_even(&self) -> Roi {
        Roi::new(self.width.div_ceil(2) * 2, self.height.div_ceil(2) * 2)
    }
}
