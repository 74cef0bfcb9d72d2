//! 平面 YUV 4:2:0 帧.
//!
//! 压缩流程使用的暂存帧, 也可作为后端持有的解码输出缓冲.

use qiao_core::{PixelFormat, QiaoError, QiaoResult, Roi};
use qiao_color::{PlaneSet, PlaneSetMut};

/// YUV 4:2:0 帧, 三个平面各自连续存放
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    /// 各平面的像素数据 (Y, U, V)
    pub data: [Vec<u8>; 3],
    /// 各平面每行的字节数
    pub linesize: [usize; 3],
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
}

impl YuvFrame {
    /// 分配指定尺寸的 4:2:0 帧, 样本初始化为 0
    ///
    /// 分配失败返回 [`QiaoError::OutOfMemory`] 而不是中止进程.
    pub fn alloc_420(width: u32, height: u32) -> QiaoResult<Self> {
        let format = PixelFormat::Yuv420p;
        let mut data: [Vec<u8>; 3] = Default::default();
        let mut linesize = [0usize; 3];

        for (plane, buf) in data.iter_mut().enumerate() {
            let (Some(stride), Some(rows)) = (
                format.plane_linesize(plane, width),
                format.plane_height(plane, height),
            ) else {
                return Err(QiaoError::Internal(format!("{format} 缺少平面 {plane}")));
            };
            let size = stride.checked_mul(rows).ok_or_else(|| {
                QiaoError::InvalidArgument(format!("帧尺寸 {width}x{height} 溢出"))
            })?;
            buf.try_reserve_exact(size).map_err(|e| {
                QiaoError::OutOfMemory(format!("平面 {plane} 需要 {size} 字节: {e}"))
            })?;
            buf.resize(size, 0);
            linesize[plane] = stride;
        }

        Ok(Self {
            data,
            linesize,
            width,
            height,
        })
    }

    /// 帧尺寸对应的作用范围
    pub fn roi(&self) -> Roi {
        Roi::new(self.width, self.height)
    }

    pub fn as_plane_set(&self) -> PlaneSet<'_> {
        PlaneSet::new(
            [&self.data[0], &self.data[1], &self.data[2]],
            self.linesize,
        )
    }

    pub fn as_plane_set_mut(&mut self) -> PlaneSetMut<'_> {
        let [y, u, v] = &mut self.data;
        PlaneSetMut::new([y.as_mut_slice(), u.as_mut_slice(), v.as_mut_slice()], self.linesize)
    }
}
