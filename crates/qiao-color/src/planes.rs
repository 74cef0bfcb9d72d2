//! 带行跨度的平面组.

use qiao_core::{QiaoError, QiaoResult};

/// 只读平面组 (Y, U, V)
#[derive(Debug, Clone, Copy)]
pub struct PlaneSet<'a> {
    /// 各平面数据
    pub planes: [&'a [u8]; 3],
    /// 各平面行字节数
    pub strides: [usize; 3],
}

impl<'a> PlaneSet<'a> {
    pub fn new(planes: [&'a [u8]; 3], strides: [usize; 3]) -> Self {
        Self { planes, strides }
    }

    /// 从平面左上角偏移 (亮度坐标) 处开始的子平面组, 色度偏移按 4:2:0 减半
    ///
    /// 偏移超出平面长度时返回错误.
    pub fn offset_420(&self, left: usize, top: usize) -> QiaoResult<PlaneSet<'a>> {
        let offsets = [
            top * self.strides[0] + left,
            (top / 2) * self.strides[1] + left / 2,
            (top / 2) * self.strides[2] + left / 2,
        ];
        let mut planes = self.planes;
        for (i, plane) in planes.iter_mut().enumerate() {
            *plane = plane.get(offsets[i]..).ok_or_else(|| {
                QiaoError::InvalidArgument(format!(
                    "平面 {} 偏移 {} 超出长度 {}",
                    i,
                    offsets[i],
                    plane.len()
                ))
            })?;
        }
        Ok(PlaneSet::new(planes, self.strides))
    }
}

/// 可写平面组 (Y, U, V)
#[derive(Debug)]
pub struct PlaneSetMut<'a> {
    /// 各平面数据
    pub planes: [&'a mut [u8]; 3],
    /// 各平面行字节数
    pub strides: [usize; 3],
}

impl<'a> PlaneSetMut<'a> {
    pub fn new(planes: [&'a mut [u8]; 3], strides: [usize; 3]) -> Self {
        Self { planes, strides }
    }

    /// 以只读方式借用
    pub fn as_plane_set(&self) -> PlaneSet<'_> {
        PlaneSet::new(
            [&*self.planes[0], &*self.planes[1], &*self.planes[2]],
            self.strides,
        )
    }
}

/// 校验平面可容纳 `rows` 行, 每行 `row_bytes` 字节
pub(crate) fn check_plane(
    what: &str,
    len: usize,
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> QiaoResult<()> {
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }
    if stride < row_bytes {
        return Err(QiaoError::InvalidArgument(format!(
            "{}: 行跨度 {} 小于行宽 {}",
            what, stride, row_bytes
        )));
    }
    let need = (rows - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or_else(|| QiaoError::InvalidArgument(format!("{}: 平面尺寸溢出", what)))?;
    if len < need {
        return Err(QiaoError::InvalidArgument(format!(
            "{}: 需要 {} 字节, 实际 {} 字节",
            what, need, len
        )));
    }
    Ok(())
}
