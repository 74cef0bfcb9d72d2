//! YUV ↔ BGRA 转换原语.
//!
//! 每个函数都在作用范围 ([`Roi`]) 内工作, 平面长度与行跨度在转换前统一校验.
//! 作用范围可以是奇数尺寸: 4:2:0 转换按 2x2 块向上取整处理, 但块内落在
//! 作用范围之外的像素既不读取亮度也不写入目标.

use log::trace;
use qiao_core::{QiaoError, QiaoResult, Roi};

use crate::bt601::{self, ChromaTerms};
use crate::planes::{PlaneSet, PlaneSetMut, check_plane};

const BGRA_BPP: usize = 4;

// ============================================================
// YUV420 → BGRA
// ============================================================

/// YUV 4:2:0 → BGRA
///
/// 每个 2x2 亮度块共享一对 U/V 样本. 输出按 B, G, R, 0xFF 交错排列.
pub fn yuv420_to_rgb(
    src: &PlaneSet,
    dst: &mut [u8],
    dst_stride: usize,
    roi: Roi,
) -> QiaoResult<()> {
    if roi.is_empty() {
        return Ok(());
    }
    let w = roi.width as usize;
    let h = roi.height as usize;
    let chroma = roi.chroma_420();
    let (cw, ch) = (chroma.width as usize, chroma.height as usize);

    check_plane("yuv420 Y", src.planes[0].len(), src.strides[0], w, h)?;
    check_plane("yuv420 U", src.planes[1].len(), src.strides[1], cw, ch)?;
    check_plane("yuv420 V", src.planes[2].len(), src.strides[2], cw, ch)?;
    check_plane("bgra 目标", dst.len(), dst_stride, w * BGRA_BPP, h)?;

    trace!("yuv420_to_rgb: {}x{}", w, h);

    let [py, pu, pv] = src.planes;
    let [sy, su, sv] = src.strides;

    for cy in 0..ch {
        for cx in 0..cw {
            let terms = ChromaTerms::new(pu[cy * su + cx], pv[cy * sv + cx]);
            for y in (cy * 2)..(cy * 2 + 2).min(h) {
                for x in (cx * 2)..(cx * 2 + 2).min(w) {
                    let off = y * dst_stride + x * BGRA_BPP;
                    dst[off..off + BGRA_BPP].copy_from_slice(&terms.to_bgra(py[y * sy + x]));
                }
            }
        }
    }
    Ok(())
}

// ============================================================
// YUV444 → BGRA
// ============================================================

/// YUV 4:4:4 → BGRA
///
/// 每个亮度样本对应一对 U/V 样本. 作用范围向下取整到偶数尺寸.
pub fn yuv444_to_rgb(
    src: &PlaneSet,
    dst: &mut [u8],
    dst_stride: usize,
    roi: Roi,
) -> QiaoResult<()> {
    let roi = roi.round_down_even();
    if roi.is_empty() {
        return Ok(());
    }
    let w = roi.width as usize;
    let h = roi.height as usize;

    for (i, name) in ["yuv444 Y", "yuv444 U", "yuv444 V"].into_iter().enumerate() {
        check_plane(name, src.planes[i].len(), src.strides[i], w, h)?;
    }
    check_plane("bgra 目标", dst.len(), dst_stride, w * BGRA_BPP, h)?;

    let [py, pu, pv] = src.planes;
    let [sy, su, sv] = src.strides;

    for y in 0..h {
        let row = &mut dst[y * dst_stride..y * dst_stride + w * BGRA_BPP];
        for (x, px) in row.chunks_exact_mut(BGRA_BPP).enumerate() {
            let terms = ChromaTerms::new(pu[y * su + x], pv[y * sv + x]);
            px.copy_from_slice(&terms.to_bgra(py[y * sy + x]));
        }
    }
    Ok(())
}

// ============================================================
// BGRA → YUV420
// ============================================================

/// BGRA → YUV 4:2:0
///
/// 每个 2x2 块逐像素计算亮度, 色度取块内实际采样像素 (1, 2 或 4 个) 的平均值.
/// 源像素的 alpha 通道被忽略.
pub fn rgb_to_yuv420(
    src: &[u8],
    src_stride: usize,
    dst: &mut PlaneSetMut,
    roi: Roi,
) -> QiaoResult<()> {
    if roi.is_empty() {
        return Ok(());
    }
    let w = roi.width as usize;
    let h = roi.height as usize;
    let chroma = roi.chroma_420();
    let (cw, ch) = (chroma.width as usize, chroma.height as usize);

    check_plane("bgra 源", src.len(), src_stride, w * BGRA_BPP, h)?;
    check_plane("yuv420 Y", dst.planes[0].len(), dst.strides[0], w, h)?;
    check_plane("yuv420 U", dst.planes[1].len(), dst.strides[1], cw, ch)?;
    check_plane("yuv420 V", dst.planes[2].len(), dst.strides[2], cw, ch)?;

    let [sy, su, sv] = dst.strides;
    let [py, pu, pv] = &mut dst.planes;

    for cy in 0..ch {
        for cx in 0..cw {
            let (mut rs, mut gs, mut bs, mut n) = (0i32, 0i32, 0i32, 0i32);
            for y in (cy * 2)..(cy * 2 + 2).min(h) {
                for x in (cx * 2)..(cx * 2 + 2).min(w) {
                    let off = y * src_stride + x * BGRA_BPP;
                    let b = i32::from(src[off]);
                    let g = i32::from(src[off + 1]);
                    let r = i32::from(src[off + 2]);
                    py[y * sy + x] = bt601::luma(r, g, b);
                    rs += r;
                    gs += g;
                    bs += b;
                    n += 1;
                }
            }
            let (u, v) = bt601::chroma(rs / n, gs / n, bs / n);
            pu[cy * su + cx] = u;
            pv[cy * sv + cx] = v;
        }
    }
    Ok(())
}

// ============================================================
// YUV420 主信号 + 辅助信号 → YUV444
// ============================================================

/// 由 4:2:0 主信号与辅助信号重建 4:4:4 平面
///
/// 作用范围向下取整到偶数尺寸 `w x h`. 交错方式:
/// - 主信号: Y 原样复制; U/V 写入偶数行偶数列.
/// - 辅助信号 Y 平面: 前 `h/2` 行依次写入 U 的奇数行, 后 `h/2` 行写入 V 的奇数行.
/// - 辅助信号 U/V: 写入对应平面偶数行的奇数列.
///
/// 两路信号可以只提供其中一路, 只写入该路对应的位置; 都不提供时返回错误.
pub fn yuv420_combine_to_yuv444(
    main: Option<&PlaneSet>,
    aux: Option<&PlaneSet>,
    dst: &mut PlaneSetMut,
    roi: Roi,
) -> QiaoResult<()> {
    if main.is_none() && aux.is_none() {
        return Err(QiaoError::InvalidArgument(
            "yuv420_combine_to_yuv444: 主信号与辅助信号都不存在".into(),
        ));
    }
    let roi = roi.round_down_even();
    if roi.is_empty() {
        return Ok(());
    }
    let w = roi.width as usize;
    let h = roi.height as usize;
    let (hw, hh) = (w / 2, h / 2);

    for (i, name) in ["yuv444 Y", "yuv444 U", "yuv444 V"].into_iter().enumerate() {
        check_plane(name, dst.planes[i].len(), dst.strides[i], w, h)?;
    }
    for (set, what) in [(main, "主信号"), (aux, "辅助信号")] {
        if let Some(set) = set {
            check_plane(what, set.planes[0].len(), set.strides[0], w, h)?;
            check_plane(what, set.planes[1].len(), set.strides[1], hw, hh)?;
            check_plane(what, set.planes[2].len(), set.strides[2], hw, hh)?;
        }
    }

    let [dy, du, dv] = dst.strides;
    let [out_y, out_u, out_v] = &mut dst.planes;

    if let Some(main) = main {
        let [my, mu, mv] = main.planes;
        let [sy, su, sv] = main.strides;
        for y in 0..h {
            out_y[y * dy..y * dy + w].copy_from_slice(&my[y * sy..y * sy + w]);
        }
        for y in 0..hh {
            for x in 0..hw {
                out_u[2 * y * du + 2 * x] = mu[y * su + x];
                out_v[2 * y * dv + 2 * x] = mv[y * sv + x];
            }
        }
    }

    if let Some(aux) = aux {
        let [ay, au, av] = aux.planes;
        let [sy, su, sv] = aux.strides;
        for y in 0..hh {
            let row = (2 * y + 1) * du;
            out_u[row..row + w].copy_from_slice(&ay[y * sy..y * sy + w]);
        }
        for y in hh..h {
            let row = (2 * (y - hh) + 1) * dv;
            out_v[row..row + w].copy_from_slice(&ay[y * sy..y * sy + w]);
        }
        for y in 0..hh {
            for x in 0..hw {
                out_u[2 * y * du + 2 * x + 1] = au[y * su + x];
                out_v[2 * y * dv + 2 * x + 1] = av[y * sv + x];
            }
        }
    }
    Ok(())
}
