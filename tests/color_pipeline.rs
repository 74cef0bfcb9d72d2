//! 颜色转换集成测试

use qiao::color::{PlaneSet, PlaneSetMut, rgb_to_yuv420, yuv420_to_rgb};
use qiao::core::Roi;

/// 16x16 棋盘格 (4 像素格), 两种颜色交替, BGRA 排列
fn checkerboard(a: [u8; 3], b: [u8; 3]) -> Vec<u8> {
    let mut bgra = Vec::with_capacity(16 * 16 * 4);
    for y in 0..16 {
        for x in 0..16 {
            let [r, g, bl] = if (x / 4 + y / 4) % 2 == 0 { a } else { b };
            bgra.extend_from_slice(&[bl, g, r, 0xFF]);
        }
    }
    bgra
}

#[test]
fn test_棋盘格往返误差() {
    let a = [200, 100, 50];
    let b = [120, 120, 140];
    let src = checkerboard(a, b);

    let mut y = vec![0u8; 16 * 16];
    let mut u = vec![0u8; 8 * 8];
    let mut v = vec![0u8; 8 * 8];
    let roi = Roi::new(16, 16);
    {
        let mut planes = PlaneSetMut::new(
            [y.as_mut_slice(), u.as_mut_slice(), v.as_mut_slice()],
            [16, 8, 8],
        );
        rgb_to_yuv420(&src, 64, &mut planes, roi).unwrap();
    }

    let mut out = vec![0u8; 16 * 16 * 4];
    let planes = PlaneSet::new([&y[..], &u[..], &v[..]], [16, 8, 8]);
    yuv420_to_rgb(&planes, &mut out, 64, roi).unwrap();

    for (i, (s, d)) in src.chunks(4).zip(out.chunks(4)).enumerate() {
        for c in 0..3 {
            let diff = (i32::from(s[c]) - i32::from(d[c])).abs();
            assert!(diff <= 2, "像素 {i} 通道 {c}: {} vs {}", s[c], d[c]);
        }
        assert_eq!(d[3], 0xFF);
    }
}

#[test]
fn test_奇数尺寸均匀白色() {
    let (w, h) = (7usize, 5usize);
    let y = vec![255u8; w * h];
    let u = vec![128u8; 4 * 3];
    let v = vec![128u8; 4 * 3];
    let planes = PlaneSet::new([&y[..], &u[..], &v[..]], [w, 4, 4]);

    // 目标每行多留 1 个像素作为哨兵
    let step = (w + 1) * 4;
    let mut dst = vec![0u8; step * h];
    yuv420_to_rgb(&planes, &mut dst, step, Roi::new(w as u32, h as u32)).unwrap();

    for row in dst.chunks(step) {
        assert!(row[..w * 4].iter().all(|&b| b == 255));
        assert_eq!(&row[w * 4..], &[0, 0, 0, 0], "哨兵像素不应被写入");
    }
}

#[test]
fn test_单像素棋盘格色度损失() {
    // 每个 2x2 块内两种颜色各占一半, 色度被平均, 亮度逐像素保留
    let (w, h) = (8usize, 8usize);
    let a = [200, 60, 60];
    let b = [60, 60, 200];
    let mut src = Vec::with_capacity(w * h * 4);
    for y in 0..h {
        for x in 0..w {
            let [r, g, bl] = if (x + y) % 2 == 0 { a } else { b };
            src.extend_from_slice(&[bl, g, r, 0xFF]);
        }
    }

    let mut py = vec![0u8; w * h];
    let mut pu = vec![0u8; 4 * 4];
    let mut pv = vec![0u8; 4 * 4];
    let roi = Roi::new(w as u32, h as u32);
    {
        let mut planes = PlaneSetMut::new(
            [py.as_mut_slice(), pu.as_mut_slice(), pv.as_mut_slice()],
            [w, 4, 4],
        );
        rgb_to_yuv420(&src, w * 4, &mut planes, roi).unwrap();
    }
    assert!(pu.iter().all(|&u| u == pu[0]), "所有块的色度应相同");
    assert!(pv.iter().all(|&v| v == pv[0]));

    let mut out = vec![0u8; w * h * 4];
    let planes = PlaneSet::new([&py[..], &pu[..], &pv[..]], [w, 4, 4]);
    yuv420_to_rgb(&planes, &mut out, w * 4, roi).unwrap();

    let luma = |p: &[u8]| (54 * i32::from(p[2]) + 183 * i32::from(p[1]) + 18 * i32::from(p[0])) >> 8;
    let mut max_err = 0;
    for (i, (s, d)) in src.chunks(4).zip(out.chunks(4)).enumerate() {
        let diff = (luma(s) - luma(d)).abs();
        assert!(diff <= 3, "像素 {i} 亮度偏差 {diff}");
        for c in 0..3 {
            max_err = max_err.max((i32::from(s[c]) - i32::from(d[c])).abs());
        }
    }
    assert!(max_err > 40, "色度子采样应造成明显误差, 实际 {max_err}");

    // 同一块内两个像素只差亮度
    let (pa, pb) = (&out[0..4], &out[4..8]);
    let dy = luma(pa) - luma(pb);
    for c in 0..3 {
        let dc = i32::from(pa[c]) - i32::from(pb[c]);
        assert!((dc - dy).abs() <= 1, "通道 {c}: {dc} vs 亮度差 {dy}");
    }
}
