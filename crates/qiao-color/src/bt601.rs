//! BT.601 定点转换系数.
//!
//! ```text
//! | R |    ( | 256     0    403 | |    Y    | )
//! | G | = (  | 256   -48   -120 | | U - 128 |  ) >> 8
//! | B |    ( | 256   475      0 | | V - 128 | )
//!
//! | Y |    ( |  54   183     18 | | R | )         |  0  |
//! | U | = (  | -29   -99    128 | | G |  ) >> 8 + | 128 |
//! | V |    ( | 128  -116    -12 | | B | )         | 128 |
//! ```
//!
//! 系数必须逐位一致, 否则与对端编解码结果不能互通.

// ============================================================
// YUV → RGB
// ============================================================

const V_TO_R: i32 = 403;
const U_TO_G: i32 = 48;
const V_TO_G: i32 = 120;
const U_TO_B: i32 = 475;

// ============================================================
// RGB → YUV
// ============================================================

const Y_R: i32 = 54;
const Y_G: i32 = 183;
const Y_B: i32 = 18;

const U_R: i32 = -29;
const U_G: i32 = -99;
const U_B: i32 = 128;

const V_R: i32 = 128;
const V_G: i32 = -116;
const V_B: i32 = -12;

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// 一对 U/V 样本的预计算色度项, 2x2 块内的 4 个亮度样本共享
#[derive(Debug, Clone, Copy)]
pub struct ChromaTerms {
    up48: i32,
    up475: i32,
    vp403: i32,
    vp120: i32,
}

impl ChromaTerms {
    #[inline]
    pub fn new(u: u8, v: u8) -> Self {
        let up = i32::from(u) - 128;
        let vp = i32::from(v) - 128;
        Self {
            up48: U_TO_G * up,
            up475: U_TO_B * up,
            vp403: V_TO_R * vp,
            vp120: V_TO_G * vp,
        }
    }

    /// 与一个亮度样本合成 BGRA 像素, alpha 恒为 0xFF
    #[inline]
    pub fn to_bgra(&self, y: u8) -> [u8; 4] {
        let yp = i32::from(y) << 8;
        let r = (yp + self.vp403) >> 8;
        let g = (yp - self.up48 - self.vp120) >> 8;
        let b = (yp + self.up475) >> 8;
        [clamp_u8(b), clamp_u8(g), clamp_u8(r), 0xFF]
    }
}

/// 单个像素的亮度
#[inline]
pub fn luma(r: i32, g: i32, b: i32) -> u8 {
    clamp_u8((Y_R * r + Y_G * g + Y_B * b) >> 8)
}

/// 由 (平均后的) RGB 计算 U, V
#[inline]
pub fn chroma(r: i32, g: i32, b: i32) -> (u8, u8) {
    let u = ((U_R * r + U_G * g + U_B * b) >> 8) + 128;
    let v = ((V_R * r + V_G * g + V_B * b) >> 8) + 128;
    (clamp_u8(u), clamp_u8(v))
}
