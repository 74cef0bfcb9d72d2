//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! SPS 包含编码视频序列的全局参数:
//! - Profile / Level 与约束标志
//! - 图像尺寸 (以宏块/映射单元为单位, 需要 cropping 调整)
//! - 色度格式与位深
//! - 帧号与图像顺序计数 (POC) 参数
//! - VUI (宽高比, 视频信号类型, 时序信息)
//!
//! 解析是宽松的: 参数集在此只用于诊断, 任何字段值都不会导致失败,
//! 码流提前结束时剩余字段按 0 处理. 所有读取都经过 [`BitCursor`] 的边界检查.

use qiao_core::BitCursor;

/// SPS 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sps {
    /// profile_idc (66=Baseline, 77=Main, 100=High ...)
    pub profile_idc: u8,
    /// constraint_set0..5 标志 (高位在前, 共 6 位)
    pub constraint_set_flags: u8,
    /// reserved_zero_2bits
    pub reserved_zero_2bits: u8,
    /// level_idc (30=3.0, 41=4.1 ...)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,

    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4), 非 High 系列默认 1
    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub qpprime_y_zero_transform_bypass_flag: bool,
    pub seq_scaling_matrix_present_flag: bool,
    /// 各 seq_scaling_list_present_flag (列表内容被跳过)
    pub scaling_lists_present: Vec<bool>,

    pub log2_max_frame_num_minus4: u32,
    /// 图像顺序计数类型 (0, 1, 2)
    pub pic_order_cnt_type: u32,
    /// 仅 pic_order_cnt_type == 0
    pub log2_max_pic_order_cnt_lsb_minus4: u32,
    /// 以下仅 pic_order_cnt_type == 1
    pub delta_pic_order_always_zero_flag: bool,
    pub offset_for_non_ref_pic: i32,
    pub offset_for_top_to_bottom_field: i32,
    pub num_ref_frames_in_pic_order_cnt_cycle: u32,
    pub offset_for_ref_frame: Vec<i32>,

    pub max_num_ref_frames: u32,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub direct_8x8_inference_flag: bool,

    pub frame_cropping_flag: bool,
    pub frame_crop_left_offset: u32,
    pub frame_crop_right_offset: u32,
    pub frame_crop_top_offset: u32,
    pub frame_crop_bottom_offset: u32,

    pub vui_parameters_present_flag: bool,
    /// VUI 参数 (部分)
    pub vui: Option<Vui>,
}

/// VUI 参数 (部分解析)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vui {
    /// 像素宽高比 (宽, 高), 未指定时为 None
    pub sample_aspect_ratio: Option<(u32, u32)>,
    pub overscan_appropriate: Option<bool>,
    pub video_format: Option<u8>,
    pub video_full_range: bool,
    /// (colour_primaries, transfer_characteristics, matrix_coefficients)
    pub colour_description: Option<(u8, u8, u8)>,
    /// (chroma_sample_loc_type_top_field, chroma_sample_loc_type_bottom_field)
    pub chroma_loc: Option<(u32, u32)>,
    /// (num_units_in_tick, time_scale, fixed_frame_rate_flag)
    pub timing: Option<(u32, u32, bool)>,
}

impl Vui {
    /// 帧率 (time_scale / (2 * num_units_in_tick)), 参数无效时返回 None
    pub fn frame_rate(&self) -> Option<f64> {
        let (num_units, time_scale, _) = self.timing?;
        if num_units == 0 || time_scale == 0 {
            return None;
        }
        Some(f64::from(time_scale) / (2.0 * f64::from(num_units)))
    }
}

impl Sps {
    /// 是否为 High Profile 系列 (携带色度格式等扩展字段)
    pub fn is_high_profile(&self) -> bool {
        is_high_profile(self.profile_idc)
    }

    /// 解码宽度 (像素, 未裁剪)
    pub fn coded_width(&self) -> Option<u32> {
        self.pic_width_in_mbs_minus1.checked_add(1)?.checked_mul(16)
    }

    /// 解码高度 (像素, 未裁剪)
    pub fn coded_height(&self) -> Option<u32> {
        let map_units = self.pic_height_in_map_units_minus1.checked_add(1)?;
        let field_mult = if self.frame_mbs_only_flag { 1 } else { 2 };
        map_units.checked_mul(field_mult)?.checked_mul(16)
    }

    /// 显示宽度 (像素, 已应用 cropping), 溢出或裁剪超出尺寸时返回 None
    pub fn frame_width(&self) -> Option<u32> {
        let (crop_x, _) = self.cropping_unit();
        let crop = self
            .frame_crop_left_offset
            .checked_add(self.frame_crop_right_offset)?
            .checked_mul(crop_x)?;
        self.coded_width()?.checked_sub(crop).filter(|w| *w > 0)
    }

    /// 显示高度 (像素, 已应用 cropping), 溢出或裁剪超出尺寸时返回 None
    pub fn frame_height(&self) -> Option<u32> {
        let (_, crop_y) = self.cropping_unit();
        let crop = self
            .frame_crop_top_offset
            .checked_add(self.frame_crop_bottom_offset)?
            .checked_mul(crop_y)?;
        self.coded_height()?.checked_sub(crop).filter(|h| *h > 0)
    }

    /// cropping 单位 (CropUnitX, CropUnitY)
    fn cropping_unit(&self) -> (u32, u32) {
        let chroma = if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        };
        let sub_width = match chroma {
            1 | 2 => 2,
            _ => 1,
        };
        let sub_height = match chroma {
            1 => 2,
            _ => 1,
        };
        let height_mult = if self.frame_mbs_only_flag { 1 } else { 2 };
        (sub_width, sub_height * height_mult)
    }
}

/// 解析 SPS RBSP (不含 NAL 头部, 已去除防竞争字节)
///
/// 永不失败: 畸形输入可能得到无意义的字段值, 但不会读出缓冲区之外.
pub fn parse_sps(rbsp: &[u8]) -> Sps {
    let mut bc = BitCursor::new(rbsp);
    let mut sps = Sps {
        chroma_format_idc: 1,
        ..Sps::default()
    };

    sps.profile_idc = bc.read_bits_lenient(8) as u8;
    sps.constraint_set_flags = bc.read_bits_lenient(6) as u8;
    sps.reserved_zero_2bits = bc.read_bits_lenient(2) as u8;
    sps.level_idc = bc.read_bits_lenient(8) as u8;
    sps.sps_id = bc.read_ue();

    if is_high_profile(sps.profile_idc) {
        sps.chroma_format_idc = bc.read_ue();
        if sps.chroma_format_idc == 3 {
            sps.separate_colour_plane_flag = bc.read_flag();
        }
        sps.bit_depth_luma_minus8 = bc.read_ue();
        sps.bit_depth_chroma_minus8 = bc.read_ue();
        sps.qpprime_y_zero_transform_bypass_flag = bc.read_flag();
        sps.seq_scaling_matrix_present_flag = bc.read_flag();

        if sps.seq_scaling_matrix_present_flag {
            let count = if sps.chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                let present = bc.read_flag();
                // 按标准语法消耗完整的 delta_scale 列表, 后续字段才能对齐
                if present {
                    skip_scaling_list(&mut bc, if i < 6 { 16 } else { 64 });
                }
                sps.scaling_lists_present.push(present);
            }
        }
    }

    sps.log2_max_frame_num_minus4 = bc.read_ue();
    sps.pic_order_cnt_type = bc.read_ue();

    match sps.pic_order_cnt_type {
        0 => {
            sps.log2_max_pic_order_cnt_lsb_minus4 = bc.read_ue();
        }
        1 => {
            sps.delta_pic_order_always_zero_flag = bc.read_flag();
            sps.offset_for_non_ref_pic = bc.read_se();
            sps.offset_for_top_to_bottom_field = bc.read_se();
            sps.num_ref_frames_in_pic_order_cnt_cycle = bc.read_ue();
            // 每个 se(v) 至少占 1 位, 循环次数以剩余位数为界
            for _ in 0..sps.num_ref_frames_in_pic_order_cnt_cycle {
                if bc.is_exhausted() {
                    break;
                }
                sps.offset_for_ref_frame.push(bc.read_se());
            }
        }
        _ => {}
    }

    sps.max_num_ref_frames = bc.read_ue();
    sps.gaps_in_frame_num_value_allowed_flag = bc.read_flag();
    sps.pic_width_in_mbs_minus1 = bc.read_ue();
    sps.pic_height_in_map_units_minus1 = bc.read_ue();
    sps.frame_mbs_only_flag = bc.read_flag();
    if !sps.frame_mbs_only_flag {
        sps.mb_adaptive_frame_field_flag = bc.read_flag();
    }
    sps.direct_8x8_inference_flag = bc.read_flag();

    sps.frame_cropping_flag = bc.read_flag();
    if sps.frame_cropping_flag {
        sps.frame_crop_left_offset = bc.read_ue();
        sps.frame_crop_right_offset = bc.read_ue();
        sps.frame_crop_top_offset = bc.read_ue();
        sps.frame_crop_bottom_offset = bc.read_ue();
    }

    sps.vui_parameters_present_flag = bc.read_flag();
    if sps.vui_parameters_present_flag {
        sps.vui = Some(parse_vui(&mut bc));
    }

    sps
}

// ============================================================
// 辅助函数
// ============================================================

/// 是否为 High Profile 系列
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128
    )
}

/// 跳过一个 scaling_list() 语法结构, 只消耗 delta_scale, 不生成矩阵
pub(crate) fn skip_scaling_list(bc: &mut BitCursor, size: usize) {
    let mut last_scale = 8i64;
    let mut next_scale = 8i64;
    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = i64::from(bc.read_se());
            next_scale = (last_scale + delta_scale).rem_euclid(256);
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
        if bc.is_exhausted() {
            break;
        }
    }
}

/// 预定义的 SAR 表 (ITU-T H.264 表 E-1)
const SAR_TABLE: [(u32, u32); 17] = [
    (0, 1),    // 0: 未指定
    (1, 1),    // 1: 1:1
    (12, 11),  // 2: 12:11
    (10, 11),  // 3: 10:11
    (16, 11),  // 4: 16:11
    (40, 33),  // 5: 40:33
    (24, 11),  // 6: 24:11
    (20, 11),  // 7: 20:11
    (32, 11),  // 8: 32:11
    (80, 33),  // 9: 80:33
    (18, 11),  // 10: 18:11
    (15, 11),  // 11: 15:11
    (64, 33),  // 12: 64:33
    (160, 99), // 13: 160:99
    (4, 3),    // 14: 4:3
    (3, 2),    // 15: 3:2
    (2, 1),    // 16: 2:1
];

const EXTENDED_SAR: u32 = 255;

/// 解析 VUI 参数 (到 timing_info 为止)
fn parse_vui(bc: &mut BitCursor) -> Vui {
    let mut vui = Vui::default();

    // aspect_ratio_info_present_flag
    if bc.read_flag() {
        let idc = bc.read_bits_lenient(8);
        vui.sample_aspect_ratio = if idc == EXTENDED_SAR {
            let w = bc.read_bits_lenient(16);
            let h = bc.read_bits_lenient(16);
            (w > 0 && h > 0).then_some((w, h))
        } else {
            SAR_TABLE
                .get(idc as usize)
                .copied()
                .filter(|&(w, _)| w > 0)
        };
    }

    // overscan_info_present_flag
    if bc.read_flag() {
        vui.overscan_appropriate = Some(bc.read_flag());
    }

    // video_signal_type_present_flag
    if bc.read_flag() {
        vui.video_format = Some(bc.read_bits_lenient(3) as u8);
        vui.video_full_range = bc.read_flag();
        // colour_description_present_flag
        if bc.read_flag() {
            let primaries = bc.read_bits_lenient(8) as u8;
            let transfer = bc.read_bits_lenient(8) as u8;
            let matrix = bc.read_bits_lenient(8) as u8;
            vui.colour_description = Some((primaries, transfer, matrix));
        }
    }

    // chroma_loc_info_present_flag
    if bc.read_flag() {
        let top = bc.read_ue();
        let bottom = bc.read_ue();
        vui.chroma_loc = Some((top, bottom));
    }

    // timing_info_present_flag
    if bc.read_flag() {
        let num_units = bc.read_bits_lenient(32);
        let time_scale = bc.read_bits_lenient(32);
        let fixed = bc.read_flag();
        vui.timing = Some((num_units, time_scale, fixed));
    }

    vui
}
