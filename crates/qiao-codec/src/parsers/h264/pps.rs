//! H.264 PPS (Picture Parameter Set) 解析器.
//!
//! 与 SPS 相同, 解析是宽松的且永不失败. `num_slice_groups_minus1 > 0` 时按
//! `slice_group_map_type` (0, 2, 3/4/5, 6) 消耗对应的语法元素, 各循环以剩余位数为界.

use qiao_core::BitCursor;

use super::sps::skip_scaling_list;

/// PPS 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pps {
    /// pic_parameter_set_id
    pub pps_id: u32,
    /// 引用的 seq_parameter_set_id
    pub sps_id: u32,
    /// 熵编码模式 (false=CAVLC, true=CABAC)
    pub entropy_coding_mode_flag: bool,
    pub bottom_field_pic_order_in_frame_present_flag: bool,

    pub num_slice_groups_minus1: u32,
    pub slice_group_map_type: u32,
    /// 仅 map_type == 0
    pub run_length_minus1: Vec<u32>,
    /// 仅 map_type == 2, (top_left, bottom_right)
    pub slice_group_rects: Vec<(u32, u32)>,
    /// 仅 map_type == 3/4/5
    pub slice_group_change_direction_flag: bool,
    pub slice_group_change_rate_minus1: u32,
    /// 仅 map_type == 6
    pub pic_size_in_map_units_minus1: u32,
    pub slice_group_id: Vec<u32>,

    pub num_ref_idx_l0_default_active_minus1: u32,
    pub num_ref_idx_l1_default_active_minus1: u32,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_idc: u8,
    pub pic_init_qp_minus26: i32,
    pub pic_init_qs_minus26: i32,
    pub chroma_qp_index_offset: i32,
    pub deblocking_filter_control_present_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub redundant_pic_cnt_present_flag: bool,

    /// 以下字段仅在 more_rbsp_data() 时出现
    pub transform_8x8_mode_flag: bool,
    pub pic_scaling_matrix_present_flag: bool,
    /// 缺省时等于 chroma_qp_index_offset
    pub second_chroma_qp_index_offset: i32,
}

impl Pps {
    /// 是否使用 CABAC
    pub fn is_cabac(&self) -> bool {
        self.entropy_coding_mode_flag
    }

    /// 是否使用多个切片组 (FMO)
    pub fn has_slice_groups(&self) -> bool {
        self.num_slice_groups_minus1 > 0
    }
}

/// 解析 PPS RBSP (不含 NAL 头部, 已去除防竞争字节)
pub fn parse_pps(rbsp: &[u8]) -> Pps {
    let mut bc = BitCursor::new(rbsp);
    let mut pps = Pps::default();

    pps.pps_id = bc.read_ue();
    pps.sps_id = bc.read_ue();
    pps.entropy_coding_mode_flag = bc.read_flag();
    pps.bottom_field_pic_order_in_frame_present_flag = bc.read_flag();
    pps.num_slice_groups_minus1 = bc.read_ue();

    if pps.num_slice_groups_minus1 > 0 {
        parse_slice_groups(&mut bc, &mut pps);
    }

    pps.num_ref_idx_l0_default_active_minus1 = bc.read_ue();
    pps.num_ref_idx_l1_default_active_minus1 = bc.read_ue();
    pps.weighted_pred_flag = bc.read_flag();
    pps.weighted_bipred_idc = bc.read_bits_lenient(2) as u8;
    pps.pic_init_qp_minus26 = bc.read_se();
    pps.pic_init_qs_minus26 = bc.read_se();
    pps.chroma_qp_index_offset = bc.read_se();
    pps.deblocking_filter_control_present_flag = bc.read_flag();
    pps.constrained_intra_pred_flag = bc.read_flag();
    pps.redundant_pic_cnt_present_flag = bc.read_flag();

    pps.second_chroma_qp_index_offset = pps.chroma_qp_index_offset;
    if bc.more_rbsp_data() {
        pps.transform_8x8_mode_flag = bc.read_flag();
        pps.pic_scaling_matrix_present_flag = bc.read_flag();
        if pps.pic_scaling_matrix_present_flag {
            // 不知道 SPS 的 chroma_format_idc, 按 4:2:0 的 2 个 8x8 列表处理
            let count = 6 + if pps.transform_8x8_mode_flag { 2 } else { 0 };
            for i in 0..count {
                // 与 SPS 相同, 列表存在时按标准语法完整跳过
                if bc.read_flag() {
                    skip_scaling_list(&mut bc, if i < 6 { 16 } else { 64 });
                }
            }
        }
        pps.second_chroma_qp_index_offset = bc.read_se();
    }

    pps
}

fn parse_slice_groups(bc: &mut BitCursor, pps: &mut Pps) {
    pps.slice_group_map_type = bc.read_ue();
    let groups = pps.num_slice_groups_minus1;

    match pps.slice_group_map_type {
        0 => {
            for _ in 0..=groups {
                if bc.is_exhausted() {
                    break;
                }
                pps.run_length_minus1.push(bc.read_ue());
            }
        }
        2 => {
            for _ in 0..groups {
                if bc.is_exhausted() {
                    break;
                }
                let top_left = bc.read_ue();
                let bottom_right = bc.read_ue();
                pps.slice_group_rects.push((top_left, bottom_right));
            }
        }
        3..=5 => {
            pps.slice_group_change_direction_flag = bc.read_flag();
            pps.slice_group_change_rate_minus1 = bc.read_ue();
        }
        6 => {
            pps.pic_size_in_map_units_minus1 = bc.read_ue();
            // slice_group_id 为 u(v), 位宽 Ceil(Log2(num_slice_groups_minus1 + 1))
            let bits = u64::from(groups).saturating_add(1).next_power_of_two().trailing_zeros();
            for _ in 0..=u64::from(pps.pic_size_in_map_units_minus1) {
                if bc.bits_remaining() < bits as usize {
                    break;
                }
                pps.slice_group_id.push(bc.read_bits_lenient(bits));
            }
        }
        _ => {}
    }
}
