//! H.264 NAL (Network Abstraction Layer) 单元模型.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```
//!
//! 类型 14 (前缀 NAL) 与 20 (切片扩展) 后跟 3 字节扩展头, 首位 `svc_extension_flag`
//! 选择 SVC 或 MVC 布局. 扩展字段只做提取, 下游逻辑仅依赖 NAL 类型.

use std::fmt;

use qiao_core::{QiaoError, QiaoResult};

/// NAL 单元类型 (nal_unit_type, 0-31)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// 未指定 (0, 24-31)
    Unspecified(u8),
    /// 非 IDR 图像切片
    Slice,
    /// 数据分区 A
    SliceDpa,
    /// 数据分区 B
    SliceDpb,
    /// 数据分区 C
    SliceDpc,
    /// IDR 图像切片
    SliceIdr,
    /// 增补增强信息
    Sei,
    /// 序列参数集
    Sps,
    /// 图像参数集
    Pps,
    /// 访问单元分隔符
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// SPS 扩展
    SpsExtension,
    /// 前缀 NAL (SVC/MVC)
    Prefix,
    /// 子集序列参数集
    SubsetSps,
    /// 深度参数集
    DepthParameterSet,
    /// 保留 (17, 18, 22, 23)
    Reserved(u8),
    /// 辅助编码图像切片 (无分区)
    AuxiliarySlice,
    /// 切片扩展 (SVC/MVC)
    SliceExtension,
    /// 深度视图切片扩展
    SliceExtensionDepth,
}

impl NalUnitType {
    /// 从 NAL 类型编号创建, 只取低 5 位
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id & 0x1F {
            1 => Self::Slice,
            2 => Self::SliceDpa,
            3 => Self::SliceDpb,
            4 => Self::SliceDpc,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            14 => Self::Prefix,
            15 => Self::SubsetSps,
            16 => Self::DepthParameterSet,
            19 => Self::AuxiliarySlice,
            20 => Self::SliceExtension,
            21 => Self::SliceExtensionDepth,
            id @ (17 | 18 | 22 | 23) => Self::Reserved(id),
            id => Self::Unspecified(id),
        }
    }

    /// 获取类型编号
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Unspecified(id) | Self::Reserved(id) => *id,
            Self::Slice => 1,
            Self::SliceDpa => 2,
            Self::SliceDpb => 3,
            Self::SliceDpc => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::Prefix => 14,
            Self::SubsetSps => 15,
            Self::DepthParameterSet => 16,
            Self::AuxiliarySlice => 19,
            Self::SliceExtension => 20,
            Self::SliceExtensionDepth => 21,
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice | Self::SliceDpa | Self::SliceDpb | Self::SliceDpc | Self::SliceIdr
        )
    }

    /// 是否为关键帧 (IDR)
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }

    /// 是否携带 3 字节扩展头
    pub fn has_extension_header(&self) -> bool {
        matches!(self, Self::Prefix | Self::SliceExtension)
    }

    /// 类型的描述性名称 (用于诊断日志)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unspecified(0) => "Unspecified",
            Self::Slice => "Coded slice of a non-IDR picture",
            Self::SliceDpa => "Coded slice data partition A",
            Self::SliceDpb => "Coded slice data partition B",
            Self::SliceDpc => "Coded slice data partition C",
            Self::SliceIdr => "Coded slice of an IDR picture",
            Self::Sei => "Supplemental enhancement information (SEI)",
            Self::Sps => "Sequence parameter set",
            Self::Pps => "Picture parameter set",
            Self::Aud => "Access unit delimiter",
            Self::EndOfSequence => "End of sequence",
            Self::EndOfStream => "End of stream",
            Self::FillerData => "Filler data",
            Self::SpsExtension => "Sequence parameter set extension",
            Self::Prefix => "Prefix NAL unit",
            Self::SubsetSps => "Subset sequence parameter set",
            Self::DepthParameterSet => "Depth parameter set",
            Self::Reserved(17) => "Reserved17",
            Self::Reserved(18) => "Reserved18",
            Self::AuxiliarySlice => {
                "Coded slice of an auxiliary coded picture without partitioning"
            }
            Self::SliceExtension => "Coded slice extension",
            Self::SliceExtensionDepth => "Coded slice extension for depth view components",
            Self::Reserved(22) => "Reserved22",
            Self::Reserved(23) => "Reserved23",
            Self::Unspecified(24) => "Unspecified24",
            Self::Unspecified(25) => "Unspecified25",
            Self::Unspecified(26) => "Unspecified26",
            Self::Unspecified(27) => "Unspecified27",
            Self::Unspecified(28) => "Unspecified28",
            Self::Unspecified(29) => "Unspecified29",
            Self::Unspecified(30) => "Unspecified30",
            Self::Unspecified(31) => "Unspecified31",
            Self::Unspecified(_) | Self::Reserved(_) => "Unknown",
        }
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDpa => write!(f, "SliceDPA"),
            Self::SliceDpb => write!(f, "SliceDPB"),
            Self::SliceDpc => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::Aud => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::Prefix => write!(f, "Prefix"),
            Self::SubsetSps => write!(f, "SubsetSPS"),
            Self::DepthParameterSet => write!(f, "DPS"),
            Self::AuxiliarySlice => write!(f, "AuxSlice"),
            Self::SliceExtension => write!(f, "SliceExt"),
            Self::SliceExtensionDepth => write!(f, "SliceExtDepth"),
            Self::Reserved(id) => write!(f, "Reserved({id})"),
            Self::Unspecified(id) => write!(f, "Unspecified({id})"),
        }
    }
}

/// NAL 头部 (1 字节)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// nal_ref_idc (参考重要性, 0-3)
    pub ref_idc: u8,
    /// NAL 单元类型
    pub nal_type: NalUnitType,
}

impl NalHeader {
    /// 解析头部字节, `forbidden_zero_bit` 不为 0 时报错
    ///
    /// `offset` 仅用于错误信息, 表示头部字节在字节流中的位置.
    pub fn parse(byte: u8, offset: usize) -> QiaoResult<Self> {
        if byte & 0x80 != 0 {
            return Err(QiaoError::ForbiddenBit { offset });
        }
        Ok(Self {
            ref_idc: (byte >> 5) & 0x03,
            nal_type: NalUnitType::from_type_id(byte & 0x1F),
        })
    }
}

/// SVC 扩展头 (nal_unit_header_svc_extension)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvcExtension {
    pub idr_flag: bool,
    pub priority_id: u8,
    pub no_inter_layer_pred_flag: bool,
    pub dependency_id: u8,
    pub quality_id: u8,
    pub temporal_id: u8,
    pub use_ref_base_pic_flag: bool,
    pub discardable_flag: bool,
    pub output_flag: bool,
}

/// MVC 扩展头 (nal_unit_header_mvc_extension)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MvcExtension {
    pub non_idr_flag: bool,
    pub priority_id: u8,
    /// 10 位视图 ID
    pub view_id: u16,
    pub temporal_id: u8,
    pub anchor_pic_flag: bool,
    pub inter_view_flag: bool,
}

/// NAL 扩展头, SVC 与 MVC 互斥
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalExtension {
    Svc(SvcExtension),
    Mvc(MvcExtension),
}

impl NalExtension {
    /// 扩展头字节数
    pub const SIZE: usize = 3;

    /// 从 3 个字节解析, 首位 svc_extension_flag 选择布局
    pub fn parse(b: [u8; 3]) -> Self {
        let bit = |byte: u8, shift: u32| (byte >> shift) & 1 == 1;
        if bit(b[0], 7) {
            Self::Svc(SvcExtension {
                idr_flag: bit(b[0], 6),
                priority_id: b[0] & 0x3F,
                no_inter_layer_pred_flag: bit(b[1], 7),
                dependency_id: (b[1] >> 4) & 0x07,
                quality_id: b[1] & 0x0F,
                temporal_id: (b[2] >> 5) & 0x07,
                use_ref_base_pic_flag: bit(b[2], 4),
                discardable_flag: bit(b[2], 3),
                output_flag: bit(b[2], 2),
            })
        } else {
            Self::Mvc(MvcExtension {
                non_idr_flag: bit(b[0], 6),
                priority_id: b[0] & 0x3F,
                view_id: (u16::from(b[1]) << 2) | u16::from(b[2] >> 6),
                temporal_id: (b[2] >> 3) & 0x07,
                anchor_pic_flag: bit(b[2], 2),
                inter_view_flag: bit(b[2], 1),
            })
        }
    }
}

/// 字节流中的一个 NAL 单元 (视图, 不持有数据)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit {
    /// 头部字节在字节流中的偏移
    pub offset: usize,
    /// NAL 单元字节数 (num_bytes_in_nal_unit, 含头部与扩展头)
    pub len: usize,
    /// NAL 头部
    pub header: NalHeader,
    /// 扩展头 (仅类型 14/20)
    pub extension: Option<NalExtension>,
}

impl NalUnit {
    /// NAL 单元类型
    pub fn nal_type(&self) -> NalUnitType {
        self.header.nal_type
    }

    /// 头部总字节数 (1 或 4)
    pub fn header_len(&self) -> usize {
        if self.extension.is_some() {
            1 + NalExtension::SIZE
        } else {
            1
        }
    }

    /// NAL 单元完整字节 (不含起始码)
    ///
    /// `stream` 必须是产生该视图的字节流, 否则返回 `None`.
    pub fn bytes<'a>(&self, stream: &'a [u8]) -> Option<&'a [u8]> {
        stream.get(self.offset..self.offset.checked_add(self.len)?)
    }

    /// 头部之后的负载 (仍含防竞争字节)
    pub fn payload<'a>(&self, stream: &'a [u8]) -> Option<&'a [u8]> {
        self.bytes(stream)?.get(self.header_len()..)
    }

    /// 去除防竞争字节后的 RBSP
    pub fn rbsp(&self, stream: &[u8]) -> Option<Vec<u8>> {
        self.payload(stream).map(remove_emulation_prevention)
    }
}

/// 移除防竞争字节 (0x00 0x00 0x03 → 0x00 0x00)
///
/// RBSP 中连续两个 0x00 之后必须插入 0x03 以防止与起始码混淆, 解析前需要移除.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            rbsp.push(0x00);
            rbsp.push(0x00);
            i += 3;
        } else {
            rbsp.push(data[i]);
            i += 1;
        }
    }

    rbsp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_type_type_id() {
        for id in 0..=31 {
            let nt = NalUnitType::from_type_id(id);
            assert_eq!(nt.type_id(), id, "类型 {id} 往返失败");
            assert_ne!(nt.name(), "Unknown", "类型 {id} 缺少名称");
        }
        assert_eq!(NalUnitType::from_type_id(0x67), NalUnitType::Sps);
    }

    #[test]
    fn test_nal_type_property() {
        assert!(NalUnitType::SliceIdr.is_vcl());
        assert!(NalUnitType::SliceIdr.is_idr());
        assert!(NalUnitType::Slice.is_vcl());
        assert!(!NalUnitType::Slice.is_idr());
        assert!(!NalUnitType::Sps.is_vcl());
        assert!(!NalUnitType::SliceExtension.is_vcl());
        assert!(NalUnitType::Prefix.has_extension_header());
        assert!(NalUnitType::SliceExtension.has_extension_header());
        assert!(!NalUnitType::SliceExtensionDepth.has_extension_header());
    }

    #[test]
    fn test_nal_type_name() {
        assert_eq!(NalUnitType::Sps.name(), "Sequence parameter set");
        assert_eq!(NalUnitType::from_type_id(0).name(), "Unspecified");
        assert_eq!(NalUnitType::from_type_id(22).name(), "Reserved22");
        assert_eq!(NalUnitType::from_type_id(31).name(), "Unspecified31");
        assert_eq!(NalUnitType::SliceIdr.to_string(), "IDR");
    }

    #[test]
    fn test_nal_header_parse() {
        // forbidden=0, ref_idc=3, type=7 => 0x67
        let h = NalHeader::parse(0x67, 0).unwrap();
        assert_eq!(h.nal_type, NalUnitType::Sps);
        assert_eq!(h.ref_idc, 3);
    }

    #[test]
    fn test_nal_header_reject_forbidden_zero_bit_set() {
        let err = NalHeader::parse(0xE7, 12).expect_err("forbidden_zero_bit=1 应返回错误");
        assert!(matches!(err, QiaoError::ForbiddenBit { offset: 12 }));
        let msg = format!("{err}");
        assert!(
            msg.contains("forbidden_zero_bit"),
            "错误信息应包含 forbidden_zero_bit, actual={}",
            msg
        );
    }

    #[test]
    fn test_svc_扩展头() {
        // svc=1 idr=1 priority=5 | no_inter=1 dep=3 quality=9 | temporal=6 use_ref=1 disc=0 out=1
        let ext = NalExtension::parse([0b1100_0101, 0b1011_1001, 0b1101_0100]);
        let NalExtension::Svc(svc) = ext else {
            panic!("应解析为 SVC 扩展头");
        };
        assert!(svc.idr_flag);
        assert_eq!(svc.priority_id, 5);
        assert!(svc.no_inter_layer_pred_flag);
        assert_eq!(svc.dependency_id, 3);
        assert_eq!(svc.quality_id, 9);
        assert_eq!(svc.temporal_id, 6);
        assert!(svc.use_ref_base_pic_flag);
        assert!(!svc.discardable_flag);
        assert!(svc.output_flag);
    }

    #[test]
    fn test_mvc_扩展头() {
        // svc=0 non_idr=1 priority=2 | view_id=0b10_0000_0011 (515) | temporal=5 anchor=1 inter=0
        let ext = NalExtension::parse([0b0100_0010, 0b1000_0000, 0b1110_1100]);
        let NalExtension::Mvc(mvc) = ext else {
            panic!("应解析为 MVC 扩展头");
        };
        assert!(mvc.non_idr_flag);
        assert_eq!(mvc.priority_id, 2);
        assert_eq!(mvc.view_id, 515);
        assert_eq!(mvc.temporal_id, 5);
        assert!(mvc.anchor_pic_flag);
        assert!(!mvc.inter_view_flag);
    }

    #[test]
    fn test_nal_unit_view() {
        let stream = [0, 0, 1, 0x74, 0xC0, 0x00, 0x00, 0xAA, 0xBB];
        let unit = NalUnit {
            offset: 3,
            len: 6,
            header: NalHeader::parse(0x74, 3).unwrap(),
            extension: Some(NalExtension::parse([0xC0, 0x00, 0x00])),
        };
        assert_eq!(unit.nal_type(), NalUnitType::SliceExtension);
        assert_eq!(unit.header_len(), 4);
        assert_eq!(unit.payload(&stream), Some(&[0xAA, 0xBB][..]));
        assert_eq!(unit.bytes(&stream[..5]), None);
    }

    #[test]
    fn test_remove_emulation_prevention() {
        let data = [0x11, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03];
        assert_eq!(
            remove_emulation_prevention(&data),
            vec![0x11, 0x00, 0x00, 0x01, 0x00, 0x00]
        );
        // 末尾不足 3 字节时原样保留
        assert_eq!(remove_emulation_prevention(&[0x00, 0x03]), vec![0x00, 0x03]);
    }
}
