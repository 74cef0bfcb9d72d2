//! H.264 Annex B 字节流解复用.
//!
//! ```text
//! [00] 00 00 01 | NAL | [00 ..] 00 00 01 | NAL | ...
//! ```
//!
//! [`AnnexBReader`] 逐个产出 [`NalUnit`] 视图, 不复制数据;
//! [`parse_byte_stream`] 在其上附加 SPS/PPS 解析与单元数上限.
//!
//! 失败策略: 缺少起始码, 截断, 或 forbidden_zero_bit 为 1 时中止整个扫描.
//! 找不到任何 NAL 单元以外的 "零个单元" 不是错误.

use log::{debug, warn};
use qiao_core::{QiaoError, QiaoResult};

use super::nal::{NalExtension, NalHeader, NalUnit, NalUnitType};
use super::pps::{Pps, parse_pps};
use super::sps::{Sps, parse_sps};

/// 解复用选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemuxOptions {
    /// 单次调用最多处理的 NAL 单元数, `None` 表示不限
    pub max_units: Option<usize>,
}

impl DemuxOptions {
    /// 默认上限
    pub const DEFAULT_MAX_UNITS: usize = 20;

    /// 不限制单元数
    pub fn unbounded() -> Self {
        Self { max_units: None }
    }
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            max_units: Some(Self::DEFAULT_MAX_UNITS),
        }
    }
}

/// Annex B 字节流迭代器
///
/// 出错后迭代器终止, 之后始终返回 `None`.
pub struct AnnexBReader<'a> {
    data: &'a [u8],
    /// 下一个起始码 (或其前导零) 的位置
    pos: usize,
    started: bool,
    done: bool,
}

impl<'a> AnnexBReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            started: false,
            done: false,
        }
    }

    /// 当前扫描位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余数据中是否还有非零字节 (即可能还有 NAL 单元)
    pub fn has_remaining(&self) -> bool {
        !self.done
            && self
                .data
                .get(self.pos..)
                .is_some_and(|rest| rest.iter().any(|&b| b != 0))
    }

    /// 跳过零字节并消耗起始码, 返回 NAL 头部偏移
    ///
    /// 到达末尾时返回 `Ok(None)`.
    fn consume_start_code(&mut self) -> QiaoResult<Option<usize>> {
        let start = self.pos;
        let zeros = self.data[start..].iter().take_while(|&&b| b == 0).count();
        let marker = start + zeros;

        if marker == self.data.len() {
            return Ok(None);
        }
        // 至少两个 0x00 后紧跟 0x01
        if zeros < 2 || self.data[marker] != 0x01 {
            return Err(QiaoError::MissingStartCode { offset: marker });
        }

        let header = marker + 1;
        if header >= self.data.len() {
            return Err(QiaoError::Truncated {
                offset: header,
                remaining: 0,
            });
        }
        Ok(Some(header))
    }

    /// 查找 NAL 单元结束位置: 下一个 `00 00 01` / `00 00 00` 或缓冲区末尾
    fn find_unit_end(&self, header: usize) -> usize {
        let data = self.data;
        let mut i = header + 1;
        while i + 2 < data.len() {
            if data[i] == 0 && data[i + 1] == 0 && data[i + 2] <= 0x01 {
                return i;
            }
            i += 1;
        }
        data.len()
    }

    fn read_unit(&mut self) -> QiaoResult<Option<NalUnit>> {
        if !self.started {
            self.started = true;
            if self.data.len() < 4 {
                return Err(QiaoError::Truncated {
                    offset: 0,
                    remaining: self.data.len(),
                });
            }
            if self.data.iter().all(|&b| b == 0) {
                return Err(QiaoError::MissingStartCode {
                    offset: self.data.len(),
                });
            }
        }

        let Some(header_offset) = self.consume_start_code()? else {
            return Ok(None);
        };
        let end = self.find_unit_end(header_offset);
        let header = NalHeader::parse(self.data[header_offset], header_offset)?;

        let extension = if header.nal_type.has_extension_header() {
            let ext_start = header_offset + 1;
            let ext_end = ext_start + NalExtension::SIZE;
            if ext_end > end {
                return Err(QiaoError::Truncated {
                    offset: ext_start,
                    remaining: end - ext_start,
                });
            }
            let mut bytes = [0u8; NalExtension::SIZE];
            bytes.copy_from_slice(&self.data[ext_start..ext_end]);
            Some(NalExtension::parse(bytes))
        } else {
            None
        };

        self.pos = end;
        Ok(Some(NalUnit {
            offset: header_offset,
            len: end - header_offset,
            header,
            extension,
        }))
    }
}

impl Iterator for AnnexBReader<'_> {
    type Item = QiaoResult<NalUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_unit() {
            Ok(Some(unit)) => Some(Ok(unit)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ============================================================
// 带参数集解析的完整扫描
// ============================================================

/// 已解析的参数集
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSet {
    Sps(Sps),
    Pps(Pps),
}

/// 一个 NAL 单元及其参数集 (仅类型 7/8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNal {
    pub unit: NalUnit,
    pub parameter_set: Option<ParameterSet>,
}

impl ParsedNal {
    pub fn sps(&self) -> Option<&Sps> {
        match &self.parameter_set {
            Some(ParameterSet::Sps(sps)) => Some(sps),
            _ => None,
        }
    }

    pub fn pps(&self) -> Option<&Pps> {
        match &self.parameter_set {
            Some(ParameterSet::Pps(pps)) => Some(pps),
            _ => None,
        }
    }
}

/// 一次扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteStreamSummary {
    pub units: Vec<ParsedNal>,
    /// 达到单元数上限时仍有未处理的数据
    pub truncated: bool,
}

impl ByteStreamSummary {
    /// 最后出现的 SPS
    pub fn last_sps(&self) -> Option<&Sps> {
        self.units.iter().rev().find_map(ParsedNal::sps)
    }

    /// 最后出现的 PPS
    pub fn last_pps(&self) -> Option<&Pps> {
        self.units.iter().rev().find_map(ParsedNal::pps)
    }

    /// 是否包含 IDR 切片
    pub fn contains_idr(&self) -> bool {
        self.units.iter().any(|u| u.unit.nal_type().is_idr())
    }
}

/// 扫描整个 Annex B 缓冲区, 解析其中的 SPS 与 PPS
pub fn parse_byte_stream(data: &[u8], options: &DemuxOptions) -> QiaoResult<ByteStreamSummary> {
    let mut reader = AnnexBReader::new(data);
    let mut summary = ByteStreamSummary::default();

    loop {
        if options.max_units.is_some_and(|max| summary.units.len() >= max) {
            summary.truncated = reader.has_remaining();
            if summary.truncated {
                warn!(
                    "H264: 已达到单元数上限 {}, 偏移 {} 之后的数据未处理",
                    summary.units.len(),
                    reader.position()
                );
            }
            break;
        }

        let unit = match reader.next() {
            Some(Ok(unit)) => unit,
            Some(Err(e)) => {
                warn!("H264: 字节流解复用失败: {}", e);
                return Err(e);
            }
            None => break,
        };

        debug!(
            "[{}] type={} ref_idc={} size={} {}",
            summary.units.len(),
            unit.nal_type().type_id(),
            unit.header.ref_idc,
            unit.len,
            unit.nal_type().name()
        );

        let parameter_set = match unit.nal_type() {
            NalUnitType::Sps => unit.rbsp(data).map(|rbsp| ParameterSet::Sps(parse_sps(&rbsp))),
            NalUnitType::Pps => unit.rbsp(data).map(|rbsp| ParameterSet::Pps(parse_pps(&rbsp))),
            _ => None,
        };
        summary.units.push(ParsedNal {
            unit,
            parameter_set,
        });
    }

    Ok(summary)
}
