//! qiao-probe - H.264 码流探测工具
//!
//! 读取 Annex B 格式的 .h264 文件, 逐个列出 NAL 单元, 并给出 SPS/PPS 摘要.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use qiao::config::QiaoConfig;
use qiao_codec::parsers::h264::{ByteStreamSummary, DemuxOptions, ParsedNal, Pps, Sps, parse_byte_stream};

/// Qiao H.264 码流探测工具
#[derive(Parser, Debug)]
#[command(name = "qiao-probe", version, about = "纯 Rust H.264 码流探测工具")]
struct Cli {
    /// 输入文件路径 (Annex B 字节流)
    input: String,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 最多列出的 NAL 单元数, 0 表示不限, 缺省使用配置文件中的值
    #[arg(long)]
    max_units: Option<usize>,

    /// 配置文件 (JSON)
    #[arg(long)]
    config: Option<String>,

    /// 提高日志级别 (-v=debug, -vv=trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// JSON 输出结构体
// ============================================================

#[derive(Serialize)]
struct ProbeOutput {
    filename: String,
    size: usize,
    truncated: bool,
    units: Vec<UnitInfo>,
}

#[derive(Serialize)]
struct UnitInfo {
    index: usize,
    offset: usize,
    size: usize,
    nal_unit_type: u8,
    nal_ref_idc: u8,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sps: Option<SpsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pps: Option<PpsInfo>,
}

#[derive(Serialize)]
struct SpsInfo {
    sps_id: u32,
    profile_idc: u8,
    level_idc: u8,
    chroma_format_idc: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    max_num_ref_frames: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<f64>,
}

#[derive(Serialize)]
struct PpsInfo {
    pps_id: u32,
    sps_id: u32,
    entropy_coding: &'static str,
    num_slice_groups: u32,
    pic_init_qp: i32,
    transform_8x8_mode: bool,
}

impl From<&Sps> for SpsInfo {
    fn from(sps: &Sps) -> Self {
        Self {
            sps_id: sps.sps_id,
            profile_idc: sps.profile_idc,
            level_idc: sps.level_idc,
            chroma_format_idc: sps.chroma_format_idc,
            width: sps.frame_width(),
            height: sps.frame_height(),
            max_num_ref_frames: sps.max_num_ref_frames,
            frame_rate: sps.vui.as_ref().and_then(|vui| vui.frame_rate()),
        }
    }
}

impl From<&Pps> for PpsInfo {
    fn from(pps: &Pps) -> Self {
        Self {
            pps_id: pps.pps_id,
            sps_id: pps.sps_id,
            entropy_coding: if pps.is_cabac() { "CABAC" } else { "CAVLC" },
            num_slice_groups: pps.num_slice_groups_minus1.saturating_add(1),
            pic_init_qp: pps.pic_init_qp_minus26.saturating_add(26),
            transform_8x8_mode: pps.transform_8x8_mode_flag,
        }
    }
}

impl UnitInfo {
    fn new(index: usize, nal: &ParsedNal) -> Self {
        let unit = &nal.unit;
        Self {
            index,
            offset: unit.offset,
            size: unit.len,
            nal_unit_type: unit.nal_type().type_id(),
            nal_ref_idc: unit.header.ref_idc,
            name: unit.nal_type().name(),
            sps: nal.sps().map(SpsInfo::from),
            pps: nal.pps().map(PpsInfo::from),
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => QiaoConfig::load(path)?,
        None => QiaoConfig::default(),
    };

    let mut logging = config.logging.clone().with_verbosity(cli.verbose);
    logging.console = cli.verbose > 0;
    if let Err(e) = qiao::logging::init(&logging) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    let data = std::fs::read(&cli.input)
        .with_context(|| format!("读取输入文件失败, path={}", cli.input))?;
    info!("qiao-probe {}: {} ({} 字节)", qiao::version(), cli.input, data.len());

    let options = match cli.max_units {
        Some(0) => DemuxOptions::unbounded(),
        Some(max) => DemuxOptions {
            max_units: Some(max),
        },
        None => config.codec.demux_options(),
    };
    let summary = parse_byte_stream(&data, &options)
        .with_context(|| format!("解析 H.264 字节流失败, path={}", cli.input))?;

    if cli.json {
        let output = ProbeOutput {
            filename: cli.input.clone(),
            size: data.len(),
            truncated: summary.truncated,
            units: summary
                .units
                .iter()
                .enumerate()
                .map(|(index, nal)| UnitInfo::new(index, nal))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&summary);
    }
    Ok(())
}

fn print_text(summary: &ByteStreamSummary) {
    for (index, nal) in summary.units.iter().enumerate() {
        let unit = &nal.unit;
        println!(
            "[{}] type={} ref_idc={} size={} {}",
            index,
            unit.nal_type().type_id(),
            unit.header.ref_idc,
            unit.len,
            unit.nal_type().name()
        );
        if let Some(sps) = nal.sps() {
            let info = SpsInfo::from(sps);
            println!(
                "    SPS id={} profile={} level={} chroma_format={} size={}x{} ref_frames={}",
                info.sps_id,
                info.profile_idc,
                info.level_idc,
                info.chroma_format_idc,
                info.width.map_or("?".into(), |w| w.to_string()),
                info.height.map_or("?".into(), |h| h.to_string()),
                info.max_num_ref_frames
            );
        }
        if let Some(pps) = nal.pps() {
            let info = PpsInfo::from(pps);
            println!(
                "    PPS id={} sps_id={} {} slice_groups={} init_qp={}",
                info.pps_id, info.sps_id, info.entropy_coding, info.num_slice_groups, info.pic_init_qp
            );
        }
    }
    if summary.truncated {
        println!("(已达到单元数上限, 其余数据未列出)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qiao::core::bitwriter::BitWriter;
    use qiao_codec::parsers::h264::parse_pps;

    fn pps_with_qp_offset(offset: i32) -> Pps {
        let mut bw = BitWriter::new();
        bw.write_ue(0); // pps_id
        bw.write_ue(0); // sps_id
        bw.write_flag(false);
        bw.write_flag(false);
        bw.write_ue(0); // num_slice_groups_minus1
        bw.write_ue(0);
        bw.write_ue(0);
        bw.write_flag(false);
        bw.write_bits(0, 2);
        bw.write_se(offset); // pic_init_qp_minus26
        bw.write_se(0);
        bw.write_se(0);
        bw.write_flag(true);
        bw.write_flag(false);
        bw.write_flag(false);
        bw.write_trailing_bits();
        parse_pps(&bw.finish())
    }

    #[test]
    fn test_初始量化参数() {
        let info = PpsInfo::from(&pps_with_qp_offset(-4));
        assert_eq!(info.pic_init_qp, 22);
        assert_eq!(info.entropy_coding, "CAVLC");
    }

    #[test]
    fn test_极端量化偏移不溢出() {
        let pps = pps_with_qp_offset(i32::MAX);
        assert_eq!(pps.pic_init_qp_minus26, i32::MAX);
        let info = PpsInfo::from(&pps);
        assert_eq!(info.pic_init_qp, i32::MAX, "应饱和而不是回绕");
    }
}
