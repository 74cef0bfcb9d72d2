//! H.264 Annex B 解复用集成测试

use qiao::codec::parsers::h264::{
    AnnexBReader, DemuxOptions, NalExtension, NalUnitType, parse_byte_stream,
};
use qiao::core::QiaoError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================
// 测试数据
// ============================================================

/// Baseline 640x480 SPS (含 NAL 头部)
const SPS_640X480: [u8; 9] = [0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xF6, 0x40];

/// PPS: id=0, CAVLC, 单切片组
const PPS_BASIC: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

/// 构造典型码流: SPS + PPS + IDR + P 切片, 起始码长度交替
fn build_typical_annex_b() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    data.extend_from_slice(&SPS_640X480);
    data.extend_from_slice(&[0x00, 0x00, 0x01]);
    data.extend_from_slice(&PPS_BASIC);
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    data.extend_from_slice(&[0x65, 0x88, 0x80, 0x40, 0x10, 0xFF, 0xFE]);
    data.extend_from_slice(&[0x00, 0x00, 0x01]);
    data.extend_from_slice(&[0x41, 0x9A, 0x01, 0x02, 0x03]);
    data
}

// ============================================================
// 解复用
// ============================================================

#[test]
fn test_两个四字节起始码单元() {
    let mut data = vec![0x00, 0x00, 0x00, 0x01];
    data.extend_from_slice(&SPS_640X480);
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x41, 0x9A, 0x22]);

    let summary = parse_byte_stream(&data, &DemuxOptions::default()).unwrap();
    assert_eq!(summary.units.len(), 2, "应该有 2 个 NAL 单元");

    let sps = &summary.units[0];
    assert_eq!(sps.unit.nal_type(), NalUnitType::Sps);
    assert_eq!(sps.unit.offset, 4);
    assert_eq!(sps.unit.len, SPS_640X480.len());
    let parsed = sps.sps().expect("SPS 应被解析");
    assert_eq!(parsed.profile_idc, 66);
    assert_eq!(parsed.frame_width(), Some(640));
    assert_eq!(parsed.frame_height(), Some(480));

    let slice = &summary.units[1];
    assert_eq!(slice.unit.nal_type(), NalUnitType::Slice);
    assert_eq!(slice.unit.offset, 4 + SPS_640X480.len() + 4);
    assert_eq!(slice.unit.len, 3);
    assert!(slice.parameter_set.is_none());
}

#[test]
fn test_典型码流完整解析() {
    let data = build_typical_annex_b();
    let summary = parse_byte_stream(&data, &DemuxOptions::default()).unwrap();

    let types: Vec<NalUnitType> = summary.units.iter().map(|u| u.unit.nal_type()).collect();
    assert_eq!(
        types,
        vec![
            NalUnitType::Sps,
            NalUnitType::Pps,
            NalUnitType::SliceIdr,
            NalUnitType::Slice
        ]
    );
    assert!(summary.contains_idr());

    let pps = summary.last_pps().expect("PPS 应被解析");
    assert_eq!(pps.pps_id, 0);
    assert!(!pps.is_cabac());
    assert!(pps.deblocking_filter_control_present_flag);

    // 视图与原始数据一致
    let idr = &summary.units[2].unit;
    assert_eq!(idr.bytes(&data).map(|b| b[0]), Some(0x65));
}

#[test]
fn test_forbidden_bit_损坏时扫描失败() {
    init_logger();
    let mut data = build_typical_annex_b();
    // 第二个单元 (PPS) 的头部置 forbidden_zero_bit
    let pps_offset = 4 + SPS_640X480.len() + 3;
    data[pps_offset] |= 0x80;

    let err = parse_byte_stream(&data, &DemuxOptions::default()).unwrap_err();
    assert!(
        matches!(err, QiaoError::ForbiddenBit { offset } if offset == pps_offset),
        "actual={err:?}"
    );

    // 截断到损坏字节为止, 扫描同样不会越界
    let err = parse_byte_stream(&data[..=pps_offset], &DemuxOptions::default()).unwrap_err();
    assert!(matches!(err, QiaoError::ForbiddenBit { .. }));
}

#[test]
fn test_迭代器逐个产出() {
    let data = build_typical_annex_b();
    let mut reader = AnnexBReader::new(&data);
    let first = reader.next().unwrap().unwrap();
    assert_eq!(first.nal_type(), NalUnitType::Sps);
    assert_eq!(reader.by_ref().count(), 3);
    assert!(!reader.has_remaining());
}

#[test]
fn test_前缀nal扩展头() {
    // 前缀 NAL (14) + SVC 扩展头, 之后是 IDR 切片
    let data = [
        0x00, 0x00, 0x00, 0x01, 0x6E, 0xC0, 0x10, 0x04, 0x00, 0x00, 0x01, 0x65, 0x88,
    ];
    let summary = parse_byte_stream(&data, &DemuxOptions::default()).unwrap();
    assert_eq!(summary.units.len(), 2);
    let prefix = &summary.units[0].unit;
    assert_eq!(prefix.nal_type(), NalUnitType::Prefix);
    let Some(NalExtension::Svc(svc)) = prefix.extension else {
        panic!("前缀 NAL 应携带 SVC 扩展头");
    };
    assert!(svc.idr_flag);
    assert_eq!(svc.dependency_id, 1);
    assert!(svc.output_flag);
}

#[test]
fn test_单元数上限可配置() {
    init_logger();
    let mut data = Vec::new();
    for _ in 0..30 {
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x09, 0x10]);
    }

    let summary = parse_byte_stream(&data, &DemuxOptions::default()).unwrap();
    assert_eq!(summary.units.len(), 20);
    assert!(summary.truncated);

    let summary = parse_byte_stream(&data, &DemuxOptions { max_units: Some(5) }).unwrap();
    assert_eq!(summary.units.len(), 5);

    let summary = parse_byte_stream(&data, &DemuxOptions::unbounded()).unwrap();
    assert_eq!(summary.units.len(), 30);
    assert!(!summary.truncated);
}
