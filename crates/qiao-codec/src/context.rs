//! H.264 上下文: 后端调度与区域合成.
//!
//! 解码: 后端产出 4:2:0 帧后, 按区域列表逐个转换为 BGRA 写入目标表面.
//! 所有区域先统一校验, 任何一个越界都不会写入目标表面.
//!
//! 编码: BGRA 源转换为暂存 4:2:0 帧 (尺寸向上取偶) 后交给后端,
//! 暂存帧在每条返回路径上都会释放.
//!
//! 上下文不做内部加锁, 同一上下文的调用必须由调用方串行化.

use bytes::Bytes;
use log::{debug, warn};
use qiao_color::{rgb_to_yuv420, yuv420_to_rgb};
use qiao_core::{QiaoError, QiaoResult, Rect16, Roi};

use crate::backend::{BackendCaps, BackendKind, Decoded, H264Backend};
use crate::encoder_params::{EncoderParams, EncoderSettings, plan_update};
use crate::frame::YuvFrame;
use crate::parsers::h264::{DemuxOptions, Pps, Sps, parse_byte_stream};
use crate::registry::BackendRegistry;

const BGRA_BPP: usize = 4;

/// 上下文创建选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// 以编码模式初始化后端
    pub compressor: bool,
    /// 编码设置, 创建后仍可通过 [`H264Context::settings_mut`] 修改
    pub settings: EncoderSettings,
    /// 解码前对输入做一次诊断性解复用, 记录最近的 SPS/PPS
    pub inspect_stream: bool,
    pub demux: DemuxOptions,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            compressor: false,
            settings: EncoderSettings::default(),
            inspect_stream: true,
            demux: DemuxOptions::default(),
        }
    }
}

impl ContextOptions {
    /// 编码模式的默认选项
    pub fn compressor() -> Self {
        Self {
            compressor: true,
            ..Self::default()
        }
    }
}

/// 一次解码调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressOutcome {
    /// 后端本次没有产出帧
    NoFrame,
    /// 已合成的区域数
    Composited { regions: usize },
}

/// H.264 编解码上下文
pub struct H264Context {
    backend: Box<dyn H264Backend>,
    options: ContextOptions,
    /// 最近一次成功编码时生效的参数
    applied: Option<EncoderParams>,
    last_sps: Option<Sps>,
    last_pps: Option<Pps>,
    /// 最近一次解码帧尺寸
    frame_size: Option<(u32, u32)>,
}

impl H264Context {
    /// 使用内置后端创建上下文
    pub fn new(options: ContextOptions) -> QiaoResult<Self> {
        let mut registry = BackendRegistry::new();
        crate::register_all(&mut registry);
        Self::with_registry(options, &registry)
    }

    /// 从注册表中按优先级选择后端
    pub fn with_registry(options: ContextOptions, registry: &BackendRegistry) -> QiaoResult<Self> {
        let backend = registry.select(options.compressor)?;
        Ok(Self::from_parts(backend, options))
    }

    /// 使用指定的后端, 先对其初始化
    pub fn with_backend(
        options: ContextOptions,
        mut backend: Box<dyn H264Backend>,
    ) -> QiaoResult<Self> {
        backend.init(options.compressor)?;
        Ok(Self::from_parts(backend, options))
    }

    fn from_parts(backend: Box<dyn H264Backend>, options: ContextOptions) -> Self {
        Self {
            backend,
            options,
            applied: None,
            last_sps: None,
            last_pps: None,
            frame_size: None,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn settings_mut(&mut self) -> &mut EncoderSettings {
        &mut self.options.settings
    }

    /// 最近一次诊断解复用看到的 SPS
    pub fn last_sps(&self) -> Option<&Sps> {
        self.last_sps.as_ref()
    }

    /// 最近一次诊断解复用看到的 PPS
    pub fn last_pps(&self) -> Option<&Pps> {
        self.last_pps.as_ref()
    }

    /// 最近一次解码帧的尺寸
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    /// 清除缓存的码流信息与编码参数, 下一次编码将完整初始化
    ///
    /// 后端保持初始化状态, 只在上下文销毁时释放.
    pub fn reset(&mut self) {
        self.applied = None;
        self.last_sps = None;
        self.last_pps = None;
        self.frame_size = None;
    }

    // ============================================================
    // 解码
    // ============================================================

    /// 解码 `src` 并把 `regions` 中的每个区域合成到 BGRA 目标表面
    ///
    /// `dst_step` 为目标表面行字节数, `dst_width`/`dst_height` 为其像素尺寸.
    /// 后端错误原样返回, 不影响后续调用.
    pub fn decompress(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        dst_step: usize,
        dst_width: u32,
        dst_height: u32,
        regions: &[Rect16],
    ) -> QiaoResult<DecompressOutcome> {
        if dst.is_empty() {
            return Err(QiaoError::InvalidArgument("目标表面为空".into()));
        }
        if self.options.inspect_stream {
            self.inspect(src);
        }

        let frame = match self.backend.decompress(src)? {
            Decoded::Pending => return Ok(DecompressOutcome::NoFrame),
            Decoded::Frame(frame) => frame,
        };
        self.frame_size = Some((frame.width, frame.height));

        for (index, rect) in regions.iter().enumerate() {
            rect.check_bounds(frame.width, frame.height, dst_width, dst_height)
                .map_err(|bound| QiaoError::RegionOutOfBounds { index, bound })?;
            check_surface(rect, dst.len(), dst_step)?;
        }

        for rect in regions.iter().filter(|rect| !rect.is_empty()) {
            let left = usize::from(rect.left);
            let top = usize::from(rect.top);
            let planes = frame.planes.offset_420(left, top)?;
            let offset = top * dst_step + left * BGRA_BPP;
            let target = dst.get_mut(offset..).ok_or_else(|| {
                QiaoError::Internal(format!("目标偏移 {offset} 超出表面"))
            })?;
            yuv420_to_rgb(&planes, target, dst_step, rect.roi())?;
        }

        Ok(DecompressOutcome::Composited {
            regions: regions.len(),
        })
    }

    fn inspect(&mut self, src: &[u8]) {
        match parse_byte_stream(src, &self.options.demux) {
            Ok(summary) => {
                if let Some(sps) = summary.last_sps() {
                    self.last_sps = Some(sps.clone());
                }
                if let Some(pps) = summary.last_pps() {
                    self.last_pps = Some(pps.clone());
                }
            }
            Err(e) => warn!("H264: 输入码流诊断失败: {}", e),
        }
    }

    // ============================================================
    // 编码
    // ============================================================

    /// 把 BGRA 源表面编码为 H.264 码流
    pub fn compress(
        &mut self,
        src: &[u8],
        src_step: usize,
        src_width: u32,
        src_height: u32,
    ) -> QiaoResult<Bytes> {
        if !self.backend.capabilities().contains(BackendCaps::ENCODE) {
            return Err(QiaoError::Unsupported(format!(
                "后端 {} 不支持编码",
                self.backend.name()
            )));
        }
        let roi = Roi::new(src_width, src_height);
        if roi.is_empty() {
            return Err(QiaoError::InvalidArgument(format!(
                "源尺寸无效: {src_width}x{src_height}"
            )));
        }

        let padded = roi.round_up_even();
        let mut scratch = YuvFrame::alloc_420(padded.width, padded.height)?;
        rgb_to_yuv420(src, src_step, &mut scratch.as_plane_set_mut(), roi)?;

        let requested = EncoderParams {
            width: padded.width,
            height: padded.height,
            settings: self.options.settings,
        };
        let update = plan_update(self.applied.as_ref(), &requested);
        if update.is_initialize() {
            debug!(
                "H264: 编码器完整初始化 {}x{} {:?}",
                requested.width, requested.height, requested.settings
            );
        }

        let bitstream = self.backend.compress(&scratch, &update)?;
        self.applied = Some(requested);
        Ok(bitstream)
    }
}

impl Drop for H264Context {
    fn drop(&mut self) {
        self.backend.uninit();
    }
}

/// 校验区域在目标缓冲区长度之内
fn check_surface(rect: &Rect16, len: usize, step: usize) -> QiaoResult<()> {
    if rect.is_empty() {
        return Ok(());
    }
    let last_row = usize::from(rect.bottom) - 1;
    let end = last_row
        .checked_mul(step)
        .and_then(|v| v.checked_add(usize::from(rect.right) * BGRA_BPP));
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(QiaoError::InvalidArgument(format!(
            "目标表面 {} 字节不足以容纳区域 {:?}",
            len, rect
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::backend::DecodedFrame;
    use crate::encoder_params::{ParamDelta, ParamUpdate};
    use qiao_core::RegionBound;

    struct Journal {
        inits: usize,
        uninits: usize,
        updates: Vec<ParamUpdate>,
        /// 解码状态: 正数产出帧, 0 无帧, 负数为错误码
        status: i32,
    }

    impl Journal {
        fn new() -> Self {
            Self {
                inits: 0,
                uninits: 0,
                updates: Vec::new(),
                status: 1,
            }
        }
    }

    /// 测试后端: 解码时返回固定颜色的帧, 编码时记录参数更新
    struct FakeBackend {
        frame: YuvFrame,
        journal: Arc<Mutex<Journal>>,
    }

    impl FakeBackend {
        fn new(width: u32, height: u32, y: u8, journal: Arc<Mutex<Journal>>) -> Box<Self> {
            let mut frame = YuvFrame::alloc_420(width, height).unwrap();
            frame.data[0].fill(y);
            frame.data[1].fill(128);
            frame.data[2].fill(128);
            Box::new(Self { frame, journal })
        }
    }

    impl H264Backend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }
        fn kind(&self) -> BackendKind {
            BackendKind::Software
        }
        fn capabilities(&self) -> BackendCaps {
            BackendCaps::DECODE | BackendCaps::ENCODE
        }
        fn init(&mut self, _compressor: bool) -> QiaoResult<()> {
            self.journal.lock().unwrap().inits += 1;
            Ok(())
        }
        fn uninit(&mut self) {
            self.journal.lock().unwrap().uninits += 1;
        }
        fn decompress(&mut self, _src: &[u8]) -> QiaoResult<Decoded<'_>> {
            let status = self.journal.lock().unwrap().status;
            match status {
                0 => Ok(Decoded::Pending),
                s if s < 0 => Err(QiaoError::Backend {
                    code: s,
                    message: "fake".into(),
                }),
                _ => Ok(Decoded::Frame(DecodedFrame {
                    planes: self.frame.as_plane_set(),
                    width: self.frame.width,
                    height: self.frame.height,
                })),
            }
        }
        fn compress(&mut self, frame: &YuvFrame, update: &ParamUpdate) -> QiaoResult<Bytes> {
            self.journal.lock().unwrap().updates.push(*update);
            Ok(Bytes::from(vec![0, 0, 0, 1, frame.data[0][0]]))
        }
    }

    fn context(width: u32, height: u32, y: u8) -> (H264Context, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::new()));
        let backend = FakeBackend::new(width, height, y, journal.clone());
        let ctx = H264Context::with_backend(ContextOptions::default(), backend).unwrap();
        (ctx, journal)
    }

    #[test]
    fn test_默认上下文使用空后端() {
        let mut ctx = H264Context::new(ContextOptions::default()).unwrap();
        assert_eq!(ctx.backend_name(), "null");
        assert_eq!(ctx.backend_kind(), BackendKind::Null);
        let mut dst = vec![0u8; 16];
        let err = ctx
            .decompress(&[0, 0, 0, 1, 0x09, 0xF0], &mut dst, 8, 2, 2, &[])
            .unwrap_err();
        assert_eq!(err.status_code(), -1);
        assert!(matches!(ctx.compress(&dst, 8, 2, 2), Err(QiaoError::Unsupported(_))));
    }

    #[test]
    fn test_空注册表创建失败() {
        let registry = BackendRegistry::new();
        assert!(matches!(
            H264Context::with_registry(ContextOptions::default(), &registry),
            Err(QiaoError::NoBackend)
        ));
    }

    #[test]
    fn test_区域合成() {
        let (mut ctx, _) = context(8, 8, 255);
        let step = 8 * 4;
        let mut dst = vec![0u8; step * 8];
        let outcome = ctx
            .decompress(&[], &mut dst, step, 8, 8, &[Rect16::new(2, 2, 6, 5)])
            .unwrap();
        assert_eq!(outcome, DecompressOutcome::Composited { regions: 1 });
        assert_eq!(ctx.frame_size(), Some((8, 8)));

        for y in 0..8 {
            for x in 0..8 {
                let px = &dst[y * step + x * 4..y * step + x * 4 + 4];
                let inside = (2..6).contains(&x) && (2..5).contains(&y);
                let expected: [u8; 4] = if inside { [255, 255, 255, 255] } else { [0; 4] };
                assert_eq!(px, expected, "像素 ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_无帧时不写目标() {
        let (mut ctx, journal) = context(4, 4, 255);
        journal.lock().unwrap().status = 0;
        let mut dst = vec![0u8; 64];
        let outcome = ctx
            .decompress(&[], &mut dst, 16, 4, 4, &[Rect16::new(0, 0, 4, 4)])
            .unwrap();
        assert_eq!(outcome, DecompressOutcome::NoFrame);
        assert!(dst.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_后端错误码原样返回() {
        let (mut ctx, journal) = context(4, 4, 255);
        journal.lock().unwrap().status = -7;
        let mut dst = vec![0u8; 64];
        let err = ctx.decompress(&[], &mut dst, 16, 4, 4, &[]).unwrap_err();
        assert_eq!(err.status_code(), -7);

        // 失败后上下文仍可用
        journal.lock().unwrap().status = 1;
        assert!(ctx.decompress(&[], &mut dst, 16, 4, 4, &[]).is_ok());
    }

    #[test]
    fn test_越界区域整体拒绝() {
        let (mut ctx, _) = context(8, 8, 255);
        let mut dst = vec![0u8; 8 * 4 * 8];
        let regions = [Rect16::new(0, 0, 4, 4), Rect16::new(4, 0, 9, 4)];
        let err = ctx.decompress(&[], &mut dst, 32, 8, 8, &regions).unwrap_err();
        assert!(matches!(
            err,
            QiaoError::RegionOutOfBounds {
                index: 1,
                bound: RegionBound::FrameWidth
            }
        ));
        assert_eq!(err.status_code(), -1003);
        assert!(dst.iter().all(|&b| b == 0), "越界时不应写入任何区域");
    }

    #[test]
    fn test_表面越界() {
        let (mut ctx, _) = context(8, 8, 255);
        let mut dst = vec![0u8; 4 * 4 * 4];
        let err = ctx
            .decompress(&[], &mut dst, 16, 4, 4, &[Rect16::new(0, 0, 6, 4)])
            .unwrap_err();
        assert_eq!(err.status_code(), -1005);

        let err = ctx
            .decompress(&[], &mut dst, 16, 4, 4, &[Rect16::new(0, 0, 4, 6)])
            .unwrap_err();
        assert_eq!(err.status_code(), -1006);
    }

    #[test]
    fn test_目标缓冲区过短() {
        let (mut ctx, _) = context(8, 8, 255);
        let mut dst = vec![0u8; 16 * 3];
        let err = ctx
            .decompress(&[], &mut dst, 16, 4, 4, &[Rect16::new(0, 0, 4, 4)])
            .unwrap_err();
        assert_eq!(err.status_code(), -1002);

        let mut empty: Vec<u8> = Vec::new();
        let err = ctx.decompress(&[], &mut empty, 16, 4, 4, &[]).unwrap_err();
        assert_eq!(err.status_code(), -1002);
    }

    #[test]
    fn test_诊断解复用记录参数集() {
        let (mut ctx, _) = context(4, 4, 255);
        // Baseline 640x480 SPS
        let stream = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xF6, 0x40,
        ];
        let mut dst = vec![0u8; 64];
        ctx.decompress(&stream, &mut dst, 16, 4, 4, &[]).unwrap();
        let sps = ctx.last_sps().expect("应记录 SPS");
        assert_eq!(sps.frame_width(), Some(640));
        assert!(ctx.last_pps().is_none());

        // 畸形输入只告警, 不影响解码
        assert!(ctx.decompress(&[0xFF; 8], &mut dst, 16, 4, 4, &[]).is_ok());
        assert!(ctx.last_sps().is_some());

        ctx.reset();
        assert!(ctx.last_sps().is_none());
    }

    #[test]
    fn test_连续编码不重复初始化() {
        let (mut ctx, journal) = context(4, 4, 0);
        // 按最宽的 7 像素分配, 5 像素宽时行跨度仍为 20
        let src = vec![0xFFu8; 7 * 3 * 4];

        let out = ctx.compress(&src, 5 * 4, 5, 3).unwrap();
        assert_eq!(&out[..4], &[0, 0, 0, 1]);
        assert_eq!(out[4], 254, "白色亮度");
        ctx.compress(&src, 5 * 4, 5, 3).unwrap();
        ctx.settings_mut().bit_rate = 2_000_000;
        ctx.compress(&src, 5 * 4, 5, 3).unwrap();
        ctx.compress(&src, 7 * 4, 7, 3).unwrap();

        let journal = journal.lock().unwrap();
        assert_eq!(journal.updates.len(), 4);
        let ParamUpdate::Initialize(first) = journal.updates[0] else {
            panic!("首次编码应完整初始化");
        };
        assert_eq!((first.width, first.height), (6, 4));
        assert_eq!(journal.updates[1], ParamUpdate::Adjust(ParamDelta::default()));
        assert_eq!(
            journal.updates[2],
            ParamUpdate::Adjust(ParamDelta {
                bit_rate: Some(2_000_000),
                ..ParamDelta::default()
            })
        );
        assert!(journal.updates[3].is_initialize());
    }

    #[test]
    fn test_编码参数校验() {
        let (mut ctx, journal) = context(4, 4, 0);
        assert!(ctx.compress(&[], 0, 0, 4).is_err());
        assert!(ctx.compress(&[0u8; 8], 8, 4, 4).is_err(), "源缓冲区过短");
        assert!(journal.lock().unwrap().updates.is_empty());
    }

    #[test]
    fn test_销毁时释放后端() {
        let (mut ctx, journal) = context(4, 4, 0);
        assert_eq!(journal.lock().unwrap().inits, 1);
        ctx.reset();
        assert_eq!(journal.lock().unwrap().uninits, 0, "重置不释放后端");
        drop(ctx);
        assert_eq!(journal.lock().unwrap().uninits, 1);
    }
}
