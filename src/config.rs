//! 配置文件 (JSON).
//!
//! ```json
//! {
//!   "logging": { "level": "debug", "directory": "logs" },
//!   "codec": { "compressor": true, "bit_rate": 2000000, "rate_control": "cqp", "qp": 26 }
//! }
//! ```
//!
//! 所有字段都有默认值, 缺省的段落与字段按默认处理.

use std::path::Path;

use anyhow::{Context, Result};
use qiao_codec::parsers::h264::DemuxOptions;
use qiao_codec::{ContextOptions, EncoderSettings, RateControlMode};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// 顶层配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QiaoConfig {
    pub logging: LoggingConfig,
    pub codec: CodecConfig,
}

impl QiaoConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("解析配置失败")
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("配置文件无效, path={}", path.display()))
    }
}

/// 码率控制模式的配置写法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    #[default]
    Vbr,
    Cqp,
}

impl From<RateControl> for RateControlMode {
    fn from(value: RateControl) -> Self {
        match value {
            RateControl::Vbr => RateControlMode::Vbr,
            RateControl::Cqp => RateControlMode::Cqp,
        }
    }
}

/// H.264 上下文配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    pub compressor: bool,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub qp: u32,
    pub rate_control: RateControl,
    pub threads: u32,
    /// 解码前做诊断性解复用
    pub inspect_stream: bool,
    /// 单次解复用的 NAL 单元上限, 0 表示不限
    pub max_nal_units: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let settings = EncoderSettings::default();
        Self {
            compressor: false,
            bit_rate: settings.bit_rate,
            frame_rate: settings.frame_rate,
            qp: settings.qp,
            rate_control: RateControl::Vbr,
            threads: settings.threads,
            inspect_stream: true,
            max_nal_units: DemuxOptions::DEFAULT_MAX_UNITS,
        }
    }
}

impl CodecConfig {
    pub fn demux_options(&self) -> DemuxOptions {
        DemuxOptions {
            max_units: (self.max_nal_units > 0).then_some(self.max_nal_units),
        }
    }

    pub fn to_context_options(&self) -> ContextOptions {
        ContextOptions {
            compressor: self.compressor,
            settings: EncoderSettings {
                bit_rate: self.bit_rate,
                frame_rate: self.frame_rate,
                qp: self.qp,
                rate_control: self.rate_control.into(),
                threads: self.threads,
            },
            inspect_stream: self.inspect_stream,
            demux: self.demux_options(),
        }
    }
}
