//! 编码器参数跟踪.
//!
//! 每次压缩前比较已生效的参数与本次请求的参数, 决定后端需要完整重新初始化
//! 还是只调整变化的字段. 画面尺寸, 码率控制模式或线程数变化时必须重新初始化;
//! 其余情况下 VBR 只更新变化的码率/帧率, CQP 只更新变化的 QP.

/// 码率控制模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RateControlMode {
    /// 可变码率
    #[default]
    Vbr,
    /// 固定 QP
    Cqp,
}

/// 与画面尺寸无关的编码设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// 目标码率 (bps)
    pub bit_rate: u32,
    /// 帧率
    pub frame_rate: u32,
    /// CQP 模式下的量化参数
    pub qp: u32,
    pub rate_control: RateControlMode,
    /// 编码线程数, 0 表示由后端决定
    pub threads: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            bit_rate: 1_000_000,
            frame_rate: 30,
            qp: 0,
            rate_control: RateControlMode::Vbr,
            threads: 0,
        }
    }
}

/// 一次压缩请求的完整参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderParams {
    /// 编码宽度 (已向上取偶)
    pub width: u32,
    /// 编码高度 (已向上取偶)
    pub height: u32,
    pub settings: EncoderSettings,
}

/// 无需重新初始化时变化的字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamDelta {
    pub bit_rate: Option<u32>,
    pub frame_rate: Option<u32>,
    pub qp: Option<u32>,
}

impl ParamDelta {
    /// 没有任何字段变化
    pub fn is_empty(&self) -> bool {
        self.bit_rate.is_none() && self.frame_rate.is_none() && self.qp.is_none()
    }
}

/// 后端需要执行的参数更新
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUpdate {
    /// 使用完整参数重新初始化编码器
    Initialize(EncoderParams),
    /// 仅调整变化的字段 (可能为空)
    Adjust(ParamDelta),
}

impl ParamUpdate {
    pub fn is_initialize(&self) -> bool {
        matches!(self, Self::Initialize(_))
    }
}

/// 比较已生效参数与请求参数, 生成更新计划
pub fn plan_update(applied: Option<&EncoderParams>, requested: &EncoderParams) -> ParamUpdate {
    let Some(applied) = applied else {
        return ParamUpdate::Initialize(*requested);
    };

    let (old, new) = (&applied.settings, &requested.settings);
    if applied.width != requested.width
        || applied.height != requested.height
        || old.rate_control != new.rate_control
        || old.threads != new.threads
    {
        return ParamUpdate::Initialize(*requested);
    }

    let changed = |a: u32, b: u32| (a != b).then_some(b);
    let delta = match new.rate_control {
        RateControlMode::Vbr => ParamDelta {
            bit_rate: changed(old.bit_rate, new.bit_rate),
            frame_rate: changed(old.frame_rate, new.frame_rate),
            qp: None,
        },
        RateControlMode::Cqp => ParamDelta {
            bit_rate: None,
            frame_rate: None,
            qp: changed(old.qp, new.qp),
        },
    };
    ParamUpdate::Adjust(delta)
}
