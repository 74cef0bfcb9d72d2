//! CPU 特性检测.
//!
//! Exp-Golomb 解码需要频繁统计前导零. 在支持 LZCNT 指令的 x86 处理器上直接使用硬件计数,
//! 否则退回到可移植实现. 检测只执行一次, 结果缓存在进程级的 [`OnceLock`] 中.

use std::sync::OnceLock;

/// 前导零计数实现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadingZeroCounter {
    /// 硬件 LZCNT 指令
    Hardware,
    /// 可移植实现 (逐步折半)
    Portable,
}

static DETECTED: OnceLock<LeadingZeroCounter> = OnceLock::new();

impl LeadingZeroCounter {
    /// 返回当前进程检测到的实现 (首次调用时检测)
    pub fn detect() -> Self {
        *DETECTED.get_or_init(|| {
            let counter = if has_lzcnt() {
                Self::Hardware
            } else {
                Self::Portable
            };
            log::debug!("前导零计数实现: {:?}", counter);
            counter
        })
    }

    /// 统计 32 位值的前导零个数, `value == 0` 时返回 32
    #[inline]
    pub fn count(self, value: u32) -> u32 {
        match self {
            Self::Hardware => value.leading_zeros(),
            Self::Portable => portable_leading_zeros(value),
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn has_lzcnt() -> bool {
    std::arch::is_x86_feature_detected!("lzcnt")
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn has_lzcnt() -> bool {
    false
}

/// 二分法统计前导零
fn portable_leading_zeros(mut value: u32) -> u32 {
    if value == 0 {
        return 32;
    }
    let mut n = 0;
    if value & 0xFFFF_0000 == 0 {
        n += 16;
        value <<= 16;
    }
    if value & 0xFF00_0000 == 0 {
        n += 8;
        value <<= 8;
    }
    if value & 0xF000_0000 == 0 {
        n += 4;
        value <<= 4;
    }
    if value & 0xC000_0000 == 0 {
        n += 2;
        value <<= 2;
    }
    if value & 0x8000_0000 == 0 {
        n += 1;
    }
    n
}
