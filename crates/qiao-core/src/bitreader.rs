//! 比特流游标.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是 H.264 参数集解析的基础设施.
//!
//! 按大端位序读取 (MSB first). 游标内部维护一个 32 位前瞻累加器, 始终保存
//! 当前位置起的后 32 位 (越过缓冲区末尾的部分补零), Exp-Golomb 解码直接在累加器上
//! 统计前导零.
//!
//! 读取分两类:
//! - 严格读取 ([`BitCursor::read_bits`]): 剩余位数不足时返回 [`QiaoError::Eof`].
//! - 宽松读取 ([`BitCursor::read_bits_lenient`], [`BitCursor::read_ue`] 等):
//!   不足部分按 0 补齐, 游标停在末尾. 参数集解析只用于诊断, 采用宽松读取,
//!   但任何情况下都不会越过缓冲区边界.

use crate::cpu::LeadingZeroCounter;
use crate::{QiaoError, QiaoResult};

/// 比特流游标
///
/// # 示例
/// ```
/// use qiao_core::bitreader::BitCursor;
///
/// // 1 | 010 | 011 | 00100 => ue 值 0, 1, 2, 3
/// let data = [0b1010_0110, 0b0100_0000];
/// let mut bc = BitCursor::new(&data);
/// assert_eq!(bc.read_ue(), 0);
/// assert_eq!(bc.read_ue(), 1);
/// assert_eq!(bc.read_ue(), 2);
/// assert_eq!(bc.read_ue(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前位位置, 不超过 `data.len() * 8`
    position: usize,
    /// 从 `position` 起的 32 位, 缓冲区之外补零
    accumulator: u32,
    /// 前导零计数实现
    lzc: LeadingZeroCounter,
}

impl<'a> BitCursor<'a> {
    /// 创建新的比特流游标, 使用进程级检测到的前导零实现
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_counter(data, LeadingZeroCounter::detect())
    }

    /// 使用指定的前导零实现创建游标
    pub fn with_counter(data: &'a [u8], lzc: LeadingZeroCounter) -> Self {
        let mut bc = Self {
            data,
            position: 0,
            accumulator: 0,
            lzc,
        };
        bc.refill();
        bc
    }

    /// 已读取的总位数
    pub fn position(&self) -> usize {
        self.position
    }

    /// 缓冲区总位数
    pub fn total_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// 剩余可读位数
    pub fn bits_remaining(&self) -> usize {
        self.total_bits() - self.position
    }

    /// 是否已到达末尾
    pub fn is_exhausted(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// 是否字节对齐
    pub fn is_byte_aligned(&self) -> bool {
        self.position % 8 == 0
    }

    /// 根据当前位置重建累加器
    fn refill(&mut self) {
        let byte = self.position / 8;
        let shift = (self.position % 8) as u32;
        let mut window: u64 = 0;
        for i in 0..5 {
            let b = self.data.get(byte + i).copied().unwrap_or(0);
            window = (window << 8) | u64::from(b);
        }
        self.accumulator = ((window >> (8 - shift)) & 0xFFFF_FFFF) as u32;
    }

    /// 前进 `n` 位, 在末尾饱和
    fn advance(&mut self, n: usize) {
        self.position = self.position.saturating_add(n).min(self.total_bits());
        self.refill();
    }

    /// 查看接下来的 `n` 位 (n <= 32), 不移动游标, 末尾之外补零
    pub fn peek_bits(&self, n: u32) -> u32 {
        match n {
            0 => 0,
            1..=31 => self.accumulator >> (32 - n),
            _ => self.accumulator,
        }
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 剩余位数不足时返回 [`QiaoError::Eof`], 游标不移动.
    pub fn read_bits(&mut self, n: u32) -> QiaoResult<u32> {
        if n > 32 {
            return Err(QiaoError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if n as usize > self.bits_remaining() {
            return Err(QiaoError::Eof);
        }
        let value = self.peek_bits(n);
        self.advance(n as usize);
        Ok(value)
    }

    /// 宽松读取 N 个位 (最多 32 位)
    ///
    /// 剩余位数不足时只消耗剩余部分, 缺失的低位按 0 处理.
    pub fn read_bits_lenient(&mut self, n: u32) -> u32 {
        let n = n.min(32);
        let value = self.peek_bits(n);
        self.advance(n as usize);
        value
    }

    /// 宽松读取 1 位标志
    pub fn read_flag(&mut self) -> bool {
        self.read_bits_lenient(1) == 1
    }

    /// 跳过 N 位, 在末尾饱和
    pub fn skip_bits(&mut self, n: usize) {
        self.advance(n);
    }

    /// 跳到下一个字节边界
    pub fn align_to_byte(&mut self) {
        let rem = self.position % 8;
        if rem != 0 {
            self.advance(8 - rem);
        }
    }

    /// 读取无符号 Exp-Golomb 编码 ue(v)
    ///
    /// 前导零计数在剩余位数处饱和, 码流耗尽时用已有的位继续解码, 不返回错误.
    /// 前导零达到 32 个及以上时结果超出 u32 范围, 返回 `u32::MAX`.
    pub fn read_ue(&mut self) -> u32 {
        let mut zeros = 0usize;
        loop {
            let left = self.bits_remaining();
            if left == 0 {
                break;
            }
            let lz = self.lzc.count(self.accumulator) as usize;
            let step = lz.min(left);
            self.advance(step);
            zeros += step;
            if step < 32 {
                break;
            }
        }

        // 终止位 '1'
        self.advance(1);

        if zeros >= 32 {
            self.advance(zeros);
            return u32::MAX;
        }
        let raw = u64::from(self.read_bits_lenient(zeros as u32));
        let value = raw + (1u64 << zeros) - 1;
        value.min(u64::from(u32::MAX)) as u32
    }

    /// 读取有符号 Exp-Golomb 编码 se(v)
    ///
    /// 映射: 0 -> 0, 1 -> 1, 2 -> -1, 3 -> 2, 4 -> -2, ...
    pub fn read_se(&mut self) -> i32 {
        let k = i64::from(self.read_ue());
        let value = if k & 1 == 1 { (k + 1) / 2 } else { -(k / 2) };
        value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// 判断当前位置之后是否还有 RBSP 数据 (rbsp_trailing_bits 之前)
    ///
    /// 最后一个值为 1 的位是 rbsp_stop_one_bit, 游标位于它之前即认为还有数据.
    pub fn more_rbsp_data(&self) -> bool {
        let Some(last) = self.data.iter().rposition(|&b| b != 0) else {
            return false;
        };
        let stop_bit = last * 8 + 7 - self.data[last].trailing_zeros() as usize;
        self.position < stop_bit
    }
}
