//! 比特流写入器.
//!
//! 按大端位序写入 (MSB first), 与 [`BitCursor`](crate::bitreader::BitCursor) 对应.
//! 主要用于构造参数集与 NAL 单元 (测试夹具、基准数据).

/// 比特流写入器
///
/// # 示例
/// ```
/// use qiao_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ue(1);
/// bw.write_flag(true);
/// let data = bw.finish();
/// assert_eq!(data, vec![0b1011_0101]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_flag(&mut self, bit: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(bit);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位), 值的低 N 位高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in (0..n.min(32)).rev() {
            self.write_flag((value >> i) & 1 == 1);
        }
    }

    /// 写入无符号 Exp-Golomb 编码 ue(v)
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let len = 64 - code.leading_zeros();
        for _ in 0..len - 1 {
            self.write_flag(false);
        }
        for i in (0..len).rev() {
            self.write_flag((code >> i) & 1 == 1);
        }
    }

    /// 写入有符号 Exp-Golomb 编码 se(v)
    pub fn write_se(&mut self, value: i32) {
        let v = i64::from(value);
        let mapped = if v > 0 { 2 * v - 1 } else { -2 * v };
        self.write_ue(mapped as u32);
    }

    /// 写入 rbsp_trailing_bits: 一个 '1' 后补零到字节边界
    pub fn write_trailing_bits(&mut self) {
        self.write_flag(true);
        while self.bit_count != 0 {
            self.write_flag(false);
        }
    }

    /// 完成写入, 未满的字节低位补零
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.data.push(self.current_byte << (8 - self.bit_count));
        }
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ue_编码() {
        let mut bw = BitWriter::new();
        // 1 | 010 | 011 | 00100
        for v in 0..4 {
            bw.write_ue(v);
        }
        assert_eq!(bw.bits_written(), 12);
        assert_eq!(bw.finish(), vec![0b1010_0110, 0b0100_0000]);
    }

    #[test]
    fn test_se_编码() {
        let mut bw = BitWriter::new();
        // se(-1) => ue(2) => 011, se(1) => ue(1) => 010
        bw.write_se(-1);
        bw.write_se(1);
        bw.write_trailing_bits();
        assert_eq!(bw.finish(), vec![0b0110_1010]);
    }
}
