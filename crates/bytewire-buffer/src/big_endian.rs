//! 大端序纯编解码层。
//!
//! # 层次定位（Why）
//! - 缓冲引擎把「边界校验」与「字节搬运」拆成两层：本模块只做搬运，
//!   不持有状态、不做越界判断，越界防护由 `ByteBuffer` 的状态机在调用前完成。
//! - 与 crate 内其它线缆编码保持一致：定宽数值最高有效字节在前，
//!   浮点取位模式（`to_bits`）后按整数编码，保证跨实现逐位一致。
//!
//! # 契约说明（What）
//! - 所有 `put_*` / `get_*` 要求入参切片长度不小于对应宽度常量，
//!   违反时为实现缺陷（`debug_assert` 捕获），不属于可恢复错误；
//! - 编码永不失败：定宽值必然装入已知宽度；
//! - `get_bool` 对任何非零字节返回 `true`，`put_bool` 只写出 `0` 或 `1`。

use core::fmt;

/// 布尔值编码宽度。
pub const BOOL_WIDTH: usize = 1;
/// 无符号/有符号单字节宽度。
pub const U8_WIDTH: usize = 1;
pub const I8_WIDTH: usize = 1;
/// 16 位整数宽度。
pub const U16_WIDTH: usize = 2;
pub const I16_WIDTH: usize = 2;
/// 32 位整数与单精度浮点宽度。
pub const U32_WIDTH: usize = 4;
pub const I32_WIDTH: usize = 4;
pub const F32_WIDTH: usize = 4;
/// 64 位整数与双精度浮点宽度。
pub const U64_WIDTH: usize = 8;
pub const I64_WIDTH: usize = 8;
pub const F64_WIDTH: usize = 8;
/// GUID 原始字节宽度。
pub const GUID_WIDTH: usize = 16;

/// 16 字节全局唯一标识，按不透明字节序列透传。
///
/// # 设计说明（Why / Trade-offs）
/// - 线缆格式只约定「16 个原始字节」，不约定内部字段的端序布局；
///   若对端平台的 GUID 字节化例程存在内部字段翻转，调用方需在传入前
///   自行完成等价变换，本类型不做任何规范化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; GUID_WIDTH]);

impl Guid {
    /// 由 16 个原始字节构造。
    pub const fn from_bytes(bytes: [u8; GUID_WIDTH]) -> Self {
        Self(bytes)
    }

    /// 借用内部字节。
    pub const fn as_bytes(&self) -> &[u8; GUID_WIDTH] {
        &self.0
    }

    /// 消耗自身并返回内部字节。
    pub const fn into_bytes(self) -> [u8; GUID_WIDTH] {
        self.0
    }

    /// 全零标识，常用于占位。
    pub const fn nil() -> Self {
        Self([0u8; GUID_WIDTH])
    }
}

impl fmt::Display for Guid {
    /// 以 8-4-4-4-12 的十六进制分组呈现，仅用于日志与排障。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if matches!(index, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// 写出布尔值：恒为 `0` 或 `1`。
pub fn put_bool(dst: &mut [u8], value: bool) {
    debug_assert!(dst.len() >= BOOL_WIDTH);
    dst[0] = u8::from(value);
}

/// 读取布尔值：任何非零字节视为 `true`。
pub fn get_bool(src: &[u8]) -> bool {
    debug_assert!(src.len() >= BOOL_WIDTH);
    src[0] != 0
}

pub fn put_u8(dst: &mut [u8], value: u8) {
    debug_assert!(dst.len() >= U8_WIDTH);
    dst[0] = value;
}

pub fn get_u8(src: &[u8]) -> u8 {
    debug_assert!(src.len() >= U8_WIDTH);
    src[0]
}

pub fn put_i8(dst: &mut [u8], value: i8) {
    put_u8(dst, value as u8);
}

pub fn get_i8(src: &[u8]) -> i8 {
    get_u8(src) as i8
}

pub fn put_u16(dst: &mut [u8], value: u16) {
    debug_assert!(dst.len() >= U16_WIDTH);
    dst[..U16_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u16(src: &[u8]) -> u16 {
    debug_assert!(src.len() >= U16_WIDTH);
    u16::from_be_bytes([src[0], src[1]])
}

pub fn put_i16(dst: &mut [u8], value: i16) {
    debug_assert!(dst.len() >= I16_WIDTH);
    dst[..I16_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_i16(src: &[u8]) -> i16 {
    debug_assert!(src.len() >= I16_WIDTH);
    i16::from_be_bytes([src[0], src[1]])
}

pub fn put_u32(dst: &mut [u8], value: u32) {
    debug_assert!(dst.len() >= U32_WIDTH);
    dst[..U32_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u32(src: &[u8]) -> u32 {
    debug_assert!(src.len() >= U32_WIDTH);
    u32::from_be_bytes([src[0], src[1], src[2], src[3]])
}

pub fn put_i32(dst: &mut [u8], value: i32) {
    debug_assert!(dst.len() >= I32_WIDTH);
    dst[..I32_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_i32(src: &[u8]) -> i32 {
    debug_assert!(src.len() >= I32_WIDTH);
    i32::from_be_bytes([src[0], src[1], src[2], src[3]])
}

pub fn put_u64(dst: &mut [u8], value: u64) {
    debug_assert!(dst.len() >= U64_WIDTH);
    dst[..U64_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u64(src: &[u8]) -> u64 {
    debug_assert!(src.len() >= U64_WIDTH);
    let mut raw = [0u8; U64_WIDTH];
    raw.copy_from_slice(&src[..U64_WIDTH]);
    u64::from_be_bytes(raw)
}

pub fn put_i64(dst: &mut [u8], value: i64) {
    debug_assert!(dst.len() >= I64_WIDTH);
    dst[..I64_WIDTH].copy_from_slice(&value.to_be_bytes());
}

pub fn get_i64(src: &[u8]) -> i64 {
    debug_assert!(src.len() >= I64_WIDTH);
    let mut raw = [0u8; I64_WIDTH];
    raw.copy_from_slice(&src[..I64_WIDTH]);
    i64::from_be_bytes(raw)
}

/// 单精度浮点：取位模式后按 32 位整数编码，保证逐位往返。
pub fn put_f32(dst: &mut [u8], value: f32) {
    put_u32(dst, value.to_bits());
}

pub fn get_f32(src: &[u8]) -> f32 {
    f32::from_bits(get_u32(src))
}

/// 双精度浮点：取位模式后按 64 位整数编码，保证逐位往返。
pub fn put_f64(dst: &mut [u8], value: f64) {
    put_u64(dst, value.to_bits());
}

pub fn get_f64(src: &[u8]) -> f64 {
    f64::from_bits(get_u64(src))
}

/// GUID 原样写出 16 字节，不做端序规范化。
pub fn put_guid(dst: &mut [u8], value: Guid) {
    debug_assert!(dst.len() >= GUID_WIDTH);
    dst[..GUID_WIDTH].copy_from_slice(value.as_bytes());
}

pub fn get_guid(src: &[u8]) -> Guid {
    debug_assert!(src.len() >= GUID_WIDTH);
    let mut raw = [0u8; GUID_WIDTH];
    raw.copy_from_slice(&src[..GUID_WIDTH]);
    Guid::from_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn u32_is_most_significant_byte_first() {
        let mut raw = [0u8; U32_WIDTH];
        put_u32(&mut raw, 0x1234_5678);
        assert_eq!(raw, [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(get_u32(&raw), 0x1234_5678);
    }

    #[test]
    fn signed_extremes_round_trip() {
        let mut raw = [0u8; I64_WIDTH];
        for value in [i64::MIN, -1, 0, 1, i64::MAX] {
            put_i64(&mut raw, value);
            assert_eq!(get_i64(&raw), value);
        }
        let mut raw16 = [0u8; I16_WIDTH];
        put_i16(&mut raw16, -2);
        assert_eq!(raw16, [0xff, 0xfe]);
    }

    #[test]
    fn float_round_trip_is_bit_exact() {
        let mut raw = [0u8; F64_WIDTH];
        for value in [0.0f64, -0.0, f64::MIN_POSITIVE, f64::NAN, f64::INFINITY] {
            put_f64(&mut raw, value);
            assert_eq!(get_f64(&raw).to_bits(), value.to_bits());
        }
        let mut raw32 = [0u8; F32_WIDTH];
        put_f32(&mut raw32, 1.5);
        assert_eq!(raw32, 1.5f32.to_bits().to_be_bytes());
    }

    #[test]
    fn bool_reads_any_nonzero_as_true() {
        let mut raw = [0u8; BOOL_WIDTH];
        put_bool(&mut raw, true);
        assert_eq!(raw, [1]);
        assert!(get_bool(&[0x80]));
        assert!(!get_bool(&[0]));
    }

    #[test]
    fn guid_is_opaque_passthrough() {
        let bytes: [u8; GUID_WIDTH] = core::array::from_fn(|i| i as u8);
        let mut raw = [0u8; GUID_WIDTH];
        put_guid(&mut raw, Guid::from_bytes(bytes));
        assert_eq!(raw, bytes);
        assert_eq!(get_guid(&raw).into_bytes(), bytes);
    }

    #[test]
    fn guid_display_uses_hyphenated_groups() {
        let guid = Guid::from_bytes([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ]);
        assert_eq!(guid.to_string(), "01020304-0506-0708-090a-0b0c0d0e0f10");
    }
}
