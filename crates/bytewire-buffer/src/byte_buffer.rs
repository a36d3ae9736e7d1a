use alloc::{format, string::String, sync::Arc, vec::Vec};
use core::{fmt, mem};

use bytes::BytesMut;
use bytewire_core::{BlockPool, BufError, Result, error::codes};

use crate::big_endian::{self, Guid};
use crate::pool::SlabBlockPool;

/// 隐式扩容的块对齐粒度：写入触发的扩容按该倍数向上取整，摊平
/// 连续小写入的增长成本；显式 `set_capacity` 不做取整。
const GROW_CHUNK: usize = 256;

/// 缓冲后备存储的三种形态。
///
/// - `Pooled`：块从池租借；`Clear` 之后块可能暂时缺位（`None`），
///   下一次扩容重新租借；
/// - `Wrapped`：调用方移交的固定存储，只能通过 [`ByteBuffer::into_inner`] 取回；
/// - `Released`：释放后的终态，任何后续操作以 `buffer.disposed` 失败。
enum Storage {
    Pooled {
        block: Option<BytesMut>,
        pool: Arc<dyn BlockPool>,
    },
    Wrapped(Vec<u8>),
    Released,
}

/// 包装调用方存储时的模式开关。
///
/// 两个开关都在构造时一次性固定：`writable` 关闭后所有写入与扩容操作
/// 立即失败；`exposable` 决定能否取得底层存储的实时视图。
/// 包装缓冲**永远不可扩容**——固定存储上的扩容是自相矛盾的。
#[derive(Debug, Clone, Copy)]
pub struct WrapOptions {
    pub writable: bool,
    pub exposable: bool,
}

impl Default for WrapOptions {
    /// 默认可写、不可暴露，与「调用方移交存储」场景的最小权限一致。
    fn default() -> Self {
        Self {
            writable: true,
            exposable: false,
        }
    }
}

/// `ByteBuffer` 是可增长的位置寻址字节缓冲，承载大端序定宽编解码、
/// 长度前缀字符串与原始字节段的读写。
///
/// # 设计动机（Why）
/// - 线缆协议与文件格式代码需要在同一块内存上完成「序列化 → 回卷 → 反序列化」，
///   若每条消息分配新缓冲，高频路径会被分配与释放主导；
/// - 历史上同类缓冲往往衍生出多个近似变体（池化与否、可扩容与否、只读与否），
///   本类型以构造期固定的模式开关收敛为单一实现。
///
/// # 状态模型（How）
/// - 三元状态：`capacity`（可用存储上界）、`length`（已写数据的高水位）、
///   `position`（下一次顺序读写的游标），恒满足
///   `position <= capacity` 且 `length <= capacity`；
/// - 写入越过 `length` 时抬升水位；容量不足且可扩容时，
///   经池完成「租新块 → 拷贝 → 归还旧块」的换块流程；
/// - 读取前先校验 `remaining = length - position`，不足即以
///   `buffer.underrun` 失败且游标不动。
///
/// # 失败语义（What）
/// - 所有前置校验先于任何状态变更执行：失败调用结束后，游标、水位、
///   容量与底层字节与调用前完全一致，调用方修正输入后可安全重试；
/// - 错误码见 [`bytewire_core::error::codes`]。
///
/// # 并发与生命周期（Trade-offs）
/// - 单一所有者、同步、无内部锁；跨缓冲共享同一个池时，
///   线程安全由池实现负责；
/// - `Drop` 自动执行 [`release`](Self::release)，池租借的块在所有退出路径上
///   恰好归还一次；重复释放是无害的空操作。
pub struct ByteBuffer {
    storage: Storage,
    origin: usize,
    capacity: usize,
    length: usize,
    position: usize,
    writable: bool,
    expandable: bool,
    exposable: bool,
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("origin", &self.origin)
            .field("capacity", &self.capacity)
            .field("length", &self.length)
            .field("position", &self.position)
            .field("writable", &self.writable)
            .field("expandable", &self.expandable)
            .field("exposable", &self.exposable)
            .finish_non_exhaustive()
    }
}

impl ByteBuffer {
    /// 从进程级默认池租借存储，构造可写、可扩容、可暴露的缓冲。
    pub fn with_capacity(capacity: usize) -> Result<Self, BufError> {
        Self::with_pool(SlabBlockPool::global(), capacity)
    }

    /// 从显式注入的池租借存储。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`pool` 的生命周期覆盖缓冲的整个存续期；
    /// - **后置条件**：`capacity() == capacity`、`len() == 0`、`position() == 0`，
    ///   模式为可写、可扩容、可暴露、池化；
    /// - 租入块按约定视为陈旧数据，构造时对 `[0, capacity)` 防御性清零。
    pub fn with_pool(pool: Arc<dyn BlockPool>, capacity: usize) -> Result<Self, BufError> {
        let mut block = pool.rent(capacity)?;
        block.resize(capacity, 0);
        Ok(Self {
            storage: Storage::Pooled {
                block: Some(block),
                pool,
            },
            origin: 0,
            capacity,
            length: 0,
            position: 0,
            writable: true,
            expandable: true,
            exposable: true,
        })
    }

    /// 在调用方存储的 `[offset, offset + count)` 区间上构造固定视图。
    ///
    /// # 契约说明（What）
    /// - **输入**：`storage` 按值移交（经 [`into_inner`](Self::into_inner) 取回）；
    ///   要求 `offset + count <= storage.len()`，否则 `buffer.out_of_range`；
    /// - **后置条件**：`capacity() == count`、`len() == count`（既有内容视为
    ///   有效数据）、`position() == 0`；不可扩容；区间外的字节不被触碰。
    pub fn wrap(
        storage: Vec<u8>,
        offset: usize,
        count: usize,
        options: WrapOptions,
    ) -> Result<Self, BufError> {
        let span_ok = offset
            .checked_add(count)
            .is_some_and(|end| end <= storage.len());
        if !span_ok {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!(
                    "ByteBuffer::wrap 区间 [{offset}, {offset}+{count}) 超出存储长度 {}",
                    storage.len()
                ),
            ));
        }
        Ok(Self {
            storage: Storage::Wrapped(storage),
            origin: offset,
            capacity: count,
            length: count,
            position: 0,
            writable: options.writable,
            expandable: false,
            exposable: options.exposable,
        })
    }

    /// 当前容量：自逻辑起点起可用的字节数。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 已写数据的高水位。
    pub fn len(&self) -> usize {
        self.length
    }

    /// 水位是否为零。
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// 下一次顺序读写的游标。
    pub fn position(&self) -> usize {
        self.position
    }

    /// 剩余可顺序读取的字节数（`length - position`，下溢饱和为 0）。
    pub fn remaining(&self) -> usize {
        self.length.saturating_sub(self.position)
    }

    /// 是否禁止写入与扩容。
    pub fn is_read_only(&self) -> bool {
        !self.writable
    }

    /// 是否允许容量增长。
    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    /// 是否允许取得底层存储的实时视图。
    pub fn is_exposable(&self) -> bool {
        self.exposable
    }

    /// 后备存储是否来自池租借。
    pub fn is_pooled(&self) -> bool {
        matches!(self.storage, Storage::Pooled { .. })
    }

    /// 缓冲是否已释放。
    pub fn is_released(&self) -> bool {
        matches!(self.storage, Storage::Released)
    }

    /// 设置游标。
    ///
    /// 边界值 `capacity` 被接受——这是顺序写抵达末尾后的自然状态；
    /// 超出容量以 `buffer.out_of_range` 失败。
    pub fn set_position(&mut self, value: usize) -> Result<(), BufError> {
        self.ensure_live("set_position")?;
        if value > self.capacity {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!(
                    "ByteBuffer::set_position 目标 {value} 超出容量 {}",
                    self.capacity
                ),
            ));
        }
        self.position = value;
        Ok(())
    }

    /// 设置水位；超出容量时沿隐式扩容路径增长（块对齐取整）。
    ///
    /// 收缩水位会同步钳制游标，维持 `position <= length` 的读侧预期。
    pub fn set_len(&mut self, value: usize) -> Result<(), BufError> {
        self.ensure_live("set_len")?;
        self.ensure_writable("set_len")?;
        if value > self.capacity {
            self.ensure_capacity(value)?;
        }
        self.length = value;
        if self.position > value {
            self.position = value;
        }
        Ok(())
    }

    /// 显式调整容量。
    ///
    /// # 契约说明（What）
    /// - 收缩：先对被裁剪区间防御性清零，再将 `length`/`position` 钳入新界；
    /// - 增长：要求可扩容，且**精确**采用请求值（块对齐仅适用于写入触发的
    ///   隐式路径）；
    /// - 失败时（只读 / 不可扩容）缓冲保持调用前状态。
    pub fn set_capacity(&mut self, value: usize) -> Result<(), BufError> {
        self.ensure_live("set_capacity")?;
        self.ensure_writable("set_capacity")?;
        if value == self.capacity {
            return Ok(());
        }
        if value > self.capacity {
            self.ensure_expandable("set_capacity")?;
            self.grow_to(value)
        } else {
            self.shrink_to(value);
            Ok(())
        }
    }

    /// 丢弃全部内容并完全释放容量。
    ///
    /// 池化存储立即归还池（后续写入重新租借）；包装存储对
    /// `[origin, origin + capacity)` 清零。操作幂等。
    pub fn clear(&mut self) -> Result<(), BufError> {
        self.ensure_live("clear")?;
        self.ensure_writable("clear")?;
        self.shrink_to(0);
        Ok(())
    }

    /// 把容量收敛到当前水位，释放未用的尾部空间。
    pub fn trim(&mut self) -> Result<(), BufError> {
        self.ensure_live("trim")?;
        if self.capacity == self.length {
            return Ok(());
        }
        self.ensure_writable("trim")?;
        self.shrink_to(self.length);
        Ok(())
    }

    /// 游标回卷到逻辑起点；水位与容量不变。
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// 随机读取单字节，以**物理存储**长度为上界。
    ///
    /// 与 [`set`](Self::set) 的边界不对称是有意保留的：读取允许触达
    /// 逻辑起点之后的整个物理区间，写入只允许落在已有水位之内。
    pub fn get(&self, index: usize) -> Result<u8, BufError> {
        self.ensure_live("get")?;
        let physical_span = self.physical().len().saturating_sub(self.origin);
        if index >= physical_span {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!("ByteBuffer::get 索引 {index} 超出物理区间 {physical_span}"),
            ));
        }
        Ok(self.physical()[self.origin + index])
    }

    /// 随机写入单字节，以当前水位为上界。
    pub fn set(&mut self, index: usize, value: u8) -> Result<(), BufError> {
        self.ensure_live("set")?;
        self.ensure_writable("set")?;
        if index >= self.length {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!("ByteBuffer::set 索引 {index} 超出水位 {}", self.length),
            ));
        }
        let at = self.origin + index;
        self.physical_mut()[at] = value;
        Ok(())
    }

    /// 写入布尔值（1 字节，恒为 0 或 1）。
    pub fn write_bool(&mut self, value: bool) -> Result<(), BufError> {
        self.write_with(big_endian::BOOL_WIDTH, "write_bool", |dst| {
            big_endian::put_bool(dst, value);
        })
    }

    /// 读取布尔值；任何非零字节视为 `true`。
    pub fn read_bool(&mut self) -> Result<bool, BufError> {
        self.read_with(big_endian::BOOL_WIDTH, "read_bool", big_endian::get_bool)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), BufError> {
        self.write_with(big_endian::U8_WIDTH, "write_u8", |dst| {
            big_endian::put_u8(dst, value);
        })
    }

    pub fn read_u8(&mut self) -> Result<u8, BufError> {
        self.read_with(big_endian::U8_WIDTH, "read_u8", big_endian::get_u8)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), BufError> {
        self.write_with(big_endian::I8_WIDTH, "write_i8", |dst| {
            big_endian::put_i8(dst, value);
        })
    }

    pub fn read_i8(&mut self) -> Result<i8, BufError> {
        self.read_with(big_endian::I8_WIDTH, "read_i8", big_endian::get_i8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), BufError> {
        self.write_with(big_endian::U16_WIDTH, "write_u16", |dst| {
            big_endian::put_u16(dst, value);
        })
    }

    pub fn read_u16(&mut self) -> Result<u16, BufError> {
        self.read_with(big_endian::U16_WIDTH, "read_u16", big_endian::get_u16)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), BufError> {
        self.write_with(big_endian::I16_WIDTH, "write_i16", |dst| {
            big_endian::put_i16(dst, value);
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, BufError> {
        self.read_with(big_endian::I16_WIDTH, "read_i16", big_endian::get_i16)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), BufError> {
        self.write_with(big_endian::U32_WIDTH, "write_u32", |dst| {
            big_endian::put_u32(dst, value);
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, BufError> {
        self.read_with(big_endian::U32_WIDTH, "read_u32", big_endian::get_u32)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), BufError> {
        self.write_with(big_endian::I32_WIDTH, "write_i32", |dst| {
            big_endian::put_i32(dst, value);
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, BufError> {
        self.read_with(big_endian::I32_WIDTH, "read_i32", big_endian::get_i32)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), BufError> {
        self.write_with(big_endian::U64_WIDTH, "write_u64", |dst| {
            big_endian::put_u64(dst, value);
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, BufError> {
        self.read_with(big_endian::U64_WIDTH, "read_u64", big_endian::get_u64)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), BufError> {
        self.write_with(big_endian::I64_WIDTH, "write_i64", |dst| {
            big_endian::put_i64(dst, value);
        })
    }

    pub fn read_i64(&mut self) -> Result<i64, BufError> {
        self.read_with(big_endian::I64_WIDTH, "read_i64", big_endian::get_i64)
    }

    /// 写入单精度浮点（按位模式编码，逐位往返）。
    pub fn write_f32(&mut self, value: f32) -> Result<(), BufError> {
        self.write_with(big_endian::F32_WIDTH, "write_f32", |dst| {
            big_endian::put_f32(dst, value);
        })
    }

    pub fn read_f32(&mut self) -> Result<f32, BufError> {
        self.read_with(big_endian::F32_WIDTH, "read_f32", big_endian::get_f32)
    }

    /// 写入双精度浮点（按位模式编码，逐位往返）。
    pub fn write_f64(&mut self, value: f64) -> Result<(), BufError> {
        self.write_with(big_endian::F64_WIDTH, "write_f64", |dst| {
            big_endian::put_f64(dst, value);
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, BufError> {
        self.read_with(big_endian::F64_WIDTH, "read_f64", big_endian::get_f64)
    }

    /// 写入 16 字节 GUID（不透明透传，无端序规范化）。
    pub fn write_guid(&mut self, value: Guid) -> Result<(), BufError> {
        self.write_with(big_endian::GUID_WIDTH, "write_guid", |dst| {
            big_endian::put_guid(dst, value);
        })
    }

    pub fn read_guid(&mut self) -> Result<Guid, BufError> {
        self.read_with(big_endian::GUID_WIDTH, "read_guid", big_endian::get_guid)
    }

    /// 把 `src[offset, offset + count)` 追加写入游标处。
    ///
    /// 源区间越界以 `buffer.out_of_range` 失败，且缓冲不发生任何变更。
    pub fn write_bytes(&mut self, src: &[u8], offset: usize, count: usize) -> Result<(), BufError> {
        let span_ok = offset
            .checked_add(count)
            .is_some_and(|end| end <= src.len());
        if !span_ok {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!(
                    "ByteBuffer::write_bytes 源区间 [{offset}, {offset}+{count}) 超出切片长度 {}",
                    src.len()
                ),
            ));
        }
        self.write_with(count, "write_bytes", |dst| {
            dst.copy_from_slice(&src[offset..offset + count]);
        })
    }

    /// 从游标处顺序读出 `count` 字节到 `dst[offset, offset + count)`。
    pub fn read_bytes(&mut self, dst: &mut [u8], offset: usize, count: usize) -> Result<(), BufError> {
        let span_ok = offset
            .checked_add(count)
            .is_some_and(|end| end <= dst.len());
        if !span_ok {
            return Err(BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!(
                    "ByteBuffer::read_bytes 目标区间 [{offset}, {offset}+{count}) 超出切片长度 {}",
                    dst.len()
                ),
            ));
        }
        self.read_with(count, "read_bytes", |src| {
            dst[offset..offset + count].copy_from_slice(src);
        })
    }

    /// 写入长度前缀字符串：u16 大端字节数前缀 + UTF-8 负载，返回总写入字节数。
    ///
    /// # 契约说明（What）
    /// - 负载超过 `0xFFFF` 字节时以 `codec.string_overflow` 失败，**不写入任何
    ///   字节**（无截断、无半写前缀）；
    /// - 前缀与负载在一次容量保障内原子落盘；
    /// - 空字符串合法：写出 2 字节零前缀。
    pub fn write_str(&mut self, value: &str) -> Result<usize, BufError> {
        self.ensure_live("write_str")?;
        self.ensure_writable("write_str")?;
        let payload = value.as_bytes();
        if payload.len() > usize::from(u16::MAX) {
            return Err(BufError::new(
                codes::CODEC_STRING_OVERFLOW,
                format!(
                    "ByteBuffer::write_str 负载 {} 字节，超出 u16 前缀上限 {}",
                    payload.len(),
                    u16::MAX
                ),
            ));
        }
        let total = big_endian::U16_WIDTH + payload.len();
        let end = self.writable_end(total, "write_str")?;
        self.ensure_capacity(end)?;
        let start = self.origin + self.position;
        {
            let dst = &mut self.physical_mut()[start..start + total];
            big_endian::put_u16(dst, payload.len() as u16);
            dst[big_endian::U16_WIDTH..].copy_from_slice(payload);
        }
        self.commit_write(end);
        Ok(total)
    }

    /// 读取长度前缀字符串。
    ///
    /// 前缀与负载的可用性在推进游标之前一并校验：欠载或非法 UTF-8
    /// 均使游标停留在调用前的位置。
    pub fn read_str(&mut self) -> Result<String, BufError> {
        self.ensure_live("read_str")?;
        let remaining = self.remaining();
        if remaining < big_endian::U16_WIDTH {
            return Err(BufError::new(
                codes::BUFFER_UNDERRUN,
                format!("ByteBuffer::read_str 长度前缀需要 2 字节，剩余 {remaining}"),
            ));
        }
        let start = self.origin + self.position;
        let payload_len =
            usize::from(big_endian::get_u16(&self.physical()[start..start + big_endian::U16_WIDTH]));
        let total = big_endian::U16_WIDTH + payload_len;
        if remaining < total {
            return Err(BufError::new(
                codes::BUFFER_UNDERRUN,
                format!("ByteBuffer::read_str 需要 {total} 字节，剩余 {remaining}"),
            ));
        }
        let body = &self.physical()[start + big_endian::U16_WIDTH..start + total];
        let text = core::str::from_utf8(body).map_err(|err| {
            BufError::new(
                codes::CODEC_INVALID_UTF8,
                format!("ByteBuffer::read_str 负载不是合法 UTF-8：{err}"),
            )
        })?;
        let owned = String::from(text);
        self.position += total;
        Ok(owned)
    }

    /// 尝试取得剩余区间 `[position, length)` 的实时只读视图。
    ///
    /// 不可暴露或已释放时返回 `None`；视图与缓冲共享存储，不是拷贝。
    pub fn try_expose(&self) -> Option<&[u8]> {
        if !self.exposable || self.is_released() {
            return None;
        }
        let start = self.origin + self.position.min(self.length);
        let end = self.origin + self.length;
        Some(&self.physical()[start..end])
    }

    /// 取得剩余区间的实时可写视图；经由视图的修改直接作用于缓冲。
    pub fn expose_mut(&mut self) -> Result<&mut [u8], BufError> {
        self.ensure_live("expose_mut")?;
        self.ensure_writable("expose_mut")?;
        if !self.exposable {
            return Err(BufError::new(
                codes::BUFFER_NOT_EXPOSABLE,
                "ByteBuffer 未开启暴露能力，拒绝移交实时视图",
            ));
        }
        let start = self.origin + self.position.min(self.length);
        let end = self.origin + self.length;
        Ok(&mut self.physical_mut()[start..end])
    }

    /// 返回 `[0, length)` 的独立拷贝；空缓冲或已释放时返回空 `Vec`。
    pub fn to_vec(&self) -> Vec<u8> {
        let start = self.origin;
        let end = self.origin + self.length;
        self.physical()
            .get(start..end)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// 取回包装构造时移交的存储。
    ///
    /// 池化缓冲的存储归属于池，拒绝移交（`buffer.not_owned`）并将块
    /// 原路归还；已释放的缓冲报告 `buffer.disposed`。
    pub fn into_inner(mut self) -> Result<Vec<u8>, BufError> {
        match mem::replace(&mut self.storage, Storage::Released) {
            Storage::Wrapped(storage) => Ok(storage),
            Storage::Pooled { block, pool } => {
                if let Some(block) = block {
                    pool.hand_back(block);
                }
                Err(BufError::new(
                    codes::BUFFER_NOT_OWNED,
                    "ByteBuffer 的池化存储归属于池，无法移交调用方",
                ))
            }
            Storage::Released => Err(BufError::new(
                codes::BUFFER_DISPOSED,
                "ByteBuffer 已释放，无存储可移交",
            )),
        }
    }

    /// 释放缓冲：池租借的块恰好归还一次；重复调用为空操作。
    pub fn release(&mut self) {
        let storage = mem::replace(&mut self.storage, Storage::Released);
        if let Storage::Pooled {
            block: Some(block),
            pool,
        } = storage
        {
            pool.hand_back(block);
        }
        self.capacity = 0;
        self.length = 0;
        self.position = 0;
    }

    /// 保证 `[0, target)` 落在容量之内，必要时沿隐式路径扩容。
    ///
    /// # 执行逻辑（How）
    /// 1. 容量已足则直接返回；
    /// 2. 目标向上取整到 [`GROW_CHUNK`] 的整数倍，摊平连续小写入的增长成本；
    /// 3. 先向池租入新块并确认可用，再拷贝 `[0, old_capacity)`、归还旧块——
    ///    失败的扩容不会丢弃任何既有状态。
    fn ensure_capacity(&mut self, target: usize) -> Result<(), BufError> {
        if self.capacity >= target {
            return Ok(());
        }
        self.ensure_expandable("ensure_capacity")?;
        let rounded = target
            .div_ceil(GROW_CHUNK)
            .checked_mul(GROW_CHUNK)
            .unwrap_or(target);
        self.grow_to(rounded)
    }

    /// 换块扩容；调用方已完成可扩容校验。
    fn grow_to(&mut self, new_capacity: usize) -> Result<(), BufError> {
        let old_capacity = self.capacity;
        match &mut self.storage {
            Storage::Pooled { block, pool } => {
                let mut fresh = pool.rent(new_capacity)?;
                fresh.resize(new_capacity, 0);
                if let Some(old) = block.take() {
                    fresh[..old_capacity].copy_from_slice(&old[..old_capacity]);
                    pool.hand_back(old);
                }
                *block = Some(fresh);
                self.capacity = new_capacity;
                Ok(())
            }
            Storage::Wrapped(_) | Storage::Released => {
                unreachable!("ensure_expandable 已保证存储为池化形态")
            }
        }
    }

    /// 收缩容量：先清零被裁剪区间，再钳制水位与游标。
    ///
    /// 收缩到 0 的池化缓冲把块整体归还池，等价于「完全释放但仍可再生长」。
    fn shrink_to(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity;
        let origin = self.origin;
        let discarded = &mut self.physical_mut()[origin + new_capacity..origin + old_capacity];
        discarded.fill(0);
        if new_capacity == 0 {
            if let Storage::Pooled { block, pool } = &mut self.storage {
                if let Some(block) = block.take() {
                    pool.hand_back(block);
                }
            }
        }
        self.capacity = new_capacity;
        self.length = self.length.min(new_capacity);
        self.position = self.position.min(new_capacity);
    }

    /// 定宽写入骨架：校验 → 保障容量 → 编码 → 推进游标与水位。
    fn write_with(
        &mut self,
        width: usize,
        op: &'static str,
        encode: impl FnOnce(&mut [u8]),
    ) -> Result<(), BufError> {
        self.ensure_live(op)?;
        self.ensure_writable(op)?;
        let end = self.writable_end(width, op)?;
        self.ensure_capacity(end)?;
        let start = self.origin + self.position;
        encode(&mut self.physical_mut()[start..start + width]);
        self.commit_write(end);
        Ok(())
    }

    /// 定宽读取骨架：剩余校验 → 解码 → 推进游标。
    fn read_with<T>(
        &mut self,
        width: usize,
        op: &'static str,
        decode: impl FnOnce(&[u8]) -> T,
    ) -> Result<T, BufError> {
        self.ensure_live(op)?;
        let remaining = self.remaining();
        if remaining < width {
            return Err(BufError::new(
                codes::BUFFER_UNDERRUN,
                format!("ByteBuffer::{op} 需要 {width} 字节，剩余 {remaining}"),
            ));
        }
        let start = self.origin + self.position;
        let value = decode(&self.physical()[start..start + width]);
        self.position += width;
        Ok(value)
    }

    /// 计算本次写入的结束位置，溢出按越界报告。
    fn writable_end(&self, width: usize, op: &'static str) -> Result<usize, BufError> {
        self.position.checked_add(width).ok_or_else(|| {
            BufError::new(
                codes::BUFFER_OUT_OF_RANGE,
                format!("ByteBuffer::{op} 写入终点溢出地址空间"),
            )
        })
    }

    /// 提交写入：推进游标并抬升水位。
    fn commit_write(&mut self, end: usize) {
        self.position = end;
        if end > self.length {
            self.length = end;
        }
    }

    /// 缓冲仍然存活，否则 `buffer.disposed`。
    fn ensure_live(&self, op: &'static str) -> Result<(), BufError> {
        if self.is_released() {
            return Err(BufError::new(
                codes::BUFFER_DISPOSED,
                format!("ByteBuffer 已释放，无法执行 {op}"),
            ));
        }
        Ok(())
    }

    /// 缓冲可写，否则 `buffer.read_only`。
    fn ensure_writable(&self, op: &'static str) -> Result<(), BufError> {
        if self.writable {
            Ok(())
        } else {
            Err(BufError::new(
                codes::BUFFER_READ_ONLY,
                format!("ByteBuffer 为只读模式，无法执行 {op}"),
            ))
        }
    }

    /// 缓冲可扩容，否则 `buffer.not_expandable`。
    fn ensure_expandable(&self, op: &'static str) -> Result<(), BufError> {
        if self.expandable {
            Ok(())
        } else {
            Err(BufError::new(
                codes::BUFFER_NOT_EXPANDABLE,
                format!("ByteBuffer 容量固定，无法在 {op} 中扩容"),
            ))
        }
    }

    /// 整个物理存储的只读切片；块缺位或已释放时为空。
    fn physical(&self) -> &[u8] {
        match &self.storage {
            Storage::Pooled {
                block: Some(block), ..
            } => block.as_ref(),
            Storage::Pooled { block: None, .. } | Storage::Released => &[],
            Storage::Wrapped(storage) => storage.as_slice(),
        }
    }

    /// 整个物理存储的可写切片。
    fn physical_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Pooled {
                block: Some(block), ..
            } => block.as_mut(),
            Storage::Pooled { block: None, .. } | Storage::Released => &mut [],
            Storage::Wrapped(storage) => storage.as_mut_slice(),
        }
    }
}

impl Drop for ByteBuffer {
    /// 所有退出路径上保证池块恰好归还一次；`release` 幂等，
    /// 显式释放后再 `Drop` 是无害的空操作。
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// 隐式扩容按 256 字节块对齐，显式 set_capacity 不取整。
    #[test]
    fn implicit_growth_rounds_to_chunk() {
        let mut buf = ByteBuffer::with_capacity(0).expect("构造空缓冲");
        buf.write_u8(1).expect("首次写入触发扩容");
        assert_eq!(buf.capacity(), GROW_CHUNK);
        buf.set_capacity(300).expect("显式扩容");
        assert_eq!(buf.capacity(), 300);
    }

    #[test]
    fn shrink_zeroes_discarded_region_and_clamps() {
        let mut buf = ByteBuffer::with_capacity(16).expect("构造缓冲");
        buf.write_bytes(&[0xAB; 8], 0, 8).expect("写入负载");
        buf.set_capacity(4).expect("收缩容量");
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.position(), 4);
        // 被裁剪区间必须清零：重新扩容后读到的是 0 而非旧数据。
        buf.set_capacity(8).expect("重新扩容");
        buf.set_len(8).expect("抬升水位");
        buf.set_position(4).expect("回卷到裁剪点");
        assert_eq!(buf.read_u32().expect("读取裁剪区"), 0);
    }

    #[test]
    fn wrapped_storage_rejects_out_of_range_span() {
        let err = ByteBuffer::wrap(vec![0u8; 8], 6, 4, WrapOptions::default())
            .expect_err("越界区间必须拒绝");
        assert_eq!(err.code(), codes::BUFFER_OUT_OF_RANGE);
    }

    #[test]
    fn get_and_set_bounds_are_asymmetric() {
        let mut buf = ByteBuffer::with_capacity(8).expect("构造缓冲");
        buf.write_u16(0x0102).expect("写入两字节");
        // get 以物理区间为上界：水位之外、容量之内可读。
        assert_eq!(buf.get(7).expect("物理区间内读取"), 0);
        // set 以水位为上界。
        let err = buf.set(2, 0xFF).expect_err("越过水位写入必须失败");
        assert_eq!(err.code(), codes::BUFFER_OUT_OF_RANGE);
        buf.set(1, 0x7F).expect("水位内写入");
        assert_eq!(buf.get(1).expect("回读"), 0x7F);
    }

    #[test]
    fn operations_after_release_report_disposed() {
        let mut buf = ByteBuffer::with_capacity(8).expect("构造缓冲");
        buf.release();
        buf.release();
        let err = buf.write_u8(1).expect_err("释放后写入必须失败");
        assert_eq!(err.code(), codes::BUFFER_DISPOSED);
        assert!(buf.to_vec().is_empty());
    }
}
