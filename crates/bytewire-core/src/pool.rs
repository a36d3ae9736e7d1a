use bytes::BytesMut;

use crate::{BufError, Result};

/// `BlockPool` 描述缓冲引擎消费的内存池能力：租借与归还定长字节块。
///
/// # 设计背景（Why）
/// - 缓冲引擎按「租借 → 使用 → 扩容换块 → 归还」的生命周期消费池化内存，
///   把池抽象为显式注入的能力接口，才能在测试中替换为统计替身，
///   而不是隐式依赖进程级全局分配器。
/// - 块统一采用 [`BytesMut`] 作为流通货币：其容量语义与引用计数语义
///   与自由链表复用天然契合。
///
/// # 契约说明（What）
/// - **`rent`**：返回 `capacity() >= min_capacity` 的块；块内容**必须假定为
///   陈旧数据**（可能来自上一位租户），调用方需自行决定清零策略。
/// - **`hand_back`**：每个块至多归还一次；归还后调用方不得再持有或访问该块。
/// - **`shrink_to_fit`**：清空池内缓存的空闲块，返回释放的字节数。
/// - **`statistics`**：返回当前统计快照，仅用于观测，不构成同步语义。
///
/// # 并发与前置条件（Trade-offs）
/// - 若同一个池被多个缓冲跨线程共享，线程安全完全由池实现负责
///   （`Send + Sync` 约束即来源于此）；缓冲本身不做任何并发控制。
/// - `rent` 保留 `Result` 返回值以对齐能力接口的失败语义；
///   默认实现不会失败，但受限池（如固定预算）可借此显式拒绝。
pub trait BlockPool: Send + Sync + 'static {
    /// 租借一个容量至少为 `min_capacity` 的块。
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, BufError>;

    /// 归还块；每块至多一次，归还后不得继续使用。
    fn hand_back(&self, block: BytesMut);

    /// 释放池内缓存的空闲块，返回回收的字节数。
    fn shrink_to_fit(&self) -> usize;

    /// 读取统计快照。
    fn statistics(&self) -> PoolStats;
}

/// 池统计快照：以平铺字段描述分配生命周期，供测试与监控读取。
///
/// - `allocated_bytes`：累计向系统新分配的字节数（不含复用命中）；
/// - `resident_bytes`：当前仍由池记账的总字节数（租出 + 空闲）；
/// - `available_bytes`：空闲链表中可立即复用的字节数；
/// - `active_leases`：尚未归还的租约数量；
/// - `free_blocks`：空闲链表中的块数量。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocated_bytes: usize,
    pub resident_bytes: usize,
    pub available_bytes: usize,
    pub active_leases: usize,
    pub free_blocks: usize,
}
