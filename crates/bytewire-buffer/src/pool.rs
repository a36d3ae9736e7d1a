use alloc::{sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use bytewire_core::{BlockPool, BufError, PoolStats, Result};
use spin::{Mutex, Once};

/// `SlabBlockPool` 是基于自由链表的默认块池实现，
/// 面向「高频租借、块大小相近」的缓冲工作负载复用 `BytesMut`。
///
/// # 模块角色（Why）
/// - 作为 [`BlockPool`] 的默认实现，为缓冲引擎提供统一的块来源；
/// - 把原本隐式的进程级默认分配器收敛为显式接口背后的单例
///   （[`global`](Self::global)），测试可注入替身池而不受全局状态干扰。
///
/// # 核心机制（How）
/// - 自由链表 `spin::Mutex<Vec<BytesMut>>`：租借时首次适配扫描，
///   命中则复用，未命中则向系统分配；
/// - 原子计数跟踪累计分配、驻留、空闲与活跃租约，
///   [`statistics`](BlockPool::statistics) 返回一致性快照。
///
/// # 契约说明（What）
/// - `rent` 返回 `capacity() >= min_capacity` 的块，内容视为陈旧数据；
/// - `hand_back` 的块进入空闲链表等待复用，每块至多归还一次；
/// - **线程安全**：共享状态由自旋锁与原子计数保护，满足 `Send + Sync`。
///
/// # 设计权衡（Trade-offs）
/// - 采用自旋锁而非阻塞锁，保持 `no_std` 可用性；临界区仅做链表扫描与
///   交换，持锁时间有界；
/// - `shrink_to_fit` 直接清空自由链表，便于压测后快速归还峰值内存，
///   代价是下一轮租借必然重新分配。
#[derive(Clone)]
pub struct SlabBlockPool {
    inner: Arc<PoolInner>,
}

static GLOBAL: Once<Arc<SlabBlockPool>> = Once::new();

impl SlabBlockPool {
    /// 创建空池实例，供显式注入或测试使用。
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PoolInner::new()),
        }
    }

    /// 进程级默认池：惰性初始化的单例，藏在 [`BlockPool`] 接口之后。
    pub fn global() -> Arc<dyn BlockPool> {
        GLOBAL.call_once(|| Arc::new(SlabBlockPool::new())).clone()
    }
}

impl Default for SlabBlockPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPool for SlabBlockPool {
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, BufError> {
        Ok(self.inner.acquire(min_capacity))
    }

    fn hand_back(&self, block: BytesMut) {
        self.inner.reclaim(block);
    }

    fn shrink_to_fit(&self) -> usize {
        self.inner.shrink_free_list()
    }

    fn statistics(&self) -> PoolStats {
        self.inner.snapshot()
    }
}

struct PoolInner {
    free_list: Mutex<Vec<BytesMut>>,
    metrics: PoolMetrics,
}

impl PoolInner {
    fn new() -> Self {
        Self {
            free_list: Mutex::new(Vec::new()),
            metrics: PoolMetrics::default(),
        }
    }

    /// 从自由链表或系统分配器获取满足容量的块。
    fn acquire(&self, min_capacity: usize) -> BytesMut {
        let reused = {
            let mut list = self.free_list.lock();
            list.iter()
                .position(|block| block.capacity() >= min_capacity)
                .map(|index| list.swap_remove(index))
        };

        let mut block = match reused {
            Some(block) => {
                self.metrics.on_reuse(block.capacity());
                block
            }
            None => {
                let block = BytesMut::with_capacity(min_capacity);
                self.metrics.on_new_allocation(block.capacity());
                block
            }
        };
        block.clear();
        self.metrics.on_lease();
        block
    }

    /// 回收归还的块：清除簿记长度后挂回链表，容量立即可复用。
    fn reclaim(&self, mut block: BytesMut) {
        block.clear();
        self.metrics.on_reclaim(block.capacity());
        self.free_list.lock().push(block);
    }

    fn shrink_free_list(&self) -> usize {
        let mut list = self.free_list.lock();
        let reclaimed: usize = list.iter().map(BytesMut::capacity).sum();
        list.clear();
        self.metrics.on_shrink(reclaimed);
        reclaimed
    }

    fn snapshot(&self) -> PoolStats {
        let free_blocks = self.free_list.lock().len();
        PoolStats {
            allocated_bytes: self.metrics.allocated_bytes.load(Ordering::Relaxed),
            resident_bytes: self.metrics.resident_bytes.load(Ordering::Relaxed),
            available_bytes: self.metrics.available_bytes.load(Ordering::Relaxed),
            active_leases: self.metrics.active_leases.load(Ordering::Relaxed),
            free_blocks,
        }
    }
}

/// 池指标的原子计数集合。
///
/// - `allocated_bytes`：累计向系统新分配的字节数，单调不减；
/// - `resident_bytes`：池当前记账的总字节数，`shrink_to_fit` 时扣减；
/// - `available_bytes`：空闲链表中可复用的字节数；
/// - `active_leases`：已租出尚未归还的块数。
#[derive(Default)]
struct PoolMetrics {
    allocated_bytes: AtomicUsize,
    resident_bytes: AtomicUsize,
    available_bytes: AtomicUsize,
    active_leases: AtomicUsize,
}

impl PoolMetrics {
    fn on_new_allocation(&self, capacity: usize) {
        self.allocated_bytes.fetch_add(capacity, Ordering::Relaxed);
        self.resident_bytes.fetch_add(capacity, Ordering::Relaxed);
    }

    fn on_reuse(&self, capacity: usize) {
        saturating_sub(&self.available_bytes, capacity);
    }

    fn on_lease(&self) {
        self.active_leases.fetch_add(1, Ordering::Relaxed);
    }

    fn on_reclaim(&self, capacity: usize) {
        saturating_sub(&self.active_leases, 1);
        self.available_bytes.fetch_add(capacity, Ordering::Relaxed);
    }

    fn on_shrink(&self, capacity: usize) {
        saturating_sub(&self.available_bytes, capacity);
        saturating_sub(&self.resident_bytes, capacity);
    }
}

fn saturating_sub(target: &AtomicUsize, value: usize) {
    let _ = target.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(value))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rent_reuses_handed_back_block() {
        let pool = SlabBlockPool::new();
        let block = pool.rent(64).expect("首次租借");
        let rented_capacity = block.capacity();
        pool.hand_back(block);
        assert_eq!(pool.statistics().free_blocks, 1);

        let reused = pool.rent(16).expect("复用租借");
        assert!(reused.capacity() >= rented_capacity.min(16));
        let stats = pool.statistics();
        assert_eq!(stats.free_blocks, 0);
        assert_eq!(stats.active_leases, 1);
        // 复用命中不产生新分配。
        assert_eq!(stats.allocated_bytes, rented_capacity);
    }

    #[test]
    fn shrink_to_fit_empties_free_list() {
        let pool = SlabBlockPool::new();
        let block = pool.rent(48).expect("租借");
        let capacity = block.capacity();
        pool.hand_back(block);
        let reclaimed = pool.shrink_to_fit();
        assert_eq!(reclaimed, capacity);
        let stats = pool.statistics();
        assert_eq!(stats.available_bytes, 0);
        assert_eq!(stats.free_blocks, 0);
    }

    #[test]
    fn global_pool_returns_same_instance() {
        let first = SlabBlockPool::global();
        let second = SlabBlockPool::global();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
