//! `pool_contract` 集成测试：验证块池与缓冲在真实调用路径下的协作契约。
//!
//! # 测试目标（Why）
//! - 保障「租借 → 扩容换块 → 归还」全链路的计数守恒：每个 `rent` 恰好
//!   对应一次 `hand_back`，任何退出路径（显式释放、Drop、clear）都不例外；
//! - 通过可注入的替身池证明缓冲不依赖全局状态，池能力完全可替换。
//!
//! # 结构安排（How）
//! - 前半部分直接驱动 `SlabBlockPool` 的统计生命周期；
//! - 后半部分以 `CountingPool` 替身核对缓冲侧的租借/归还守恒。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use bytewire_buffer::{ByteBuffer, SlabBlockPool};
use bytewire_core::{BlockPool, BufError, PoolStats, Result};

/// 验证租借与归还驱动统计字段的生命周期演进。
#[test]
fn stats_track_rent_and_hand_back_lifecycle() {
    let pool = SlabBlockPool::new();
    let initial = pool.statistics();
    assert_eq!(initial.active_leases, 0);
    assert_eq!(initial.free_blocks, 0);

    let block = pool.rent(64).expect("租借失败");
    let capacity = block.capacity();
    assert!(capacity >= 64, "租入块必须满足最小容量");
    let during = pool.statistics();
    assert_eq!(during.active_leases, 1);
    assert!(during.allocated_bytes >= 64);

    pool.hand_back(block);
    let after = pool.statistics();
    assert_eq!(after.active_leases, 0);
    assert_eq!(after.free_blocks, 1);
    assert_eq!(after.available_bytes, capacity);
}

/// 归还后的块可被后续租借复用，不触发新分配。
#[test]
fn handed_back_block_is_reused() {
    let pool = SlabBlockPool::new();
    let block = pool.rent(128).expect("首次租借");
    pool.hand_back(block);
    let allocated_before = pool.statistics().allocated_bytes;

    let reused = pool.rent(32).expect("复用租借");
    assert!(reused.capacity() >= 32);
    assert_eq!(
        pool.statistics().allocated_bytes,
        allocated_before,
        "命中自由链表不得产生新分配"
    );
}

/// 缓冲扩容换块时，旧块在新块确认可用后回到池中。
#[test]
fn buffer_growth_returns_old_block_to_pool() {
    let pool = Arc::new(SlabBlockPool::new());
    let mut buf = ByteBuffer::with_pool(pool.clone(), 8).expect("构造缓冲失败");
    buf.write_bytes(&[0x5A; 8], 0, 8).expect("填满初始容量");

    // 触发隐式扩容：旧块归还，租约数保持 1。
    buf.write_u64(7).expect("越界写入触发换块");
    let stats = pool.statistics();
    assert_eq!(stats.active_leases, 1, "换块期间租约数守恒");
    assert_eq!(stats.free_blocks, 1, "旧块必须回到自由链表");

    // 换块后数据完整保留。
    buf.reset();
    let mut head = [0u8; 8];
    buf.read_bytes(&mut head, 0, 8).expect("读取原有负载");
    assert_eq!(head, [0x5A; 8]);
}

/// `clear` 立即归还池块；缓冲之后仍可重新生长。
#[test]
fn clear_hands_block_back_immediately() {
    let pool = Arc::new(SlabBlockPool::new());
    let mut buf = ByteBuffer::with_pool(pool.clone(), 32).expect("构造缓冲失败");
    buf.write_u32(9).expect("写入负载");

    buf.clear().expect("clear 不应失败");
    let stats = pool.statistics();
    assert_eq!(stats.active_leases, 0, "clear 后租约应归零");
    assert_eq!(stats.free_blocks, 1);

    buf.write_u32(11).expect("清空后重新写入");
    assert_eq!(pool.statistics().active_leases, 1, "再生长重新租借");
}

/// Drop 路径与显式释放等价：作用域结束后租约归零。
#[test]
fn drop_releases_lease_exactly_once() {
    let pool = Arc::new(SlabBlockPool::new());
    {
        let mut buf = ByteBuffer::with_pool(pool.clone(), 16).expect("构造缓冲失败");
        buf.write_u8(1).expect("写入负载");
        assert_eq!(pool.statistics().active_leases, 1);
    }
    let stats = pool.statistics();
    assert_eq!(stats.active_leases, 0);
    assert_eq!(stats.free_blocks, 1);
}

/// `shrink_to_fit` 清空自由链表并返回回收字节数。
#[test]
fn shrink_to_fit_reports_reclaimed_bytes() {
    let pool = SlabBlockPool::new();
    let block = pool.rent(48).expect("租借");
    let capacity = block.capacity();
    pool.hand_back(block);

    let reclaimed = pool.shrink_to_fit();
    assert_eq!(reclaimed, capacity);
    let stats = pool.statistics();
    assert_eq!(stats.free_blocks, 0);
    assert_eq!(stats.available_bytes, 0);
}

/// 记录租借/归还次数的替身池：证明池能力完全可注入替换。
struct CountingPool {
    rents: AtomicUsize,
    returns: AtomicUsize,
}

impl CountingPool {
    fn new() -> Self {
        Self {
            rents: AtomicUsize::new(0),
            returns: AtomicUsize::new(0),
        }
    }
}

impl BlockPool for CountingPool {
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, BufError> {
        self.rents.fetch_add(1, Ordering::Relaxed);
        Ok(BytesMut::with_capacity(min_capacity))
    }

    fn hand_back(&self, _block: BytesMut) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    fn shrink_to_fit(&self) -> usize {
        0
    }

    fn statistics(&self) -> PoolStats {
        PoolStats::default()
    }
}

/// 每个租入块在任何退出路径上恰好归还一次。
#[test]
fn every_rent_is_balanced_by_one_hand_back() {
    let pool = Arc::new(CountingPool::new());
    {
        let mut buf = ByteBuffer::with_pool(pool.clone(), 4).expect("构造缓冲失败");
        buf.write_u64(42).expect("触发一次换块扩容");
        buf.release();
        buf.release();
    }
    let rents = pool.rents.load(Ordering::Relaxed);
    let returns = pool.returns.load(Ordering::Relaxed);
    assert_eq!(rents, 2, "初始租借加一次换块");
    assert_eq!(returns, rents, "归还次数必须与租借守恒");
}
