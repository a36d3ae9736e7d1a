#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

//! `bytewire-core` 定义字节缓冲引擎跨层共享的稳定契约。
//!
//! # 模块定位（Why）
//! - 缓冲实现（`bytewire-buffer`）与调用方（协议编解码、文件格式读写）之间
//!   需要一份不随实现演进而漂移的契约：稳定错误码、内存池能力接口与统计快照。
//! - 将契约独立成 crate，使测试可以注入替身池、使错误码可以被日志与告警系统
//!   机读，而不必依赖具体实现细节。
//!
//! # 结构概要（How）
//! - `error` 模块承载 [`BufError`] 与 [`error::codes`]，错误码遵循
//!   `<域>.<语义>` 命名；
//! - `pool` 模块定义 [`BlockPool`] 租借/归还能力与 [`PoolStats`] 快照。
//!
//! # 环境约束（What）
//! - 定位于 `no_std + alloc`：契约依赖 `Box`、`Cow` 等堆分配结构，
//!   纯无堆环境暂不支持；`std` Feature 仅作为向下游传播的开关。

extern crate alloc;

pub mod error;
pub mod pool;

pub use error::{BufError, Result};
pub use pool::{BlockPool, PoolStats};
