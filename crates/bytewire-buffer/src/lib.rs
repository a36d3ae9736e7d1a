#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

//! `bytewire-buffer` 提供面向线缆协议与文件格式的位置寻址字节缓冲引擎。
//!
//! # 模块定位（Why）
//! - 协议编解码需要在同一块连续内存上反复执行「定宽写入 → 回卷 → 顺序读取」，
//!   每条消息都新建缓冲会造成分配抖动；本 crate 以池化存储 + 显式游标模型
//!   把这一热路径收敛为单一类型 [`ByteBuffer`]。
//! - 为 `bytewire-core` 的 [`BlockPool`](bytewire_core::BlockPool) 能力契约
//!   提供默认实现 [`SlabBlockPool`]，使缓冲在构造、扩容、释放全程通过
//!   显式注入的池完成块租借与归还。
//!
//! # 设计概要（How）
//! - `big_endian` 模块是无状态的纯编解码层：定宽数值一律以最高有效字节在前
//!   的顺序落盘，浮点经位模式转整数后编码，[`Guid`] 按 16 字节不透明透传；
//! - `byte_buffer` 模块负责容量/长度/游标三元状态机：边界校验先行、
//!   失败即中止、任何错误都不会留下半写状态；
//! - `pool` 模块以自由链表复用 `BytesMut` 块，并暴露进程级默认池实例。
//!
//! # 命名约定（Consistency）
//! - 错误码沿用 `bytewire-core::error::codes` 的 `<域>.<语义>` 体系；
//! - 读写方法命名遵循 `write_<类型>` / `read_<类型>`，与宽度常量一一对应。

extern crate alloc;

pub mod big_endian;
mod byte_buffer;
mod pool;

pub use big_endian::Guid;
pub use byte_buffer::{ByteBuffer, WrapOptions};
pub use pool::SlabBlockPool;
