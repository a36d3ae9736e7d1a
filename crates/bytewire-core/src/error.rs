use alloc::borrow::Cow;
use alloc::boxed::Box;
use core::fmt;

/// 统一的结果别名，默认错误类型为 [`BufError`]。
pub type Result<T, E = BufError> = core::result::Result<T, E>;

/// 缓冲层底层原因的对象安全封装。
pub type ErrorCause = Box<dyn core::error::Error + Send + Sync + 'static>;

/// `BufError` 是缓冲引擎全部可观察错误的最终形态。
///
/// # 设计背景（Why）
/// - 缓冲引擎的失败语义（只读违规、越界、欠载、字符串前缀溢出等）需要合流为
///   稳定错误码，供调用方做精确分支与自动化治理，而非解析错误消息字符串。
/// - 引擎面向 `no_std + alloc` 场景，因此不依赖 `std::error::Error`，
///   底层原因统一通过 [`core::error::Error`] 对象安全封装。
///
/// # 契约说明（What）
/// - `code`：`'static` 稳定字符串，取值必须来自 [`codes`] 模块或遵循
///   `<域>.<语义>` 约定的自定义码值；
/// - `message`：面向排障人员的自然语言描述，不承载机读语义；
/// - `cause`：可选底层原因，通过 [`cause`](Self::cause) 暴露完整链路。
///
/// # 设计取舍（Trade-offs）
/// - 消息采用 `Cow<'static, str>`，静态文案零分配，动态上下文才触发堆分配；
/// - 错误构造发生在违规判定点、且先于任何状态变更，调用方观察到的缓冲
///   永远停留在调用前的状态（参见引擎各操作的原子性契约）。
#[derive(Debug)]
pub struct BufError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

impl BufError {
    /// 构造缓冲错误。
    ///
    /// # 契约定义（What）
    /// - **输入**：`code` 为稳定错误码；`message` 可为 `&'static str` 或堆分配字符串。
    /// - **后置条件**：返回值拥有独立所有权，可安全跨线程传递；`cause` 初始为空。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl core::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 返回人类可读的错误描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 返回底层原因（若存在）。
    pub fn cause(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn core::error::Error + 'static))
    }
}

impl fmt::Display for BufError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl core::error::Error for BufError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.cause()
    }
}

/// 缓冲域的稳定错误码清单。
///
/// # 命名约定（Consistency）
/// - 全部遵循 `<域>.<语义>` 格式：`buffer.*` 对应状态机与边界违规，
///   `codec.*` 对应编解码层；
/// - 码值一经发布即冻结，语义调整只能通过新增码值表达。
pub mod codes {
    /// 对只读缓冲执行写入或扩容。
    pub const BUFFER_READ_ONLY: &str = "buffer.read_only";
    /// 对固定容量缓冲触发隐式或显式扩容。
    pub const BUFFER_NOT_EXPANDABLE: &str = "buffer.not_expandable";
    /// 索引 / 偏移 / 计数 / 位置 / 容量超出目标边界。
    pub const BUFFER_OUT_OF_RANGE: &str = "buffer.out_of_range";
    /// 顺序读取请求的字节数超过剩余可读字节。
    pub const BUFFER_UNDERRUN: &str = "buffer.underrun";
    /// 在未开启暴露能力的缓冲上请求底层存储的实时视图。
    pub const BUFFER_NOT_EXPOSABLE: &str = "buffer.not_exposable";
    /// 缓冲释放后继续执行操作。
    pub const BUFFER_DISPOSED: &str = "buffer.disposed";
    /// 向调用方移交不归属缓冲本身的池化存储。
    pub const BUFFER_NOT_OWNED: &str = "buffer.not_owned";
    /// 字符串编码字节数超出 u16 长度前缀的表示范围。
    pub const CODEC_STRING_OVERFLOW: &str = "codec.string_overflow";
    /// 长度前缀所指负载不是合法 UTF-8。
    pub const CODEC_INVALID_UTF8: &str = "codec.invalid_utf8";
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_carries_code_and_message() {
        let err = BufError::new(codes::BUFFER_UNDERRUN, "剩余 1 字节，不足 4 字节");
        assert_eq!(err.code(), "buffer.underrun");
        assert_eq!(err.to_string(), "[buffer.underrun] 剩余 1 字节，不足 4 字节");
        assert!(err.cause().is_none());
    }

    #[test]
    fn cause_chain_is_observable() {
        let root = BufError::new(codes::BUFFER_OUT_OF_RANGE, "index 越界");
        let err = BufError::new(codes::BUFFER_DISPOSED, "缓冲已释放").with_cause(root);
        let cause = err.cause().expect("应当保留底层原因");
        assert!(cause.to_string().contains("buffer.out_of_range"));
    }
}
