//! 事件总线统一错误定义
//!
//! 覆盖两类失败：
//! - 注册期：处理器无法绑定为调用器（`InvokerBuildError`），仅影响单个处理器；
//! - 发布期：处理器执行返回错误或发生 panic（`HandlerInvocationError`）。
//!
//! 对外统一经由 `BusError` 传递，便于调用方按变体检查。
//!
use thiserror::Error;

/// 调用器构建失败：该处理器被跳过，同一订阅者的其余处理器照常注册
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invoker build failed: owner={owner_type}, handler={handler}, event={event_type}, reason={reason}"
)]
pub struct InvokerBuildError {
    pub owner_type: &'static str,
    pub handler: &'static str,
    pub event_type: &'static str,
    pub reason: String,
}

/// 处理器执行失败，`source` 为处理器返回的原始错误（或 panic 信息）
#[derive(Debug, Error)]
#[error(
    "handler invocation failed: owner={owner_type}, handler={handler}, event={event_type}, reason={source}"
)]
pub struct HandlerInvocationError {
    pub owner_type: &'static str,
    pub handler: &'static str,
    pub event_type: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    InvokerBuild(#[from] InvokerBuildError),

    /// fail-fast 策略下首个失败的处理器
    #[error(transparent)]
    HandlerInvocation(#[from] HandlerInvocationError),

    /// best-effort 策略下，所有处理器执行完毕后汇总的失败
    #[error("publish failed: event={event_type}, failed_handlers={count}", count = .failures.len())]
    Publish {
        event_type: &'static str,
        failures: Vec<HandlerInvocationError>,
    },
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;

impl BusError {
    /// 本次错误携带的处理器失败列表（构建失败时为空）
    pub fn invocation_failures(&self) -> &[HandlerInvocationError] {
        match self {
            BusError::HandlerInvocation(err) => std::slice::from_ref(err),
            BusError::Publish { failures, .. } => failures,
            BusError::InvokerBuild(_) => &[],
        }
    }
}
