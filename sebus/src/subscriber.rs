//! 处理器发现（Subscriber）
//!
//! 订阅者通过 `Subscriber::handlers` 列出自身的处理器方法表，总线在注册时扫描该表：
//! - 带订阅标记且恰好一个参数的方法为“合格”处理器，参数类型即分发键；
//! - 其余方法（无标记或参数数量不为 1）静默排除，不视为错误；
//! - 合格但无法绑定的方法（如 `&mut self`）在构建调用器时报告失败。
//!
//! 方法表通常由 `sebus-macros` 的 `#[subscriber]` / `#[subscribe]` 生成，
//! 也可手写实现（例如显式注册或测试桩）。
//!
use crate::event_type::EventType;
use anyhow::anyhow;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// 处理器执行结果
pub type HandlerResult = anyhow::Result<()>;

/// 未显式指定时的优先级
pub const DEFAULT_PRIORITY: i32 = 1;

/// 订阅者：暴露一组可扫描的处理器方法
pub trait Subscriber: Sized + Send + Sync + 'static {
    /// 列出该类型的处理器方法表（每次调用即一次完整扫描）
    fn handlers() -> Vec<HandlerMethod<Self>>;
}

/// 处理器返回值到 `HandlerResult` 的转换
///
/// 处理器可以返回 `()`，也可以返回错误类型可转换为 `anyhow::Error` 的 `Result<(), E>`。
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

pub(crate) type Thunk<S> = Arc<dyn Fn(&S, &dyn Any) -> HandlerResult + Send + Sync>;

pub(crate) enum Binding<S> {
    Bound(Thunk<S>),
    Unbindable(String),
    Absent,
}

/// 方法表中的一项：名称、订阅标记、参数数量、事件类型与可调用引用
pub struct HandlerMethod<S> {
    name: &'static str,
    priority: Option<i32>,
    arity: usize,
    event_type: Option<EventType>,
    binding: Binding<S>,
}

impl<S: 'static> HandlerMethod<S> {
    /// 带订阅标记、单参数且可直接调用的处理器
    pub fn bound<E: Any>(name: &'static str, priority: i32, f: fn(&S, &E) -> HandlerResult) -> Self {
        let thunk: Thunk<S> = Arc::new(move |owner: &S, event: &dyn Any| {
            match event.downcast_ref::<E>() {
                Some(event) => f(owner, event),
                None => Err(anyhow!("event type mismatch: expected={}", type_name::<E>())),
            }
        });

        Self {
            name,
            priority: Some(priority),
            arity: 1,
            event_type: Some(EventType::of::<E>()),
            binding: Binding::Bound(thunk),
        }
    }

    /// 带订阅标记、单参数，但无法绑定为调用器的处理器
    pub fn unbindable<E: Any>(
        name: &'static str,
        priority: i32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name,
            priority: Some(priority),
            arity: 1,
            event_type: Some(EventType::of::<E>()),
            binding: Binding::Unbindable(reason.into()),
        }
    }

    /// 带订阅标记但参数数量不为 1 的方法（不合格）
    pub fn marked(name: &'static str, priority: i32, arity: usize) -> Self {
        Self {
            name,
            priority: Some(priority),
            arity,
            event_type: None,
            binding: Binding::Absent,
        }
    }

    /// 无订阅标记的普通方法（不合格）
    pub fn plain(name: &'static str, arity: usize) -> Self {
        Self {
            name,
            priority: None,
            arity,
            event_type: None,
            binding: Binding::Absent,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn event_type(&self) -> Option<EventType> {
        self.event_type
    }

    pub fn is_marked(&self) -> bool {
        self.priority.is_some()
    }

    /// 合格：带订阅标记且恰好一个参数
    pub fn is_eligible(&self) -> bool {
        self.is_marked() && self.arity == 1 && self.event_type.is_some()
    }

    pub(crate) fn binding(&self) -> &Binding<S> {
        &self.binding
    }
}

impl<S> fmt::Debug for HandlerMethod<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("arity", &self.arity)
            .field("event_type", &self.event_type.map(|t| t.name()))
            .finish_non_exhaustive()
    }
}
