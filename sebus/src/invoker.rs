//! 调用器（Invoker）
//!
//! 在注册时把发现到的处理器方法一次性绑定为类型擦除的闭包，发布时直接调用，
//! 不再做方法查找：
//! - 闭包持有订阅者的 `Weak` 引用，不延长其生命周期；
//! - 订阅者已被回收时返回 `Delivery::Reclaimed`，由总线静默跳过；
//! - 处理器返回错误或 panic 时统一包装为 `HandlerInvocationError`。
//!
use crate::error::{HandlerInvocationError, InvokerBuildError};
use crate::subscriber::{Binding, HandlerMethod, HandlerResult, Subscriber};
use anyhow::anyhow;
use std::any::{Any, type_name};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type BoundFn = Arc<dyn Fn(&dyn Any) -> Option<HandlerResult> + Send + Sync>;

/// 单次调用的投递结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// 订阅者已被回收，未执行处理器
    Reclaimed,
}

/// 绑定到某个订阅者实例的处理器调用器
#[derive(Clone)]
pub struct Invoker {
    owner_type: &'static str,
    handler: &'static str,
    event_type: &'static str,
    call: BoundFn,
}

impl Invoker {
    /// 为订阅者的某个合格处理器构建调用器
    ///
    /// 合格性（标记 + 单参数）由调用方保证，这里只负责绑定。
    pub fn build<S: Subscriber>(
        owner: &Arc<S>,
        method: &HandlerMethod<S>,
    ) -> Result<Self, InvokerBuildError> {
        let event_type = method.event_type().map_or("<none>", |t| t.name());

        let thunk = match method.binding() {
            Binding::Bound(thunk) => thunk.clone(),
            Binding::Unbindable(reason) => {
                return Err(InvokerBuildError {
                    owner_type: type_name::<S>(),
                    handler: method.name(),
                    event_type,
                    reason: reason.clone(),
                });
            }
            Binding::Absent => {
                return Err(InvokerBuildError {
                    owner_type: type_name::<S>(),
                    handler: method.name(),
                    event_type,
                    reason: "handler has no callable binding".to_string(),
                });
            }
        };

        let owner = Arc::downgrade(owner);
        let call: BoundFn = Arc::new(move |event: &dyn Any| {
            let owner = owner.upgrade()?;
            Some(thunk(&*owner, event))
        });

        Ok(Self {
            owner_type: type_name::<S>(),
            handler: method.name(),
            event_type,
            call,
        })
    }

    /// 以给定事件调用处理器
    pub fn call(&self, event: &dyn Any) -> Result<Delivery, HandlerInvocationError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.call)(event)));

        let source = match outcome {
            Ok(None) => return Ok(Delivery::Reclaimed),
            Ok(Some(Ok(()))) => return Ok(Delivery::Delivered),
            Ok(Some(Err(err))) => err,
            Err(payload) => anyhow!("handler panicked: {}", panic_message(payload.as_ref())),
        };

        Err(HandlerInvocationError {
            owner_type: self.owner_type,
            handler: self.handler,
            event_type: self.event_type,
            source,
        })
    }

    pub fn handler(&self) -> &'static str {
        self.handler
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("owner_type", &self.owner_type)
            .field("handler", &self.handler)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
