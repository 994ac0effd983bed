use crate::error::HandlerInvocationError;
use crate::event_type::EventType;
use crate::invoker::{Delivery, Invoker};
use std::any::{Any, type_name};
use std::fmt;
use std::sync::{Arc, Weak};

/// 订阅者身份：以 `Arc` 分配地址区分实例
///
/// 只要仍有 `Weak` 引用存在，分配不会被释放，地址也就不会被复用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(usize);

impl OwnerId {
    pub fn of<S: ?Sized>(owner: &Arc<S>) -> Self {
        Self(Arc::as_ptr(owner) as *const () as usize)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 处理器描述：一个订阅者上的一个合格处理器
///
/// 创建后不可变；缓存与注册表共享同一个 `Arc<HandlerDescriptor>`。
pub struct HandlerDescriptor {
    owner: Weak<dyn Any + Send + Sync>,
    owner_id: OwnerId,
    owner_type: &'static str,
    name: &'static str,
    event_type: EventType,
    priority: i32,
    invoker: Invoker,
}

impl HandlerDescriptor {
    pub fn new<S: Any + Send + Sync>(
        owner: &Arc<S>,
        name: &'static str,
        event_type: EventType,
        priority: i32,
        invoker: Invoker,
    ) -> Self {
        let weak: Weak<S> = Arc::downgrade(owner);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        Self {
            owner: weak,
            owner_id: OwnerId::of(owner),
            owner_type: type_name::<S>(),
            name,
            event_type,
            priority,
            invoker,
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn owner_type(&self) -> &'static str {
        self.owner_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// 同一订阅者上的同一处理器
    pub fn is_same_site(&self, other: &HandlerDescriptor) -> bool {
        self.owner_id == other.owner_id && self.name == other.name
    }

    /// 订阅者已被回收
    pub fn is_reclaimed(&self) -> bool {
        self.owner.strong_count() == 0
    }

    pub fn invoke(&self, event: &dyn Any) -> Result<Delivery, HandlerInvocationError> {
        self.invoker.call(event)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("owner_id", &self.owner_id)
            .field("owner_type", &self.owner_type)
            .field("name", &self.name)
            .field("event_type", &self.event_type.name())
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
