//! 事件总线（EventBus）
//!
//! 编排扫描、订阅缓存、注册表与调用器，对外提供注册/注销/发布：
//! - `register`：首次注册时扫描订阅者的方法表并构建调用器，之后复用缓存；
//! - `unregister*`：只修改注册表，缓存保留，使再次注册依旧廉价；
//! - `publish`：按事件运行时类型取 bucket 快照，在调用方线程上依次同步调用。
//!
//! 总线不创建任何线程，也不持有订阅者（仅 `Weak` 引用）。
//!
use crate::cache::SubscriptionCache;
use crate::config::{EventBusConfig, FailurePolicy};
use crate::descriptor::{HandlerDescriptor, OwnerId};
use crate::error::{BusError, BusResult, InvokerBuildError};
use crate::event_type::EventType;
use crate::invoker::{Delivery, Invoker};
use crate::registry::Registry;
use crate::subscriber::{HandlerMethod, Subscriber};
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// 一次 `register` 的结果
#[derive(Debug, Default)]
pub struct Registration {
    added: usize,
    skipped: Vec<InvokerBuildError>,
}

impl Registration {
    /// 本次新插入注册表的处理器数量（已在注册表中的不计）
    pub fn added(&self) -> usize {
        self.added
    }

    /// 因无法构建调用器而被跳过的处理器
    pub fn skipped(&self) -> &[InvokerBuildError] {
        &self.skipped
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct EventBus {
    registry: Registry,
    cache: SubscriptionCache,
    failure_policy: FailurePolicy,
    scans: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

impl EventBus {
    pub fn new(sorted: bool) -> Self {
        Self::with_config(EventBusConfig::builder().sorted(sorted).build())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            registry: Registry::new(config.sorted),
            cache: SubscriptionCache::new(),
            failure_policy: config.failure_policy,
            scans: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> EventBusConfig {
        EventBusConfig {
            sorted: self.registry.is_sorted(),
            failure_policy: self.failure_policy,
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.registry.is_sorted()
    }

    /// 开启排序模式时立即对全部 bucket 排序一次
    pub fn set_sorted(&self, sorted: bool) {
        self.registry.set_sorted(sorted);
    }

    /// 注册订阅者的全部合格处理器
    ///
    /// 已扫描过的订阅者直接复用缓存中的描述；已在注册表中的处理器不会重复插入。
    /// 单个处理器构建失败只会被记录并跳过，不影响其余处理器。
    pub fn register<S: Subscriber>(&self, owner: &Arc<S>) -> Registration {
        let mut registration = Registration::default();

        self.cache.with_owner(owner, |entry| {
            if !entry.is_scanned() {
                self.scans.fetch_add(1, Ordering::Relaxed);

                for method in S::handlers() {
                    if !method.is_eligible() || entry.find(method.name()).is_some() {
                        continue;
                    }
                    match describe(owner, &method) {
                        Ok(descriptor) => entry.put(descriptor),
                        Err(err) => {
                            warn!(
                                owner = type_name::<S>(),
                                handler = err.handler,
                                reason = %err.reason,
                                "skipping handler"
                            );
                            registration.skipped.push(err);
                        }
                    }
                }
                entry.mark_scanned();
            }

            for descriptor in entry.descriptors() {
                if self.registry.insert(descriptor.clone()) {
                    registration.added += 1;
                }
            }
        });

        debug!(
            owner = type_name::<S>(),
            owner_id = %OwnerId::of(owner),
            added = registration.added,
            skipped = registration.skipped.len(),
            "subscriber registered"
        );
        registration
    }

    /// 注册订阅者上的单个处理器
    ///
    /// 名称不存在或处理器不合格时静默忽略（返回 `Ok(false)`），不产生缓存条目；
    /// 无法构建调用器时返回 `BusError::InvokerBuild`。
    pub fn register_handler<S: Subscriber>(&self, owner: &Arc<S>, name: &str) -> BusResult<bool> {
        if let Some(descriptor) = self.cache.find(OwnerId::of(owner), name) {
            return Ok(self.registry.insert(descriptor));
        }

        let Some(method) = S::handlers().into_iter().find(|m| m.name() == name) else {
            trace!(owner = type_name::<S>(), handler = name, "no such handler");
            return Ok(false);
        };
        if !method.is_eligible() {
            trace!(owner = type_name::<S>(), handler = name, "handler not eligible");
            return Ok(false);
        }
        let descriptor = describe(owner, &method)?;

        // 并发注册同一处理器时以先写入缓存者为准
        let descriptor = self.cache.with_owner(owner, |entry| match entry.find(name) {
            Some(cached) => cached,
            None => {
                entry.put(descriptor.clone());
                descriptor
            }
        });
        Ok(self.registry.insert(descriptor))
    }

    /// 从所有 bucket 中移除该订阅者的处理器；缓存保留
    pub fn unregister<S: ?Sized>(&self, owner: &Arc<S>) -> usize {
        let owner_id = OwnerId::of(owner);
        let removed = self.registry.remove(|d| d.owner_id() == owner_id);
        debug!(%owner_id, removed, "subscriber unregistered");
        removed
    }

    /// 只移除该订阅者上的指定处理器
    pub fn unregister_handler<S: ?Sized>(&self, owner: &Arc<S>, name: &str) -> bool {
        let owner_id = OwnerId::of(owner);
        let matches = |d: &HandlerDescriptor| d.owner_id() == owner_id && d.name() == name;

        let removed = match self.cache.find(owner_id, name) {
            Some(descriptor) => self
                .registry
                .remove_in(descriptor.event_type().id(), matches),
            None => self.registry.remove(matches),
        };
        removed > 0
    }

    /// 清空某个事件类型的全部处理器
    pub fn unregister_event_type(&self, event_type: EventType) -> usize {
        self.registry.clear_type(event_type.id())
    }

    pub fn unregister_event<E: Any>(&self) -> usize {
        self.unregister_event_type(EventType::of::<E>())
    }

    pub fn unregister_all(&self) {
        self.registry.clear();
    }

    /// 注销订阅者并丢弃其缓存，之后再注册会重新扫描
    pub fn forget<S: ?Sized>(&self, owner: &Arc<S>) -> usize {
        let removed = self.unregister(owner);
        self.cache.remove_owner(OwnerId::of(owner));
        removed
    }

    /// 清理订阅者已被回收的处理器与缓存条目
    pub fn purge_reclaimed(&self) -> usize {
        let removed = self.registry.remove(HandlerDescriptor::is_reclaimed);
        let owners = self.cache.purge_reclaimed();
        debug!(removed, owners, "purged reclaimed subscribers");
        removed
    }

    pub fn publish<E: Any>(&self, event: &E) -> BusResult<()> {
        self.dispatch(TypeId::of::<E>(), type_name::<E>(), event, 1)
    }

    /// 每个处理器连续调用 `times` 次
    pub fn publish_times<E: Any>(&self, event: &E, times: usize) -> BusResult<()> {
        self.dispatch(TypeId::of::<E>(), type_name::<E>(), event, times)
    }

    /// 以运行时类型分发已擦除类型的事件
    pub fn publish_dyn(&self, event: &dyn Any, times: usize) -> BusResult<()> {
        self.dispatch(event.type_id(), "<dyn Any>", event, times)
    }

    fn dispatch(
        &self,
        type_id: TypeId,
        fallback_name: &'static str,
        event: &dyn Any,
        times: usize,
    ) -> BusResult<()> {
        let Some(snapshot) = self.registry.lookup(type_id) else {
            trace!(event = fallback_name, "no handlers");
            return Ok(());
        };
        let event_type = snapshot.first().map_or(fallback_name, |d| d.event_type().name());
        trace!(event = event_type, handlers = snapshot.len(), times, "publishing");

        let mut failures = Vec::new();
        for descriptor in snapshot.iter() {
            for _ in 0..times {
                match descriptor.invoke(event) {
                    Ok(Delivery::Delivered) => {}
                    Ok(Delivery::Reclaimed) => {
                        trace!(
                            owner = descriptor.owner_type(),
                            handler = descriptor.name(),
                            "subscriber reclaimed, skipping"
                        );
                        break;
                    }
                    Err(err) => {
                        warn!(
                            owner = err.owner_type,
                            handler = err.handler,
                            event = event_type,
                            error = %err.source,
                            "handler failed"
                        );
                        match self.failure_policy {
                            FailurePolicy::FailFast => {
                                return Err(BusError::HandlerInvocation(err));
                            }
                            FailurePolicy::BestEffort => failures.push(err),
                        }
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BusError::Publish {
                event_type,
                failures,
            })
        }
    }

    /// 某事件类型当前注册的处理器数量
    pub fn handler_count<E: Any>(&self) -> usize {
        self.registry.len(TypeId::of::<E>())
    }

    /// 当前有处理器的事件类型
    pub fn event_types(&self) -> Vec<EventType> {
        self.registry.event_types()
    }

    /// 已执行的完整扫描次数
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn is_cached<S: ?Sized>(&self, owner: &Arc<S>) -> bool {
        self.cache.contains(OwnerId::of(owner))
    }
}

fn describe<S: Subscriber>(
    owner: &Arc<S>,
    method: &HandlerMethod<S>,
) -> Result<Arc<HandlerDescriptor>, InvokerBuildError> {
    let invoker = Invoker::build(owner, method)?;
    let event_type = method.event_type().ok_or_else(|| InvokerBuildError {
        owner_type: type_name::<S>(),
        handler: method.name(),
        event_type: "<none>",
        reason: "handler declares no event type".to_string(),
    })?;

    Ok(Arc::new(HandlerDescriptor::new(
        owner,
        method.name(),
        event_type,
        method.priority(),
        invoker,
    )))
}
