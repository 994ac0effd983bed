//! 订阅缓存（SubscriptionCache）
//!
//! 按订阅者索引其已创建的处理器描述，按事件类型分组：
//! - 再次注册同一订阅者时直接复用，无需重新扫描、重新构建调用器；
//! - 与注册表共享同一批 `Arc<HandlerDescriptor>`，本身不参与分发。
//!
//! 同一订阅者的操作在其分片锁上串行，不同订阅者互不阻塞。
//!
use crate::descriptor::{HandlerDescriptor, OwnerId};
use crate::event_type::EventType;
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// 某个订阅者的处理器描述（按事件类型分组）
pub type OwnerHandlers = HashMap<EventType, Vec<Arc<HandlerDescriptor>>>;

/// 单个订阅者的缓存条目
pub struct OwnerEntry {
    owner: Weak<dyn Any + Send + Sync>,
    scanned: bool,
    handlers: OwnerHandlers,
}

impl OwnerEntry {
    fn new<S: Any + Send + Sync>(owner: &Arc<S>) -> Self {
        let weak: Weak<S> = Arc::downgrade(owner);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        Self {
            owner: weak,
            scanned: false,
            handlers: HashMap::new(),
        }
    }

    /// 是否已完成完整扫描（单个处理器注册只产生部分条目）
    pub fn is_scanned(&self) -> bool {
        self.scanned
    }

    pub fn mark_scanned(&mut self) {
        self.scanned = true;
    }

    pub fn put(&mut self, descriptor: Arc<HandlerDescriptor>) {
        self.handlers
            .entry(descriptor.event_type())
            .or_default()
            .push(descriptor);
    }

    pub fn find(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.descriptors().find(|d| d.name() == name).cloned()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<HandlerDescriptor>> {
        self.handlers.values().flatten()
    }

    pub fn handlers(&self) -> &OwnerHandlers {
        &self.handlers
    }

    fn is_reclaimed(&self) -> bool {
        self.owner.strong_count() == 0
    }
}

#[derive(Default)]
pub struct SubscriptionCache {
    entries: DashMap<OwnerId, OwnerEntry>,
}

impl SubscriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在订阅者的条目上执行 `f`（条目不存在则创建），期间持有该条目的写锁
    pub fn with_owner<S, R>(&self, owner: &Arc<S>, f: impl FnOnce(&mut OwnerEntry) -> R) -> R
    where
        S: Any + Send + Sync,
    {
        let mut entry = self
            .entries
            .entry(OwnerId::of(owner))
            .or_insert_with(|| OwnerEntry::new(owner));
        f(entry.value_mut())
    }

    /// 追加一个描述到其订阅者的条目中
    pub fn put<S>(&self, owner: &Arc<S>, descriptor: Arc<HandlerDescriptor>)
    where
        S: Any + Send + Sync,
    {
        self.with_owner(owner, |entry| entry.put(descriptor));
    }

    /// 订阅者的全部缓存描述；从未注册过则为 `None`
    pub fn get(&self, owner: OwnerId) -> Option<OwnerHandlers> {
        self.entries.get(&owner).map(|e| e.handlers.clone())
    }

    pub fn find(&self, owner: OwnerId, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.entries.get(&owner).and_then(|e| e.find(name))
    }

    pub fn contains(&self, owner: OwnerId) -> bool {
        self.entries.contains_key(&owner)
    }

    /// 移除整个订阅者条目
    pub fn remove_owner(&self, owner: OwnerId) -> bool {
        self.entries.remove(&owner).is_some()
    }

    /// 清理订阅者已被回收的条目，返回清理数量
    pub fn purge_reclaimed(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_reclaimed());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::Invoker;
    use crate::subscriber::{HandlerMethod, Subscriber};

    struct Owner;
    struct Ping;
    struct Pong;

    impl Subscriber for Owner {
        fn handlers() -> Vec<HandlerMethod<Self>> {
            vec![
                HandlerMethod::bound::<Ping>("on_ping", 1, |_, _| Ok(())),
                HandlerMethod::bound::<Pong>("on_pong", 2, |_, _| Ok(())),
            ]
        }
    }

    fn describe(owner: &Arc<Owner>, name: &str) -> Arc<HandlerDescriptor> {
        let method = Owner::handlers()
            .into_iter()
            .find(|m| m.name() == name)
            .unwrap();
        let invoker = Invoker::build(owner, &method).unwrap();
        Arc::new(HandlerDescriptor::new(
            owner,
            method.name(),
            method.event_type().unwrap(),
            method.priority(),
            invoker,
        ))
    }

    #[test]
    fn put_groups_by_event_type() {
        let cache = SubscriptionCache::new();
        let owner = Arc::new(Owner);
        cache.put(&owner, describe(&owner, "on_ping"));
        cache.put(&owner, describe(&owner, "on_pong"));

        let handlers = cache.get(OwnerId::of(&owner)).unwrap();
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[&EventType::of::<Ping>()].len(), 1);
        assert!(cache.find(OwnerId::of(&owner), "on_pong").is_some());
        assert!(cache.find(OwnerId::of(&owner), "missing").is_none());
        assert_eq!(Arc::strong_count(&owner), 1);
    }

    #[test]
    fn get_absent_for_unknown_owner() {
        let cache = SubscriptionCache::new();
        let owner = Arc::new(Owner);
        assert!(cache.get(OwnerId::of(&owner)).is_none());
    }

    #[test]
    fn remove_owner_drops_entry() {
        let cache = SubscriptionCache::new();
        let owner = Arc::new(Owner);
        cache.put(&owner, describe(&owner, "on_ping"));
        assert!(cache.remove_owner(OwnerId::of(&owner)));
        assert!(!cache.contains(OwnerId::of(&owner)));
        assert!(!cache.remove_owner(OwnerId::of(&owner)));
    }

    #[test]
    fn purge_drops_reclaimed_owners() {
        let cache = SubscriptionCache::new();
        let alive = Arc::new(Owner);
        let dead = Arc::new(Owner);
        cache.put(&alive, describe(&alive, "on_ping"));
        cache.put(&dead, describe(&dead, "on_ping"));
        drop(dead);

        assert_eq!(cache.purge_reclaimed(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(OwnerId::of(&alive)));
    }

    #[test]
    fn scanned_flag_is_per_owner() {
        let cache = SubscriptionCache::new();
        let a = Arc::new(Owner);
        let b = Arc::new(Owner);
        cache.with_owner(&a, |e| e.mark_scanned());
        assert!(cache.with_owner(&a, |e| e.is_scanned()));
        assert!(!cache.with_owner(&b, |e| e.is_scanned()));
    }
}
