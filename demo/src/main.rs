use sebus::bus::EventBus;
use sebus::config::{EventBusConfig, FailurePolicy};
use sebus_macros::subscriber;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct OrderPlaced {
    order_id: u64,
    amount: u64,
}

#[derive(Debug, Clone)]
struct OrderCancelled {
    order_id: u64,
}

#[derive(Debug, Error)]
enum InventoryError {
    #[error("order {0} cannot be cancelled twice")]
    AlreadyCancelled(u64),
}

#[derive(Default)]
struct Revenue {
    total: AtomicU64,
    orders: AtomicU64,
}

#[subscriber]
impl Revenue {
    #[subscribe]
    fn on_placed(&self, event: &OrderPlaced) {
        self.total.fetch_add(event.amount, Ordering::Relaxed);
        self.orders.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Inventory {
    last_cancelled: AtomicU64,
}

#[subscriber]
impl Inventory {
    // 先于 Revenue 之类的默认优先级处理器执行
    #[subscribe(priority = 0)]
    fn reserve(&self, event: &OrderPlaced) {
        tracing::trace!(order_id = event.order_id, "reserved");
    }

    #[subscribe]
    fn release(&self, event: &OrderCancelled) -> Result<(), InventoryError> {
        let previous = self.last_cancelled.swap(event.order_id, Ordering::Relaxed);
        if previous == event.order_id {
            return Err(InventoryError::AlreadyCancelled(event.order_id));
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .with_target(false)
        .init();

    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .sorted(true)
            .failure_policy(FailurePolicy::BestEffort)
            .build(),
    );

    let revenue = Arc::new(Revenue::default());
    let inventory = Arc::new(Inventory::default());
    bus.register(&revenue);
    bus.register(&inventory);

    const ROUNDS: u64 = 1_000_000;
    let started = Instant::now();
    for order_id in 0..ROUNDS {
        bus.publish(&OrderPlaced {
            order_id,
            amount: 2,
        })?;
    }
    let elapsed = started.elapsed();
    info!(
        rounds = ROUNDS,
        elapsed_ms = elapsed.as_millis() as u64,
        per_publish_ns = (elapsed.as_nanos() / u128::from(ROUNDS)) as u64,
        "publish benchmark finished"
    );
    info!(
        orders = revenue.orders.load(Ordering::Relaxed),
        total = revenue.total.load(Ordering::Relaxed),
        "revenue"
    );

    bus.publish(&OrderCancelled { order_id: 7 })?;
    if let Err(err) = bus.publish(&OrderCancelled { order_id: 7 }) {
        for failure in err.invocation_failures() {
            info!(handler = failure.handler, error = %failure.source, "handler failed");
        }
    }

    // 注销后再注册只复用缓存，不重新扫描
    bus.unregister(&revenue);
    bus.register(&revenue);
    info!(scans = bus.scan_count(), "re-registered revenue");

    Ok(())
}
