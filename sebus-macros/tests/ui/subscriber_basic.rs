use sebus::bus::EventBus;
use sebus_macros::subscriber;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Deposited {
    amount: usize,
}

#[derive(Default)]
struct Ledger {
    total: AtomicUsize,
}

#[subscriber]
impl Ledger {
    #[subscribe]
    fn on_deposited(&self, event: &Deposited) {
        self.total.fetch_add(event.amount, Ordering::SeqCst);
    }

    // 无标记方法不参与分发
    fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn new() -> Self {
        Self::default()
    }
}

fn main() {
    let bus = EventBus::default();
    let ledger = Arc::new(Ledger::new());
    let registration = bus.register(&ledger);
    assert_eq!(registration.added(), 1);

    bus.publish(&Deposited { amount: 3 }).unwrap();
    bus.publish(&Deposited { amount: 4 }).unwrap();
    assert_eq!(ledger.total(), 7);
}
