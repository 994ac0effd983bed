use sebus::bus::EventBus;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Ping;

#[derive(Default)]
struct Pinger {
    hits: AtomicUsize,
}

#[sebus_macros::subscriber]
impl Pinger {
    #[sebus_macros::subscribe(priority = 3)]
    fn on_ping(&self, _ping: &Ping) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

fn main() {
    let bus = EventBus::default();
    let pinger = Arc::new(Pinger::default());
    assert_eq!(bus.register(&pinger).added(), 1);

    bus.publish(&Ping).unwrap();
    assert_eq!(pinger.hits.load(Ordering::SeqCst), 1);
}
