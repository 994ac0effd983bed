use sebus::bus::EventBus;
use sebus::subscriber::Subscriber;
use sebus_macros::subscriber;
use std::sync::Arc;

struct Ping;

#[derive(Default)]
struct Mixed {
    count: usize,
}

#[subscriber]
impl Mixed {
    #[subscribe]
    fn no_args(&self) {}

    #[subscribe]
    fn two_args(&self, _a: &Ping, _b: &Ping) {}

    #[subscribe]
    fn mutating(&mut self, _ping: &Ping) {
        self.count += 1;
    }

    #[subscribe]
    fn mut_event(&self, _ping: &mut Ping) {}

    #[subscribe]
    async fn later(&self, _ping: &Ping) {}

    fn helper(&self, _ping: &Ping) {}
}

fn main() {
    let table = Mixed::handlers();
    assert_eq!(table.len(), 6);
    assert_eq!(table.iter().filter(|m| m.is_eligible()).count(), 3);
    assert!(!table.iter().find(|m| m.name() == "helper").unwrap().is_marked());

    let bus = EventBus::default();
    let mixed = Arc::new(Mixed::default());
    let registration = bus.register(&mixed);
    assert_eq!(registration.added(), 0);
    assert_eq!(registration.skipped().len(), 3);
    assert_eq!(bus.handler_count::<Ping>(), 0);

    bus.publish(&Ping).unwrap();
}
