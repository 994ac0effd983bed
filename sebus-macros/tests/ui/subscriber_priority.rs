use sebus::bus::EventBus;
use sebus_macros::subscriber;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct Tick(u32);

#[derive(Default)]
struct Clock {
    seen: Mutex<Vec<&'static str>>,
}

const LATE: i32 = 10;

#[subscriber]
impl Clock {
    #[subscribe(priority = LATE)]
    fn late(&self, _tick: &Tick) {
        self.seen.lock().unwrap().push("late");
    }

    #[subscribe(priority = -1)]
    fn early(&self, tick: Tick) -> Result<(), std::io::Error> {
        assert_eq!(tick.0, 1);
        self.seen.lock().unwrap().push("early");
        Ok(())
    }

    #[subscribe]
    fn default_priority(&self, _tick: &Tick) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push("default");
        Ok(())
    }
}

fn main() {
    let bus = EventBus::new(true);
    let clock = Arc::new(Clock::default());
    bus.register(&clock);

    bus.publish(&Tick(1)).unwrap();
    assert_eq!(*clock.seen.lock().unwrap(), vec!["early", "default", "late"]);
}
