use sebus_macros::subscriber;

struct Ping;
struct Relay;

#[subscriber]
impl Relay {
    #[subscribe(priority = 1, priority = 2)]
    fn on_ping(&self, _ping: &Ping) {}
}

fn main() {
    let _ = (Ping, Relay);
}
