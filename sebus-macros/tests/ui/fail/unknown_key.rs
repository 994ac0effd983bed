use sebus_macros::subscriber;

struct Ping;
struct Relay;

#[subscriber]
impl Relay {
    #[subscribe(order = 1)]
    fn on_ping(&self, _ping: &Ping) {}
}

fn main() {
    let _ = (Ping, Relay);
}
