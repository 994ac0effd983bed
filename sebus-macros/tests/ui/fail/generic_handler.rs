use sebus_macros::subscriber;

struct Ping;
struct Relay;

#[subscriber]
impl Relay {
    #[subscribe]
    fn on_ping<T>(&self, _ping: &Ping) {}
}

fn main() {
    let _ = (Ping, Relay);
}
