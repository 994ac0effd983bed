use sebus_macros::subscribe;

struct Ping;

#[subscribe]
fn on_ping(_ping: &Ping) {}

fn main() {
    on_ping(&Ping);
}
