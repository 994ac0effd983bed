use sebus_macros::subscriber;

struct Relay;

#[subscriber]
impl Default for Relay {
    fn default() -> Self {
        Relay
    }
}

fn main() {
    let _ = Relay;
}
