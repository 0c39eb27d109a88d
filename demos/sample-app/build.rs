fn main() {
    if let Err(e) = woven::build::weave_crate() {
        panic!("weaving failed: {e}");
    }
}
