// Emits VERGEN_BUILD_TIMESTAMP for `groupsite --version`.
fn main() {
    use vergen::{BuildBuilder, Emitter};

    let mut emitter = Emitter::default();
    match BuildBuilder::default().build_timestamp(true).build() {
        Ok(build) => {
            let _ = emitter.add_instructions(&build);
        }
        Err(e) => eprintln!("vergen build info unavailable: {e}"),
    }
    if let Err(e) = emitter.emit() {
        eprintln!("vergen emit skipped: {e}");
    }
}
