use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    // Build scripts don't wait on the package's dependencies, so this is reported even when a
    // backend crate fails to build on the host.
    let valgrind = env::var_os("CARGO_FEATURE_VALGRIND").is_some();
    let asan = env::var_os("CARGO_FEATURE_ASAN").is_some();
    if valgrind && asan {
        return Err(
            "memtrack features `valgrind` and `asan` are mutually exclusive, enable at most one"
                .into(),
        );
    }

    Ok(())
}
