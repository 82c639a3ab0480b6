use memtrack::{derived, Backend};
use test_alloc::Recorder;

fn report(
    step: &str,
    rec: &Recorder,
    base: usize,
    len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{step}:");
    for event in rec.take_events() {
        println!("  {}", serde_json::to_string(&event.rebased(base))?);
    }
    match rec.uniform_state(base, len) {
        Some(state) => println!("  state: {}", serde_json::to_string(&state)?),
        None if rec.is_unallocated(base, len) => println!("  state: unallocated"),
        None => println!("  state: mixed"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut region = vec![0u8; 128];
    let x = region.as_mut_ptr();
    let base = x as usize;
    let rec = Recorder::new();

    rec.malloc(x, 64, false);
    report("allocate", &rec, base, 64)?;

    rec.mem_defined(x, 64);
    report("mark_defined", &rec, base, 64)?;

    rec.resize(x, 64, 128);
    report("resize", &rec, base, 128)?;

    let usable = |_ptr: *const u8| 128usize;
    derived::free(&rec, x, &usable);
    report("free", &rec, base, 128)?;

    println!("violations: {}", rec.violations().len());
    Ok(())
}
