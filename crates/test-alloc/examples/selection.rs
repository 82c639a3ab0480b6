fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("tool: {}", memtrack::TRACK_TOOL);
    println!("enabled: {}", memtrack::TRACK_ENABLED);
    println!("red_zone: {}", memtrack::RED_ZONE);
    println!("size_precise: {}", memtrack::SIZE_PRECISE);
    println!("{}", serde_json::to_string(&memtrack::selection())?);
    Ok(())
}
