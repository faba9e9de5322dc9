//! Two endpoints exchanging data through the same backing file

use shmblock::{BlockConfig, Result, SerialFormat, SharedMemoryBlock};
use std::collections::BTreeMap;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let base = std::env::temp_dir().join("shmblock_demo");
    println!("shmblock demo under {}", base.display());

    // Terminated text records
    let config = BlockConfig::new(64).with_label("status");
    let mut writer = SharedMemoryBlock::new(config.clone())?;
    let mut reader = SharedMemoryBlock::new(config)?;
    writer.create(&base, "/demo", "status", "")?;
    reader.create(&base, "/demo", "status", "")?;

    writer.write("fan0 ok", 0)?;
    println!("reader sees: {:?}", reader.read(0, 0)?);

    writer.clear(0)?;
    println!("after clear: {:?}", reader.read(0, 0)?);

    // Fixed-length slots, addressed by character
    let config = BlockConfig::new(16).fixed_length().with_fill_char('.');
    let mut grid = SharedMemoryBlock::new(config)?;
    grid.create(&base, "/demo", "grid", "")?;
    grid.clear(0)?;
    grid.write("héllo", 4)?;
    println!("grid slots 4..9: {:?}", grid.read(5, 4)?);

    // Structured values
    let mut values = SharedMemoryBlock::new(BlockConfig::new(256).with_format(SerialFormat::Json))?;
    values.create(&base, "/demo", "values", "")?;
    let mut sensors = BTreeMap::new();
    sensors.insert("cpu0".to_string(), 41);
    sensors.insert("cpu1".to_string(), 43);
    values.write_value(&sensors, 0)?;
    let back: Option<BTreeMap<String, i32>> = values.read_value(0, 0)?;
    println!("sensors: {:?}", back);

    for block in [&mut writer, &mut reader, &mut grid, &mut values] {
        block.close()?;
    }
    Ok(())
}
