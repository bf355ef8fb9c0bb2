//! Example: sweep a config constant across a few values with a no-op command.
//!
//! Writes a small config file, then for each sweep value patches the
//! `SECTOR_COUNT` line and runs `true` in place of a real benchmark binary.
//! Swap the step list for your own build/benchmark commands.

use sweep_core::{run_sweep, OsSpawner, Step, SweepConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::temp_dir().join("sweep_demo_params.txt");
    std::fs::write(&config_path, "SECTOR_COUNT=1\nOTHER=unchanged\n")?;

    let config = SweepConfig::new(
        vec![2, 4, 8],
        &config_path,
        r"^SECTOR_COUNT=.*$",
        "SECTOR_COUNT={v}",
    );

    println!("Sweeping {} values...", config.values.len());
    let report = run_sweep(
        &config,
        |value| {
            vec![Step::new("true").description(format!("no-op benchmark for {value} sectors"))]
        },
        &OsSpawner::default(),
    )?;

    print!("{}", report.summary());
    println!(
        "Final config contents:\n{}",
        std::fs::read_to_string(&config_path)?
    );

    std::fs::remove_file(&config_path)?;
    Ok(())
}
