use colored::*;
use kbir_build::BatchOutcome;

/// Print one line per module and a closing summary block
pub fn print_batch(outcome: &BatchOutcome) {
    for module in &outcome.built {
        println!(
            "{} {}: {}",
            "✓".green(),
            module.name(),
            module.ir_file().display()
        );
    }
    for failure in &outcome.failed {
        println!("{} {}: {}", "✗".red(), failure.module, failure.error);
    }

    println!("{}", "=".repeat(60));
    println!("Built:  {}", outcome.built.len().to_string().green());
    if !outcome.failed.is_empty() {
        println!("Failed: {}", outcome.failed.len().to_string().red());
    }
    println!("{}", "=".repeat(60));
}

/// Exit code for a batch: non-zero when any module failed
pub fn exit_code(outcome: &BatchOutcome) -> i32 {
    if outcome.failed.is_empty() {
        0
    } else {
        1
    }
}
