//! Export season-split feature tables to CSV for analysis
//! Run with: cargo run --example export_data

use gridiron::data::{DatasetAssembler, GameLoader, TiePolicy};
use gridiron::features::HistoryPolicy;
use std::fs::File;
use std::io::Write;

fn main() -> gridiron::Result<()> {
    let game_log = GameLoader::new()
        .with_min_season(Some(2002))
        .load("data/spreadspoke_scores.csv")?;

    let (table, _) = DatasetAssembler::new(TiePolicy::Exclude).assemble_from_log(
        &game_log,
        3,
        HistoryPolicy::Partial,
    )?;

    table.save("features_all.csv")?;

    // Hold out the last two seasons
    let last_season = table.rows().iter().map(|r| r.season).max().unwrap_or_default();
    let cutoff = last_season.saturating_sub(1);
    let names = table.feature_names();

    let mut train_file = File::create("train_data.csv")?;
    let mut test_file = File::create("test_data.csv")?;
    for file in [&mut train_file, &mut test_file] {
        writeln!(file, "{},label", names.join(","))?;
    }

    let (mut n_train, mut n_test) = (0, 0);
    for row in table.rows() {
        let values: Vec<String> = row.feature_vector().iter().map(|v| format!("{:.6}", v)).collect();
        let line = format!("{},{}", values.join(","), row.label);
        if row.season < cutoff {
            writeln!(train_file, "{}", line)?;
            n_train += 1;
        } else {
            writeln!(test_file, "{}", line)?;
            n_test += 1;
        }
    }

    println!("Exported {} training rows to train_data.csv", n_train);
    println!("Exported {} test rows (seasons {}+) to test_data.csv", n_test, cutoff);

    Ok(())
}
