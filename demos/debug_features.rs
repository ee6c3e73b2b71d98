// Quick debug script to check rolling feature values
// Run with: cargo run --example debug_features

use gridiron::data::{DatasetAssembler, GameLoader, TiePolicy};
use gridiron::features::HistoryPolicy;

fn main() -> gridiron::Result<()> {
    let game_log = GameLoader::new()
        .with_min_season(Some(2002))
        .load("data/spreadspoke_scores.csv")?;

    let (table, builder) = DatasetAssembler::new(TiePolicy::Exclude).assemble_from_log(
        &game_log,
        3,
        HistoryPolicy::Partial,
    )?;

    println!("Table has {} rows ({} default fills)", table.len(), builder.substitutions());

    // Check first 20 rows
    println!("\nFirst 20 rows:");
    println!("  pf_diff | pa_diff | win_diff | rest_diff | spread | home_win");
    println!("  ------- | ------- | -------- | --------- | ------ | --------");

    for row in table.rows().iter().take(20) {
        println!(
            "  {:+7.2} | {:+7.2} | {:+8.3} | {:+9.0} | {:+6.1} | {}",
            row.diff_points_for,
            row.diff_points_against,
            row.diff_win_pct,
            row.diff_rest_days,
            row.vegas_spread,
            row.label
        );
    }

    // Statistics across all rows
    println!("\nStatistics across all {} rows:", table.len());

    let n = table.len().max(1) as f64;
    let mean = |f: fn(&gridiron::data::FeatureRow) -> f64| table.rows().iter().map(f).sum::<f64>() / n;
    let (min_wp, max_wp) = table
        .rows()
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), r| (lo.min(r.diff_win_pct), hi.max(r.diff_win_pct)));

    println!("  diff_win_pct: mean={:.4}, min={:.4}, max={:.4}", mean(|r| r.diff_win_pct), min_wp, max_wp);
    println!("  diff_points_for: mean={:.4}", mean(|r| r.diff_points_for));
    println!("  home_field_advantage: mean={:.4}", mean(|r| r.home_field_advantage));
    let bad_weather = table.rows().iter().filter(|r| r.bad_weather).count();
    println!("  Bad-weather games: {}", bad_weather);
    println!("  Home wins: {:.1}%", table.home_win_rate() * 100.0);

    Ok(())
}
