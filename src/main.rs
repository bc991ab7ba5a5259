// Entry point and high-level CLI flow.
//
// - Option [1] loads and reshapes the comparison CSV, printing diagnostics.
// - Option [2] applies the filters and writes one report per dashboard tab,
//   the filtered export and a JSON summary.
// - After generating reports, the user can go back to the menu or exit.
// `--batch` runs [1] then [2] once without prompting.
use clap::Parser;
use green_ai_report::cache::{Dataset, DatasetCache};
use green_ai_report::filter::{distinct, filter, FilterSpec};
use green_ai_report::metrics::{Column, Dimension};
use green_ai_report::reports::{self, Direction, TOP_N};
use green_ai_report::{output, ranking, util};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_DATA_PATH: &str = "green_ai_comparisons.csv";

#[derive(Parser, Debug)]
#[command(
    name = "green_ai_report",
    version,
    about = "Performance vs environmental impact of paired LLM comparisons"
)]
struct Cli {
    /// Wide comparison CSV (one row per question, model A vs model B)
    #[arg(long, env = "GREEN_AI_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Directory the report files are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Question categories to keep (repeatable, default: all)
    #[arg(long = "question-category")]
    question_categories: Vec<String>,

    /// Model categories to keep (repeatable, default: all)
    #[arg(long = "model-category")]
    model_categories: Vec<String>,

    /// Models to keep (repeatable, default: all)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Minimum score an observation needs
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
    min_score: u8,

    /// Rows shown in each console preview
    #[arg(long, default_value_t = 3)]
    preview_rows: usize,

    /// Load and generate reports once, without the menu
    #[arg(long)]
    batch: bool,
}

// Session state owned by `main`: the dataset is memoized per file so reports
// can be generated repeatedly without reparsing.
struct App {
    cli: Cli,
    cache: DatasetCache,
    data: Option<Arc<Dataset>>,
}

/// Read one trimmed line after `prompt`. `None` on end of input.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the report selection menu.
///
/// Returns `true` for `Y`, `false` for `N` or end of input.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = read_line("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// The UI default: an empty flag list means every value in the table.
fn selection(chosen: &[String], data: &[green_ai_report::Observation], dim: Dimension) -> BTreeSet<String> {
    if chosen.is_empty() {
        distinct(data, dim).into_iter().collect()
    } else {
        chosen.iter().cloned().collect()
    }
}

impl App {
    /// Handle option [1]: load and reshape the CSV file.
    fn handle_load(&mut self) -> bool {
        match self.cache.get_or_load(&self.cli.data) {
            Ok(dataset) => {
                let report = &dataset.report;
                println!(
                    "Processing dataset... ({} comparison rows loaded, {} observations)",
                    util::format_int(report.source_rows),
                    util::format_int(report.observations)
                );
                if report.dropped_incomplete > 0 {
                    println!(
                        "Note: {} observations dropped for a missing model or model category.",
                        util::format_int(report.dropped_incomplete)
                    );
                }
                if report.total_coercion_warnings() > 0 {
                    println!(
                        "Note: {} numeric cells could not be parsed and were treated as missing.",
                        util::format_int(report.total_coercion_warnings())
                    );
                }
                let imputed = report.imputed_tokens_model_median + report.imputed_tokens_global_median;
                if imputed > 0 {
                    println!("Info: Imputed token counts for {} observations.", util::format_int(imputed));
                }
                println!();
                self.data = Some(dataset);
                true
            }
            Err(e) => {
                eprintln!("Failed to load data: {}", e);
                self.data = None;
                println!("Unable to load data. Check that the CSV file is present.\n");
                false
            }
        }
    }

    fn filter_spec(&self, data: &[green_ai_report::Observation]) -> FilterSpec {
        FilterSpec {
            question_categories: selection(&self.cli.question_categories, data, Dimension::QuestionCategory),
            include_missing_question_category: self.cli.question_categories.is_empty(),
            model_categories: selection(&self.cli.model_categories, data, Dimension::ModelCategory),
            models: selection(&self.cli.models, data, Dimension::Model),
            min_score: f64::from(self.cli.min_score),
        }
    }

    fn out(&self, name: &str) -> PathBuf {
        self.cli.output_dir.join(name)
    }

    fn save_table(&self, path: &Path, table: &green_ai_report::metrics::AggregateTable) {
        if let Err(e) = output::write_aggregate_csv(path, table) {
            eprintln!("Write error: {:#}", e);
        }
    }

    /// Handle option [2]: generate every report and the JSON summary.
    ///
    /// Side effects: writes the report CSVs, the filtered export and
    /// `summary.json`, and prints markdown previews.
    fn handle_generate_reports(&self) {
        let Some(dataset) = self.data.as_ref() else {
            println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
            return;
        };
        let spec = self.filter_spec(&dataset.observations);
        let view = filter(&dataset.observations, &spec);
        if view.is_empty() {
            warn!("filter selection matched no observations");
            println!("No observations match the current filters; reports will be empty.\n");
        }
        let n = self.cli.preview_rows;

        if let Err(e) = std::fs::create_dir_all(&self.cli.output_dir) {
            eprintln!("Write error: {}", e);
        }
        println!("Generating reports...");
        println!("Outputs saved to individual files...\n");

        let ov = reports::overview(&view);
        println!("Overview");
        println!("  Models:              {}", util::format_int(ov.models));
        println!("  Mean score:          {}", util::format_optional(ov.mean_score, 2));
        println!("  Total electricity:   {} Wh", util::format_number(ov.total_electricity_wh, 1));
        println!("  CO2 emissions:       {} g\n", util::format_number(ov.total_co2_g, 1));

        let r1 = reports::model_category_detail(&view);
        let file1 = self.out("report1_model_category_detail.csv");
        self.save_table(&file1, &r1);
        println!("Report 1: Analysis by Model Category\n");
        output::preview_aggregate(&r1, n);
        println!("(Full table exported to {})\n", file1.display());

        let r2 = reports::category_comparison(&view);
        let file2 = self.out("report2_category_comparison.csv");
        self.save_table(&file2, &r2);
        let radar = ranking::radar_profiles(&view);
        let file2b = self.out("report2_category_radar.csv");
        if let Err(e) = output::write_csv(&file2b, &radar) {
            eprintln!("Write error: {:#}", e);
        }
        println!("Report 2: Comparison Between Model Categories\n");
        output::preview_aggregate(&r2, n);
        println!("Multi-criteria profile (higher is better)\n");
        output::preview_table_rows(&radar, n);
        println!("(Full tables exported to {} and {})\n", file2.display(), file2b.display());

        let ranked = ranking::rank_models(&view);
        let file3 = self.out("report3_model_ranking.csv");
        if let Err(e) = output::write_csv(&file3, &ranked) {
            eprintln!("Write error: {:#}", e);
        }
        println!("Report 3: General Model Comparison\n");
        for (title, column, direction) in [
            ("Top models by score", Column::Score, Direction::Highest),
            ("Fastest models (sec)", Column::TimeSec, Direction::Lowest),
            ("Most CO2-efficient models (score/g)", Column::EfficiencyCo2, Direction::Highest),
            ("Lowest carbon footprint (g)", Column::Co2G, Direction::Lowest),
        ] {
            println!("{}", title);
            output::preview_table_rows(&reports::top_models(&view, column, direction, TOP_N), n);
        }
        println!("Global ranking\n");
        output::preview_table_rows(&ranked, n);
        println!("(Full table exported to {})\n", file3.display());

        let r4 = reports::question_comparison(&view);
        let file4 = self.out("report4_question_comparison.csv");
        self.save_table(&file4, &r4);
        let r4b = reports::question_detail(&view);
        let file4b = self.out("report4_question_detail.csv");
        self.save_table(&file4b, &r4b);
        println!("Report 4: Analysis by Question Type\n");
        output::preview_aggregate(&r4, n);
        output::preview_aggregate(&r4b, n);
        println!("(Full tables exported to {} and {})\n", file4.display(), file4b.display());

        let export = self.out(output::EXPORT_FILE);
        let written = std::fs::File::create(&export)
            .map_err(anyhow::Error::from)
            .and_then(|f| output::export_observations(f, &view));
        match written {
            Ok(()) => println!(
                "Filtered data ({} rows) exported to {}\n",
                util::format_int(view.len()),
                export.display()
            ),
            Err(e) => eprintln!("Write error: {:#}", e),
        }

        println!("Raw Data (filtered)\n");
        output::preview_table_rows(&view, n);

        let summary = reports::generate_summary(&view, &ranked);
        if let Err(e) = output::write_json(&self.out("summary.json"), &summary) {
            eprintln!("Write error: {:#}", e);
        }
        println!("Summary Stats (summary.json):");
        match &summary.leader {
            Some(leader) => println!(
                "{{\"leader\": \"{}\", \"global_score\": {}}}\n",
                leader.model,
                util::format_optional(leader.global_score, 3)
            ),
            None => println!("{{\"leader\": null}}\n"),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("green_ai_report=info")),
        )
        .init();

    let cli = Cli::parse();
    let batch = cli.batch;
    let mut app = App {
        cli,
        cache: DatasetCache::new(),
        data: None,
    };

    if batch {
        if !app.handle_load() {
            process::exit(1);
        }
        app.handle_generate_reports();
        return;
    }

    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_line("Enter choice: ") else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                app.handle_load();
            }
            "2" => {
                println!();
                app.handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "question_id,question_categorie,categorie_model,model A,token A,time A (sec),score A,cost A (€),electricity A (wh),co2 A (g),model B,token B,time B (sec),score B,cost B (€),electricity B (wh),co2 B (g)";

    #[test]
    fn failed_reload_drops_the_previous_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            format!("{HEADER}\nq1,general,chat,gpt-x,120,2,4,0.01,1,10,gpt-y,90,1,3,0.01,0.5,5\n"),
        )
        .unwrap();

        let mut app = App {
            cli: Cli::parse_from(["green_ai_report", "--data", path.to_str().unwrap()]),
            cache: DatasetCache::new(),
            data: None,
        };
        assert!(app.handle_load());
        assert!(app.data.is_some());

        std::fs::remove_file(&path).unwrap();
        assert!(!app.handle_load());
        assert!(app.data.is_none());
    }
}
