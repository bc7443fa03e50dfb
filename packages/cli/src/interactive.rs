//! Interactive menu used when no subcommand is given.

use std::path::{Path, PathBuf};

use dialoguer::{Input, Select};
use sensor_map_cli_utils::{IndicatifProgress, MultiProgress};
use sensor_map_export::{COUNTS_FILE, POINTS_FILE};

use crate::pipeline::{self, Classified, Inputs};

/// Top-level actions available in the interactive menu.
enum Action {
    ExportAll,
    ExportCounts,
    ExportPoints,
    ListSources,
}

impl Action {
    const ALL: &[Self] = &[
        Self::ExportAll,
        Self::ExportCounts,
        Self::ExportPoints,
        Self::ListSources,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::ExportAll => "Export everything (counts, points, districts, summary)",
            Self::ExportCounts => "Export district marker counts",
            Self::ExportPoints => "Export sensor points",
            Self::ListSources => "List sensor sources",
        }
    }
}

/// Prompts for an action and its paths, then runs it.
///
/// Paths given on the command line are offered as defaults.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub fn run(multi: &MultiProgress, mut inputs: Inputs) -> Result<(), Box<dyn std::error::Error>> {
    println!("District Sensor Map");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::ExportAll => {
            let out_dir = prompt_path("Output directory", &PathBuf::from("."))?;
            let classified = classify(multi, &mut inputs)?;
            for path in pipeline::write_all(&classified, &out_dir)? {
                log::info!("Wrote {}", path.display());
            }
            pipeline::print_report(&classified);
        }
        Action::ExportCounts => {
            let out = prompt_path("Counts file", &PathBuf::from(COUNTS_FILE))?;
            let classified = classify(multi, &mut inputs)?;
            pipeline::write_counts(&classified, &out)?;
            pipeline::print_report(&classified);
        }
        Action::ExportPoints => {
            let out = prompt_path("Points file", &PathBuf::from(POINTS_FILE))?;
            let classified = classify(multi, &mut inputs)?;
            pipeline::write_points(&classified, &out)?;
            pipeline::print_report(&classified);
        }
        Action::ListSources => pipeline::print_sources(&pipeline::load_config(&inputs)?),
    }

    Ok(())
}

/// Confirms the input paths, then runs the classification pass.
fn classify(
    multi: &MultiProgress,
    inputs: &mut Inputs,
) -> Result<Classified, Box<dyn std::error::Error>> {
    inputs.boundaries = prompt_path("District boundaries (GeoJSON)", &inputs.boundaries)?;
    inputs.readings = prompt_path("Sensor readings (CSV)", &inputs.readings)?;

    let progress = IndicatifProgress::readings_spinner(multi, "Classifying sensor readings");
    pipeline::classify(inputs, &progress)
}

fn prompt_path(prompt: &str, default: &Path) -> Result<PathBuf, dialoguer::Error> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(value.trim()))
}
