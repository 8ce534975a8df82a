// src/workflows/spot3d.rs

//! Threshold sweep over 3D stacks.
//!
//! Site selection fans out first, spot detection fans out over the selected
//! sites, and a final fan-in concatenates every batch's CSV into one file.

use crate::errors::Result;
use crate::layout::ExperimentLayout;
use crate::pipeline::{OutputLedger, StageSpec, StageUnit, StagedPipeline};
use crate::task::{Memory, ParallelTaskGroup, Task, TaskSpec};
use crate::workflows::ExperimentParams;

const SITES: &str = "selected_sites";
const SPOT_COUNT: &str = "spot_count";
const AGGREGATE: &str = "aggregated_spot_count";

pub fn pipeline(params: ExperimentParams) -> StagedPipeline<ExperimentParams> {
    let stages = vec![
        StageSpec::new(SITES, &[], |p: &ExperimentParams, _: &OutputLedger| {
            let group =
                ParallelTaskGroup::build(SITES, p.n_batches, |batch| sites_task(p, batch))?;
            Ok(StageUnit::Parallel(group))
        }),
        StageSpec::new(
            SPOT_COUNT,
            &[SITES],
            |p: &ExperimentParams, outputs: &OutputLedger| {
                let group = ParallelTaskGroup::build(SPOT_COUNT, p.n_batches, |batch| {
                    spot_count_task(p, outputs, batch)
                })?;
                Ok(StageUnit::Parallel(group))
            },
        ),
        StageSpec::new(
            AGGREGATE,
            &[SPOT_COUNT],
            |p: &ExperimentParams, outputs: &OutputLedger| {
                Ok(StageUnit::Single(aggregate_task(p, outputs)?))
            },
        ),
    ];
    StagedPipeline::new("spot-3d", params, stages)
}

/// Per-batch random site selection, written as a pickle for the next stage.
fn sites_task(p: &ExperimentParams, batch: u32) -> Result<Task> {
    let label = ExperimentLayout::batch_label(SITES, batch)?;
    let script = p.script("select_sites_3D.py");
    let spec = TaskSpec::new(&label, "python")
        .with_batch_index(batch)
        .arg(script.display().to_string())
        .arg("--host")
        .arg(p.host.as_str())
        .arg("--user")
        .arg(p.username.as_str())
        .arg("--password")
        .arg(p.password.as_str())
        .arg("--experiment")
        .arg(p.experiment.as_str())
        .arg("--plate")
        .arg(p.plate.as_str())
        .arg("--negative_wells")
        .arg(p.negative_wells.join(" "))
        .arg("--positive_wells")
        .arg(p.positive_wells.join(" "))
        .arg("--number_sites")
        .arg(p.n_sites.to_string())
        .arg("--output_file")
        .arg(format!("{label}.pkl"))
        .input(script)
        .output(p.layout.batch_output(SITES, batch, "pkl")?)
        .with_output_dir(p.layout.batch_dir(SITES, batch)?)
        .with_memory(Memory::gb(3));
    Ok(Task::new(spec))
}

/// Per-batch spot detection across the threshold series. The 3D detector is
/// the heavyweight step of the sweep, hence the larger memory request.
fn spot_count_task(p: &ExperimentParams, outputs: &OutputLedger, batch: u32) -> Result<Task> {
    let label = ExperimentLayout::batch_label(SPOT_COUNT, batch)?;
    let batch_file = outputs.batch(SITES, batch)?.to_path_buf();
    let script = p.script("get_spot_count_threshold_series_3D_mw.py");

    let spec = TaskSpec::new(&label, "python")
        .with_batch_index(batch)
        .arg(script.display().to_string())
        .arg("--host")
        .arg(p.host.as_str())
        .arg("--user")
        .arg(p.username.as_str())
        .arg("--password")
        .arg(p.password.as_str())
        .arg("--experiment")
        .arg(p.experiment.as_str())
        .arg("--thresholds")
        .args(p.thresholds.iter().map(|t| t.to_string()))
        .arg("--hard_rescaling")
        .args(p.hard_rescaling.iter().map(|v| v.to_string()))
        .arg("--plate")
        .arg(p.plate.as_str())
        .arg("--input_batch_file")
        .arg(batch_file.display().to_string())
        .arg("--output_file")
        .arg(format!("{label}.csv"))
        .input(batch_file)
        .input(script)
        .output(p.layout.batch_output(SPOT_COUNT, batch, "csv")?)
        .with_output_dir(p.layout.batch_dir(SPOT_COUNT, batch)?)
        .with_memory(Memory::gb(7));
    Ok(Task::new(spec))
}

/// Fan-in: concatenate every batch's CSV. The concatenation script writes to
/// stdout, so stdout is redirected straight into the declared output file.
fn aggregate_task(p: &ExperimentParams, outputs: &OutputLedger) -> Result<Task> {
    let batch_files = outputs.batched(SPOT_COUNT)?;
    let script = p.script("concatenate_csv.sh");

    let mut spec = TaskSpec::new(AGGREGATE, script.display().to_string()).input(script);
    for file in batch_files {
        spec = spec.arg(file.display().to_string()).input(file.clone());
    }
    let spec = spec
        .output(p.layout.stage_output(AGGREGATE, "csv"))
        .with_output_dir(p.layout.stage_dir(AGGREGATE))
        .with_stdout(format!("{AGGREGATE}.csv"))
        .with_memory(Memory::gb(1));
    Ok(Task::new(spec))
}
