// src/workflows/spot2d.rs

//! Threshold sweep over 2D projections.
//!
//! Three stages mirroring the bench protocol: per-batch intensity extrema,
//! one aggregation of rescaling limits over all batches, then a per-batch
//! spot count that reads both its own batch's extrema and the aggregate
//! file (a producer two stages back).

use crate::errors::Result;
use crate::layout::ExperimentLayout;
use crate::pipeline::{OutputLedger, StageSpec, StageUnit, StagedPipeline};
use crate::task::{Memory, ParallelTaskGroup, Task, TaskSpec};
use crate::workflows::ExperimentParams;

const EXTREMA: &str = "intensity_extrema";
const AGGREGATE: &str = "aggregated_extrema";
const SPOT_COUNT: &str = "spot_count";

pub fn pipeline(params: ExperimentParams) -> StagedPipeline<ExperimentParams> {
    let stages = vec![
        StageSpec::new(EXTREMA, &[], |p: &ExperimentParams, _: &OutputLedger| {
            let group =
                ParallelTaskGroup::build(EXTREMA, p.n_batches, |batch| extrema_task(p, batch))?;
            Ok(StageUnit::Parallel(group))
        }),
        StageSpec::new(
            AGGREGATE,
            &[EXTREMA],
            |p: &ExperimentParams, outputs: &OutputLedger| {
                Ok(StageUnit::Single(aggregate_task(p, outputs)?))
            },
        ),
        StageSpec::new(
            SPOT_COUNT,
            &[EXTREMA, AGGREGATE],
            |p: &ExperimentParams, outputs: &OutputLedger| {
                let group = ParallelTaskGroup::build(SPOT_COUNT, p.n_batches, |batch| {
                    spot_count_task(p, outputs, batch)
                })?;
                Ok(StageUnit::Parallel(group))
            },
        ),
    ];
    StagedPipeline::new("spot-2d", params, stages)
}

/// Per-batch scan of channel images for their intensity extrema.
fn extrema_task(p: &ExperimentParams, batch: u32) -> Result<Task> {
    let label = ExperimentLayout::batch_label(EXTREMA, batch)?;
    let script = p.script("get_intensity_extrema.py");
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
        .arg("--channel")
        .arg(p.channel.as_str())
        .arg("--negative_wells")
        .arg(p.negative_wells.join(" "))
        .arg("--positive_wells")
        .arg(p.positive_wells.join(" "))
        .arg("--number_sites")
        .arg(p.n_sites.to_string())
        .arg("--output_file")
        .arg(format!("{label}.pkl"))
        .input(script)
        .output(p.layout.batch_output(EXTREMA, batch, "pkl")?)
        .with_output_dir(p.layout.batch_dir(EXTREMA, batch)?)
        .with_memory(Memory::gb(1));
    Ok(Task::new(spec))
}

/// Fan-in: aggregate every batch's extrema into global rescaling limits.
fn aggregate_task(p: &ExperimentParams, outputs: &OutputLedger) -> Result<Task> {
    let batch_files = outputs.batched(EXTREMA)?;
    let script = p.script("aggregate_rescaling_limits.py");

    let mut spec = TaskSpec::new(AGGREGATE, "python")
        .arg(script.display().to_string())
        .arg("--input_files");
    for file in batch_files {
        spec = spec.arg(file.display().to_string()).input(file.clone());
    }
    let spec = spec
        .arg("--output_file")
        .arg(format!("{AGGREGATE}.pkl"))
        .input(script)
        .output(p.layout.stage_output(AGGREGATE, "pkl"))
        .with_output_dir(p.layout.stage_dir(AGGREGATE))
        .with_memory(Memory::gb(1));
    Ok(Task::new(spec))
}

/// Per-batch spot count over the threshold series, reading the batch's own
/// extrema plus the aggregated limits.
fn spot_count_task(p: &ExperimentParams, outputs: &OutputLedger, batch: u32) -> Result<Task> {
    let label = ExperimentLayout::batch_label(SPOT_COUNT, batch)?;
    let batch_file = outputs.batch(EXTREMA, batch)?.to_path_buf();
    let aggregate_file = outputs.single(AGGREGATE)?.to_path_buf();
    let script = p.script("get_spot_count_threshold_series.py");

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
        .arg("--channel")
        .arg(p.channel.as_str())
        .arg("--input_batch_file")
        .arg(batch_file.display().to_string())
        .arg("--input_aggregate_file")
        .arg(aggregate_file.display().to_string())
        .arg("--thresholds")
        .args(p.thresholds.iter().map(|t| t.to_string()))
        .arg("--output_file")
        .arg(format!("{label}.csv"))
        .input(batch_file)
        .input(aggregate_file)
        .input(script)
        .output(p.layout.batch_output(SPOT_COUNT, batch, "csv")?)
        .with_output_dir(p.layout.batch_dir(SPOT_COUNT, batch)?)
        .with_memory(Memory::gb(1));
    Ok(Task::new(spec))
}
