//! Metrics command: factory, worker and workstation productivity.

use std::io::Write;

use anyhow::{Context, Result};
use sf_core::{EventSource, MetricsConfig, MetricsReport, TimeWindow, compute_metrics};

use super::util::{format_duration, parse_datetime};

/// Options for the metrics command.
#[derive(Debug, Default)]
pub struct MetricsOptions<'a> {
    pub json: bool,
    pub since: Option<&'a str>,
    pub until: Option<&'a str>,
}

/// Computes metrics from `source` and writes them to `writer`.
pub fn run<W, S>(
    writer: &mut W,
    source: &S,
    base: &MetricsConfig,
    options: &MetricsOptions<'_>,
) -> Result<()>
where
    W: Write,
    S: EventSource + ?Sized,
{
    let config = MetricsConfig {
        window: window_from(options)?,
        ..base.clone()
    };
    tracing::debug!(?config, "computing metrics");

    let report = compute_metrics(source, &config).context("failed to compute metrics")?;

    if options.json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        write_report(writer, &report)?;
    }
    Ok(())
}

fn window_from(options: &MetricsOptions<'_>) -> Result<Option<TimeWindow>> {
    let start = options.since.map(parse_datetime).transpose()?;
    let end = options.until.map(parse_datetime).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        anyhow::ensure!(start < end, "--since must be earlier than --until");
    }
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    Ok(Some(TimeWindow { start, end }))
}

/// Writes the human-readable report.
pub fn write_report<W: Write>(writer: &mut W, report: &MetricsReport) -> Result<()> {
    let factory = &report.factory;
    writeln!(writer, "Factory")?;
    writeln!(
        writer,
        "  Productive time: {}",
        format_duration(factory.total_productive_time_seconds)
    )?;
    writeln!(writer, "  Units produced:  {}", factory.total_production_count)?;
    writeln!(
        writer,
        "  Production rate: {:.2} units/h",
        factory.avg_production_rate
    )?;
    writeln!(
        writer,
        "  Utilization:     {:.2}%",
        factory.avg_utilization_percent
    )?;

    writeln!(writer)?;
    writeln!(writer, "Workers")?;
    if report.workers.is_empty() {
        writeln!(writer, "  No workers registered.")?;
    } else {
        writeln!(
            writer,
            "{:<6}{:<14}{:>9}{:>9}{:>8}{:>7}{:>9}",
            "ID", "NAME", "ACTIVE", "IDLE", "UTIL%", "UNITS", "UNITS/H"
        )?;
        for w in &report.workers {
            writeln!(
                writer,
                "{:<6}{:<14}{:>9}{:>9}{:>8.2}{:>7}{:>9.2}",
                w.worker_id.as_str(),
                w.name,
                format_duration(w.total_active_time_seconds),
                format_duration(w.total_idle_time_seconds),
                w.utilization_percent,
                w.total_units_produced,
                w.units_per_hour,
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Workstations")?;
    if report.workstations.is_empty() {
        writeln!(writer, "  No workstations registered.")?;
    } else {
        writeln!(
            writer,
            "{:<6}{:<22}{:>9}{:>8}{:>7}{:>9}",
            "ID", "TYPE", "OCCUPIED", "UTIL%", "UNITS", "UNITS/H"
        )?;
        for s in &report.workstations {
            writeln!(
                writer,
                "{:<6}{:<22}{:>9}{:>8.2}{:>7}{:>9.2}",
                s.workstation_id.as_str(),
                s.kind,
                format_duration(s.occupancy_time_seconds),
                s.utilization_percent,
                s.total_units_produced,
                s.throughput_rate,
            )?;
        }
    }
    Ok(())
}
