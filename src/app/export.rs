use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::MetricsError;
use crate::metrics::{Aggregates, LatencyHistogram, MetricSample, names};

use super::runner::RunReport;

pub(crate) async fn export_csv(path: &str, samples: &[MetricSample]) -> Result<(), MetricsError> {
    let io_err = |source| MetricsError::Io {
        context: "csv export",
        source,
    };
    let file = tokio::fs::File::create(path).await.map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(b"timestamp_ms,metric,kind,value\n")
        .await
        .map_err(io_err)?;
    for sample in samples {
        let line = format!(
            "{},{},{},{}\n",
            sample.timestamp_ms, sample.name, sample.kind, sample.value
        );
        writer.write_all(line.as_bytes()).await.map_err(io_err)?;
    }
    writer.flush().await.map_err(io_err)?;
    Ok(())
}

fn latency_json(values: &[u64]) -> Result<serde_json::Value, MetricsError> {
    let histogram = LatencyHistogram::from_values(values)?;
    let (p50, p90, p99) = histogram.percentiles();
    Ok(serde_json::json!({
        "count": histogram.count(),
        "p50_ms": p50,
        "p90_ms": p90,
        "p99_ms": p99,
        "max_ms": histogram.max(),
        "histogram_b64": histogram.encode_base64()?,
    }))
}

pub(crate) async fn export_json(
    path: &str,
    report: &RunReport,
    aggregates: &Aggregates,
) -> Result<(), MetricsError> {
    let payload = serde_json::json!({
        "verdict": report.verdict,
        "duration_ms": u64::try_from(report.stats.elapsed.as_millis()).unwrap_or(u64::MAX),
        "identities": report.identities,
        "aborted_iterations": report.stats.total_aborted(),
        "provisioning_failures": report.provisioning_failures,
        "latency": {
            (names::PROCESSING_LATENCY): latency_json(aggregates.trend(names::PROCESSING_LATENCY))?,
            (names::HTTP_REQ_DURATION): latency_json(aggregates.trend(names::HTTP_REQ_DURATION))?,
        },
        "samples": report.samples,
    });

    let io_err = |source| MetricsError::Io {
        context: "json export",
        source,
    };
    let json = serde_json::to_vec_pretty(&payload).map_err(|err| MetricsError::Encode {
        context: "json export",
        source: err,
    })?;
    let file = tokio::fs::File::create(path).await.map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await.map_err(io_err)?;
    writer.flush().await.map_err(io_err)?;
    Ok(())
}
