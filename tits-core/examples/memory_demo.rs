//! Demo of the measurement repository on the in-memory store
//!
//! Run with: cargo run -p tits-core --example memory_demo

use chrono::Duration;
use std::sync::Arc;
use tits_core::{
    datastore::memory::MemoryStore, multi_current_measurements, ExtremumOptions, MeasurementDto,
    MeasurementRepository, RangeOptions, StoreContext, Timestamp, TitsResult,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("TITS Memory Store Demo");
    println!("======================");

    let context = Arc::new(StoreContext::new(Arc::new(MemoryStore::new())));
    context.register_observer(|dto: &MeasurementDto| -> TitsResult<()> {
        println!("  observer: r{} = {} at {}", dto.resource_id, dto.value, dto.time);
        Ok(())
    });

    let sensor = MeasurementRepository::new(context.clone(), 1i64);
    let start = Timestamp::now().sub(Duration::hours(3))?;

    println!("\nWriting one value every 20 minutes for resource 1...");
    for step in 0..9i64 {
        let time = start.add(Duration::minutes(20 * step))?;
        sensor.add_measurement_at(20.0 + step as f64, time).await?;
    }
    MeasurementRepository::new(context.clone(), 2i64)
        .add_measurement(-4.0)
        .await?;

    if let Some(current) = sensor.current_measurement().await? {
        println!("\nCurrent: {} at {:?}", current.value(), current.time());
    }

    let target = start.add(Duration::minutes(47))?;
    if let Some(nearest) = sensor.measurement(target).await? {
        println!("Nearest to {}: {} at {:?}", target, nearest.value(), nearest.time());
    }

    if let Some(hourly) = sensor.measurements(RangeOptions::since(start)).await? {
        println!("\nHourly means:");
        for bucket in hourly {
            println!("  {:?}: {:.2}", bucket.time(), bucket.value());
        }
    }

    let range = ExtremumOptions::default();
    if let (Some(max), Some(min), Some(avg)) = (
        sensor.max_measurement(range).await?,
        sensor.min_measurement(range).await?,
        sensor.avg_measurement(range).await?,
    ) {
        println!("\nmax {} / min {} / avg {:.2}", max.value(), min.value(), avg.value());
    }

    println!("\nLatest of every resource:");
    for measurement in multi_current_measurements(&context, None).await? {
        println!("  {}: {}", measurement.resource_id(), measurement.value());
    }

    context.shutdown();
    println!("\n{:?}", context.stats());
    Ok(())
}
