//! Storage stage: daily compounding shrinkage under the current conditions.

use serde_json::json;
use tracing::info;

use crate::error::PlannerError;
use crate::reference::ReferenceData;
use crate::trace::ExecutionTrace;
use crate::types::{StorageAnalysis, StorageConditions, StoragePoint, StorageReading};

// Tools: adjusted_loss_rate, project_value, max_storage_days

pub const IDEAL_TEMPERATURE_C: f64 = 20.0;
pub const IDEAL_HUMIDITY_PCT: f64 = 60.0;
const TEMPERATURE_PENALTY: f64 = 0.05;
const HUMIDITY_PENALTY: f64 = 0.02;
const MIN_LOSS_RATE: f64 = 0.1;
const MAX_LOSS_RATE: f64 = 5.0;

/// Reported when the farmer gave no reading.
const AMBIENT_TEMPERATURE_C: f64 = 25.0;

/// Daily loss in percent. Any deviation from 20 °C / 60 % adds to the crop's
/// base rate; the result is clamped to `[0.1, 5.0]`.
pub fn adjusted_loss_rate(reference: &ReferenceData, crop: &str, reading: &StorageReading) -> f64 {
    let mut rate = reference.daily_loss_rate(crop);

    if let Some(temperature) = reading.temperature {
        rate += (temperature - IDEAL_TEMPERATURE_C).abs() * TEMPERATURE_PENALTY;
    }
    if let Some(humidity) = reading.humidity {
        rate += (humidity - IDEAL_HUMIDITY_PCT).abs() * HUMIDITY_PENALTY;
    }

    rate.clamp(MIN_LOSS_RATE, MAX_LOSS_RATE)
}

/// Value curve for days `0..=days`. Remaining value is a percentage of the
/// initial value; cumulative loss is in the initial value's units.
pub fn project_value(days: u32, initial_value: f64, daily_loss_rate: f64) -> Vec<StoragePoint> {
    let mut points = Vec::with_capacity(days as usize + 1);
    let mut current = initial_value;

    for day in 0..=days {
        if day > 0 {
            current -= current * (daily_loss_rate / 100.0);
        }
        points.push(StoragePoint {
            day,
            remaining_value: round2(current / initial_value * 100.0),
            cumulative_loss: round2(initial_value - current),
        });
    }

    points
}

pub fn max_storage_days(shelf_life_days: u32, daily_loss_rate: f64) -> u32 {
    if daily_loss_rate <= 0.0 {
        return shelf_life_days;
    }
    shelf_life_days.min((100.0 / daily_loss_rate).floor() as u32)
}

/// Storage stage: fails on a non-positive quantity.
pub fn analyze_storage(
    reference: &ReferenceData,
    crop: &str,
    quantity_kg: f64,
    reading: &StorageReading,
    days: u32,
    trace: &mut ExecutionTrace,
) -> Result<StorageAnalysis, PlannerError> {
    if !(quantity_kg > 0.0) {
        return Err(PlannerError::InvalidQuantity(quantity_kg));
    }

    let daily_loss_rate = adjusted_loss_rate(reference, crop, reading);
    let projected_losses = project_value(days, quantity_kg, daily_loss_rate);

    trace.record(
        "calculate_losses",
        json!({
            "crop": crop,
            "reading": reading,
            "days": days,
            "initialQuantity": quantity_kg,
            "dailyLossRate": daily_loss_rate,
        }),
    );

    let shelf_life_days = reference.shelf_life_days(crop);
    let max_days = max_storage_days(shelf_life_days, daily_loss_rate);

    info!(
        "🏚️ Storage for {}: {:.2}%/day, safe for {} days",
        crop, daily_loss_rate, max_days
    );

    Ok(StorageAnalysis {
        current_storage: StorageConditions {
            temperature: reading.temperature.unwrap_or(AMBIENT_TEMPERATURE_C),
            humidity: reading.humidity.unwrap_or(IDEAL_HUMIDITY_PCT),
            shelf_life_days,
            daily_loss_rate,
        },
        projected_losses,
        max_storage_days: max_days,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
