use crate::config::FeatureConfig;
use crate::constants::*;
use crate::error::{PipelineError, Result, TableError};
use crate::storage;
use crate::table::{Table, Value};
use chrono::Datelike;
use metrics::counter;
use std::fmt;
use tracing::{debug, error, info, Span};

type StepResult = std::result::Result<(), TableError>;
type Step = fn(&mut Table) -> StepResult;

/// Transforms in execution order. Later steps read columns written or
/// rows kept by earlier ones.
const STEPS: &[(&str, Step)] = &[
    ("rename_columns", rename_columns),
    ("remap_categories", remap_categories),
    ("drop_unused_columns", drop_unused_columns),
    ("ad_duration_days", ad_duration_days),
    ("drop_registration_month", drop_registration_month),
    ("filter_registration_year", filter_registration_year),
    ("car_age_listed_years", car_age_listed_years),
    ("kilometer_year", kilometer_year),
    ("filter_kilometer_year", filter_kilometer_year),
    ("season", season),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn assign_season(month: u32) -> Season {
    match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Autumn,
        _ => Season::Winter,
    }
}

/// Runs every transform on `table`. Deterministic and free of I/O.
pub fn derive_features(mut table: Table) -> Result<Table> {
    for (name, step) in STEPS {
        step(&mut table).map_err(|source| PipelineError::Transform { step: *name, source })?;
        debug!("{} done, {} rows remain", name, table.len());
    }
    Ok(table)
}

fn rename_columns(table: &mut Table) -> StepResult {
    table.rename_columns(&RENAMED_COLUMNS);
    Ok(())
}

fn remap_categories(table: &mut Table) -> StepResult {
    let remaps: [(&str, &[(&str, &str)]); 4] = [
        (VEHICLE_TYPE_COLUMN, &VEHICLE_TYPE_VALUES[..]),
        (GEARBOX_COLUMN, &GEARBOX_VALUES[..]),
        (FUEL_TYPE_COLUMN, &FUEL_TYPE_VALUES[..]),
        (UNREPAIRED_DAMAGE_COLUMN, &DAMAGE_VALUES[..]),
    ];
    for (column, lookup) in remaps {
        table.map_column(column, |value| {
            value
                .as_str()
                .and_then(|s| lookup.iter().find(|(from, _)| *from == s))
                .map(|(_, to)| Value::text(*to))
                .unwrap_or(Value::Null)
        })?;
    }
    Ok(())
}

fn drop_unused_columns(table: &mut Table) -> StepResult {
    table.drop_columns(&DROPPED_COLUMNS)
}

fn ad_duration_days(table: &mut Table) -> StepResult {
    let sold = table.require_column(SOLD_DATE_COLUMN)?;
    let created = table.require_column(DATE_CREATED_COLUMN)?;
    table.derive_column(AD_DURATION_COLUMN, |row| {
        match (row[sold].as_timestamp(), row[created].as_timestamp()) {
            // whole days, floored like a timedelta's day component
            (Some(s), Some(c)) => Value::Int((s - c).num_milliseconds().div_euclid(86_400_000)),
            _ => Value::Null,
        }
    });
    Ok(())
}

fn drop_registration_month(table: &mut Table) -> StepResult {
    table.drop_columns(&[REGISTRATION_MONTH_COLUMN])
}

fn filter_registration_year(table: &mut Table) -> StepResult {
    let year = table.require_column(REGISTRATION_YEAR_COLUMN)?;
    let (min, max) = (MIN_REGISTRATION_YEAR as f64, MAX_REGISTRATION_YEAR as f64);
    let removed = table.retain_rows(|row| row[year].as_f64().is_some_and(|y| y > min && y < max));
    counter!("autos_rows_filtered_total", "filter" => "registration_year").increment(removed as u64);
    debug!("Registration year filter removed {} rows", removed);
    Ok(())
}

fn car_age_listed_years(table: &mut Table) -> StepResult {
    let created = table.require_column(DATE_CREATED_COLUMN)?;
    let year = table.require_column(REGISTRATION_YEAR_COLUMN)?;
    table.derive_column(CAR_AGE_COLUMN, |row| {
        match (row[created].as_timestamp(), row[year].as_i64()) {
            (Some(ts), Some(y)) => Value::Int(i64::from(ts.year()) - y),
            _ => Value::Null,
        }
    });
    Ok(())
}

fn kilometer_year(table: &mut Table) -> StepResult {
    let km = table.require_column(KILOMETER_COLUMN)?;
    let age = table.require_column(CAR_AGE_COLUMN)?;
    table.derive_column(KILOMETER_YEAR_COLUMN, |row| match row[age].as_f64() {
        // zero-age listings are pinned to 0 instead of dividing by zero
        Some(a) if a == 0.0 => Value::Float(0.0),
        Some(a) => row[km].as_f64().map_or(Value::Null, |k| Value::Float(k / a)),
        None => Value::Null,
    });
    Ok(())
}

fn filter_kilometer_year(table: &mut Table) -> StepResult {
    let km_year = table.require_column(KILOMETER_YEAR_COLUMN)?;
    let removed = table.retain_rows(|row| row[km_year].as_f64().is_some_and(|v| v < MAX_KILOMETER_YEAR));
    counter!("autos_rows_filtered_total", "filter" => "kilometer_year").increment(removed as u64);
    debug!("Kilometer per year filter removed {} rows", removed);
    Ok(())
}

fn season(table: &mut Table) -> StepResult {
    let created = table.require_column(DATE_CREATED_COLUMN)?;
    table.derive_column(SEASON_COLUMN, |row| {
        row[created]
            .as_timestamp()
            .map_or(Value::Null, |ts| Value::text(assign_season(ts.month()).as_str()))
    });
    Ok(())
}

/// Feature engineering stage: load, derive, save.
pub struct FeatureEngineer {
    config: FeatureConfig,
    span: Span,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig, span: Span) -> Self {
        Self { config, span }
    }

    pub fn load(&self) -> Result<Table> {
        let _enter = self.span.enter();
        storage::load_csv(&self.config.input_file, &DATE_COLUMNS).map_err(|e| {
            error!("{}", e);
            e
        })
    }

    pub fn derive(&self, table: Table) -> Result<Table> {
        let _enter = self.span.enter();
        info!("Feature Engineering started");
        let derived = derive_features(table).map_err(|e| {
            error!("Error in feature engineering: {}", e);
            e
        })?;
        info!("Feature Engineering completed with {} rows", derived.len());
        Ok(derived)
    }

    pub fn save(&self, table: &Table) -> Result<()> {
        let _enter = self.span.enter();
        storage::save_csv(table, &self.config.data_path).map_err(|e| {
            error!("Error saving data: {}", e);
            e
        })
    }

    /// Nothing is written when a transform fails.
    pub fn run(&self) -> Result<Table> {
        let table = self.load()?;
        let derived = self.derive(table)?;
        self.save(&derived)?;
        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_covers_every_month() {
        let seasons: Vec<Season> = (1..=12).map(assign_season).collect();
        use Season::*;
        assert_eq!(
            seasons,
            vec![
                Winter, Winter, Spring, Spring, Spring, Summer, Summer, Summer, Autumn, Autumn,
                Autumn, Winter
            ]
        );
    }

    #[test]
    fn remap_nulls_unknown_values() {
        let mut t = Table::new(["vehicleType", "gearbox", "fuelType", "unrepaired_damage"]);
        t.push_row(vec![
            Value::text("limousine"),
            Value::text("manuell"),
            Value::text("benzin"),
            Value::text("ja"),
        ])
        .unwrap();
        t.push_row(vec![Value::text("Sedan"), Value::Null, Value::Int(3), Value::text("maybe")])
            .unwrap();

        remap_categories(&mut t).unwrap();
        assert_eq!(
            t.rows()[0],
            vec![
                Value::text("Sedan"),
                Value::text("Manual"),
                Value::text("Petrol"),
                Value::text("Yes")
            ]
        );
        assert!(t.rows()[1].iter().all(Value::is_null));
    }

    #[test]
    fn zero_age_gives_zero_kilometer_year() {
        let mut t = Table::new(["kilometer", "car_age_listed_years"]);
        t.push_row(vec![Value::Int(5000), Value::Int(0)]).unwrap();
        t.push_row(vec![Value::Int(150000), Value::Int(25)]).unwrap();
        t.push_row(vec![Value::Null, Value::Int(0)]).unwrap();

        kilometer_year(&mut t).unwrap();
        let values = t.column(KILOMETER_YEAR_COLUMN).unwrap();
        assert_eq!(values, vec![&Value::Float(0.0), &Value::Float(6000.0), &Value::Float(0.0)]);
    }

    #[test]
    fn missing_column_names_the_failing_step() {
        let t = Table::new(["name"]);
        match derive_features(t) {
            Err(PipelineError::Transform { step, source }) => {
                assert_eq!(step, "remap_categories");
                assert_eq!(source, TableError::MissingColumn("vehicleType".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
