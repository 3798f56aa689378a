//! Column names and lookup tables shared by the pipeline stages.

// Source columns
pub const NAME_COLUMN: &str = "name";
pub const CAR_MODEL_COLUMN: &str = "car_model";
pub const VEHICLE_TYPE_COLUMN: &str = "vehicleType";
pub const GEARBOX_COLUMN: &str = "gearbox";
pub const FUEL_TYPE_COLUMN: &str = "fuelType";
pub const KILOMETER_COLUMN: &str = "kilometer";
pub const DATE_CRAWLED_COLUMN: &str = "dateCrawled";
pub const DATE_CREATED_COLUMN: &str = "dateCreated";
pub const LAST_SEEN_COLUMN: &str = "lastSeen";

/// Columns parsed as timestamps whenever a dataset is loaded.
pub const DATE_COLUMNS: [&str; 3] = [DATE_CRAWLED_COLUMN, LAST_SEEN_COLUMN, DATE_CREATED_COLUMN];

/// Candidate identifier columns for the body-type lookup, in order of preference.
pub const MODEL_COLUMNS: [&str; 2] = [CAR_MODEL_COLUMN, NAME_COLUMN];

// Columns after the rename step
pub const REGISTRATION_YEAR_COLUMN: &str = "car_creation_year";
pub const REGISTRATION_MONTH_COLUMN: &str = "car_creation_month";
pub const UNREPAIRED_DAMAGE_COLUMN: &str = "unrepaired_damage";
pub const SOLD_DATE_COLUMN: &str = "sold_date";

// Derived columns
pub const AD_DURATION_COLUMN: &str = "ad_duration_days";
pub const CAR_AGE_COLUMN: &str = "car_age_listed_years";
pub const KILOMETER_YEAR_COLUMN: &str = "kilometer_year";
pub const SEASON_COLUMN: &str = "season";

pub const RENAMED_COLUMNS: [(&str, &str); 9] = [
    ("dateCrawled", "dateCrawled"),
    ("name", "car_model"),
    ("yearOfRegistration", "car_creation_year"),
    ("powerPS", "power_HP"),
    ("monthOfRegistration", "car_creation_month"),
    ("notRepairedDamage", "unrepaired_damage"),
    ("dateCreated", "dateCreated"),
    ("nrOfPictures", "num_pictures"),
    ("lastSeen", "sold_date"),
];

pub const VEHICLE_TYPE_VALUES: [(&str, &str); 8] = [
    ("andere", "other"),
    ("limousine", "Sedan"),
    ("kleinwagen", "Hatchback"),
    ("kombi", "Station wagon (estate)"),
    ("cabrio", "Cabriolet"),
    ("coupe", "Coupe"),
    ("bus", "Van"),
    ("suv", "Suv"),
];

pub const GEARBOX_VALUES: [(&str, &str); 2] = [("manuell", "Manual"), ("automatik", "Automatic")];

pub const FUEL_TYPE_VALUES: [(&str, &str); 6] = [
    ("benzin", "Petrol"),
    ("diesel", "Diesel"),
    ("lpg", "LPG"),
    ("andere", "Other"),
    ("hybrid", "Hybrid"),
    ("elektro", "Electric"),
];

pub const DAMAGE_VALUES: [(&str, &str); 2] = [("nein", "No"), ("ja", "Yes")];

/// Columns with no further use once the categorical values are remapped.
pub const DROPPED_COLUMNS: [&str; 5] = ["index", "num_pictures", "seller", "offerType", "dateCrawled"];

// Row filters. Both registration-year bounds are exclusive.
pub const MIN_REGISTRATION_YEAR: i64 = 1980;
pub const MAX_REGISTRATION_YEAR: i64 = 2017;
pub const MAX_KILOMETER_YEAR: f64 = 65000.0;

/// Cell contents read back as missing values.
pub const NA_TOKENS: [&str; 11] = ["", "NaN", "nan", "NA", "N/A", "n/a", "NULL", "null", "None", "<NA>", "#N/A"];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Lookup defaults
pub const DEFAULT_SEARCH_URL: &str = "https://www.auto-data.net/en/results";
pub const DEFAULT_SEARCH_PARAM: &str = "search";
pub const DEFAULT_CONTAINER_SELECTOR: &str = "span.additional";
pub const DEFAULT_VALUE_SELECTOR: &str = "strong";
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Split defaults
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;
