//! Table Schemas
//! Column contracts for every input file, checked once at load.

/// Bumped whenever a column is renamed or becomes required.
pub const SCHEMA_VERSION: u32 = 1;

pub mod columns {
    pub const ID: &str = "ID";
    pub const YEAR: &str = "Year";
    pub const COUNTRY: &str = "Country name";
    pub const START_DATE: &str = "Start date";
    pub const END_DATE: &str = "End date";
    pub const TYPE: &str = "Type";
    pub const REGIONS: &str = "regions";
    pub const REGION_CODE: &str = "Region code";
    pub const CAUSE: &str = "Cause";
    pub const FATALITIES: &str = "Fatalities";
    pub const LOSSES: &str = "Losses (mln EUR, 2020)";

    pub const RAW_REGIONS: &str = "Regions affected (v2021)";
    pub const RAW_LOSSES: &str = "Losses (2020 euro)";

    pub const DAY: &str = "DAY";
    pub const GRID_NO: &str = "GRID_NO";
    pub const PRECIPITATION: &str = "PRECIPITATION";
    pub const TEMPERATURE_AVG: &str = "TEMPERATURE_AVG";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";

    pub const CODE: &str = "Code";
    pub const NAME: &str = "Name";
    pub const COORDINATES: &str = "Coordinates";

    pub const TEMP_YEAR: &str = "YEAR";
    pub const NO_SMOOTHING: &str = "No_Smoothing";
    pub const LOWESS: &str = "Lowess(5)";
}

/// Required and optional column names of one input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl TableSchema {
    /// Required columns absent from `present`, in declaration order.
    pub fn missing_columns<S: AsRef<str>>(&self, present: &[S]) -> Vec<String> {
        self.required
            .iter()
            .filter(|required| !present.iter().any(|name| name.as_ref() == **required))
            .map(|required| required.to_string())
            .collect()
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.required.contains(&column) || self.optional.contains(&column)
    }
}

pub const FLOOD_EVENTS: TableSchema = TableSchema {
    name: "flood_events",
    required: &[
        columns::ID,
        columns::YEAR,
        columns::COUNTRY,
        columns::START_DATE,
        columns::END_DATE,
        columns::REGIONS,
        columns::CAUSE,
        columns::FATALITIES,
        columns::LOSSES,
    ],
    optional: &[columns::TYPE, columns::REGION_CODE],
};

pub const RAINFALL: TableSchema = TableSchema {
    name: "rainfall",
    required: &[columns::DAY, columns::GRID_NO, columns::PRECIPITATION],
    optional: &[columns::TEMPERATURE_AVG, columns::LATITUDE, columns::LONGITUDE],
};

pub const REGIONS: TableSchema = TableSchema {
    name: "regions",
    required: &[columns::CODE, columns::NAME, columns::COORDINATES],
    optional: &[],
};

pub const GLOBAL_TEMPERATURE: TableSchema = TableSchema {
    name: "global_temperature",
    required: &[columns::TEMP_YEAR, columns::NO_SMOOTHING],
    optional: &[columns::LOWESS],
};

/// Raw flood export consumed by `prepare-events`.
pub const RAW_FLOOD_EXPORT: TableSchema = TableSchema {
    name: "raw_flood_export",
    required: &[
        columns::ID,
        columns::YEAR,
        columns::COUNTRY,
        columns::START_DATE,
        columns::END_DATE,
        columns::TYPE,
        columns::RAW_REGIONS,
        columns::CAUSE,
        columns::FATALITIES,
        columns::RAW_LOSSES,
    ],
    optional: &[],
};
