use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use foundation::geo::Cartographic;
use foundation::time::{TimeSpan, Timestamp};
use tracing::{debug, warn};

const LAT_NAMES: &[&str] = &["lat", "latitude", "y"];
const LON_NAMES: &[&str] = &["lon", "long", "lng", "longitude", "x"];
const HEIGHT_NAMES: &[&str] = &["alt", "altitude", "height", "elevation", "z"];
const TIME_NAMES: &[&str] = &["time", "date", "datetime", "timestamp"];

/// One data point of the current variable.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// `NaN` when the cell holds no data.
    pub value: f64,
    pub position: Cartographic,
    pub time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq)]
struct TableRow {
    position: Cartographic,
    time: Option<Timestamp>,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOptions {
    /// Sentinel value treated as "no data" in addition to empty or unparsable cells.
    pub no_data: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    MissingHeader,
    Csv(String),
    MissingColumn(&'static str),
    NoVariables,
    UnknownVariable(String),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::MissingHeader => write!(f, "table has no header line"),
            TableError::Csv(msg) => write!(f, "malformed CSV: {msg}"),
            TableError::MissingColumn(kind) => write!(f, "table has no {kind} column"),
            TableError::NoVariables => write!(f, "table has no numeric variable column"),
            TableError::UnknownVariable(name) => write!(f, "unknown variable: {name}"),
        }
    }
}

impl std::error::Error for TableError {}

/// Geo-located tabular data parsed from CSV text.
///
/// Value and time ranges are computed once per load and once per variable
/// selection; point queries read the cached values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    options: TableOptions,
    variables: Vec<String>,
    rows: Vec<TableRow>,
    current: usize,
    value_range: Option<(f64, f64)>,
    time_range: Option<TimeSpan>,
    loading: bool,
}

impl TableData {
    pub fn new(options: TableOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn from_csv_str(text: &str, options: TableOptions) -> Result<Self, TableError> {
        let mut table = Self::new(options);
        table.load_text(text)?;
        Ok(table)
    }

    /// Replaces all data with the parsed contents of `text`.
    ///
    /// On error the previous contents are kept and the loading flag is cleared.
    pub fn load_text(&mut self, text: &str) -> Result<(), TableError> {
        self.loading = true;
        let parsed = parse_csv(text, &self.options);
        self.loading = false;

        let (variables, rows) = parsed?;
        self.variables = variables;
        self.rows = rows;
        self.current = 0;
        self.time_range = compute_time_range(&self.rows);
        self.refresh_value_range();
        debug!(
            rows = self.rows.len(),
            variables = self.variables.len(),
            has_time = self.time_range.is_some(),
            "table loaded"
        );
        Ok(())
    }

    /// Marks the table as waiting for data from an asynchronous source.
    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn current_variable(&self) -> Option<&str> {
        self.variables.get(self.current).map(String::as_str)
    }

    pub fn set_current_variable(&mut self, name: &str) -> Result<(), TableError> {
        let idx = self
            .variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| TableError::UnknownVariable(name.to_string()))?;
        self.current = idx;
        self.refresh_value_range();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn point_list(&self) -> Vec<DataPoint> {
        self.rows
            .iter()
            .map(|row| DataPoint {
                value: row
                    .values
                    .get(self.current)
                    .copied()
                    .flatten()
                    .unwrap_or(f64::NAN),
                position: row.position,
                time: row.time,
            })
            .collect()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.value_range.map(|(min, _)| min)
    }

    pub fn max_value(&self) -> Option<f64> {
        self.value_range.map(|(_, max)| max)
    }

    pub fn time_range(&self) -> Option<TimeSpan> {
        self.time_range
    }

    pub fn has_time_data(&self) -> bool {
        self.time_range.is_some()
    }

    pub fn is_no_data(&self, value: f64) -> bool {
        value.is_nan() || self.options.no_data == Some(value)
    }

    fn refresh_value_range(&mut self) {
        let mut range: Option<(f64, f64)> = None;
        for row in &self.rows {
            let Some(v) = row.values.get(self.current).copied().flatten() else {
                continue;
            };
            if self.is_no_data(v) {
                continue;
            }
            range = Some(match range {
                Some((min, max)) => (min.min(v), max.max(v)),
                None => (v, v),
            });
        }
        self.value_range = range;
    }
}

fn compute_time_range(rows: &[TableRow]) -> Option<TimeSpan> {
    let mut span: Option<TimeSpan> = None;
    for t in rows.iter().filter_map(|r| r.time) {
        span = Some(match span {
            Some(s) => TimeSpan::new(s.start.min(t), s.end.max(t)),
            None => TimeSpan::instant(t),
        });
    }
    span
}

fn parse_csv(text: &str, options: &TableOptions) -> Result<(Vec<String>, Vec<TableRow>), TableError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| TableError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.iter().all(String::is_empty) {
        return Err(TableError::MissingHeader);
    }
    let records: Vec<StringRecord> = reader
        .into_records()
        .filter(|r| !matches!(r, Ok(rec) if rec.iter().all(str::is_empty)))
        .collect::<Result<_, _>>()
        .map_err(|e| TableError::Csv(e.to_string()))?;

    let find = |names: &[&str]| {
        header
            .iter()
            .position(|h| names.contains(&h.to_ascii_lowercase().as_str()))
    };
    let lat_col = find(LAT_NAMES).ok_or(TableError::MissingColumn("latitude"))?;
    let lon_col = find(LON_NAMES).ok_or(TableError::MissingColumn("longitude"))?;
    let height_col = find(HEIGHT_NAMES);
    let time_col = find(TIME_NAMES);

    let var_cols: Vec<usize> = (0..header.len())
        .filter(|&c| c != lat_col && c != lon_col && Some(c) != height_col && Some(c) != time_col)
        .filter(|&c| is_numeric_column(&records, c))
        .collect();
    if var_cols.is_empty() {
        return Err(TableError::NoVariables);
    }

    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in &records {
        let cell = |c: usize| record.get(c).unwrap_or("");
        let (Some(lat), Some(lon)) = (parse_number(cell(lat_col)), parse_number(cell(lon_col)))
        else {
            skipped += 1;
            continue;
        };
        let height = height_col.and_then(|c| parse_number(cell(c))).unwrap_or(0.0);
        let position = Cartographic::new(lon, lat, height);
        if !position.is_valid() {
            skipped += 1;
            continue;
        }
        let time = time_col.and_then(|c| parse_time(cell(c)));
        let values = var_cols
            .iter()
            .map(|&c| parse_number(cell(c)).filter(|v| options.no_data != Some(*v)))
            .collect();
        rows.push(TableRow {
            position,
            time,
            values,
        });
    }
    if skipped > 0 {
        warn!(skipped, "skipped table rows without a valid position");
    }

    let variables = var_cols.iter().map(|&c| header[c].clone()).collect();
    Ok((variables, rows))
}

/// A column holds a variable when most of its non-empty cells are numbers.
fn is_numeric_column(records: &[StringRecord], col: usize) -> bool {
    let mut numeric = 0usize;
    let mut other = 0usize;
    for cell in records.iter().filter_map(|r| r.get(col)) {
        if cell.is_empty() {
            continue;
        }
        if parse_number(cell).is_some() {
            numeric += 1;
        } else {
            other += 1;
        }
    }
    numeric > 0 && numeric > other
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_time(cell: &str) -> Option<Timestamp> {
    if cell.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(cell) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}
