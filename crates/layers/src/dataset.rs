use formats::table::{DataPoint, TableData};
use foundation::time::TimeSpan;

/// Read access to a loaded point dataset.
pub trait Dataset {
    fn points(&self) -> Vec<DataPoint>;
    fn min_value(&self) -> Option<f64>;
    fn max_value(&self) -> Option<f64>;
    fn time_range(&self) -> Option<TimeSpan>;
    fn is_loading(&self) -> bool;
    fn is_no_data(&self, value: f64) -> bool;
    fn current_variable(&self) -> Option<&str>;

    fn has_time_data(&self) -> bool {
        self.time_range().is_some()
    }
}

impl Dataset for TableData {
    fn points(&self) -> Vec<DataPoint> {
        self.point_list()
    }

    fn min_value(&self) -> Option<f64> {
        TableData::min_value(self)
    }

    fn max_value(&self) -> Option<f64> {
        TableData::max_value(self)
    }

    fn time_range(&self) -> Option<TimeSpan> {
        TableData::time_range(self)
    }

    fn is_loading(&self) -> bool {
        TableData::is_loading(self)
    }

    fn is_no_data(&self, value: f64) -> bool {
        TableData::is_no_data(self, value)
    }

    fn current_variable(&self) -> Option<&str> {
        TableData::current_variable(self)
    }
}
