//! Validation query defaults

/// Get the appropriate validation query for a given driver.
///
/// Used when a pool enables validation without naming a query.
/// Oracle needs a FROM clause; everything else accepts `SELECT 1`.
pub fn default_validation_query(driver_name: &str) -> &'static str {
    match driver_name {
        "oracle" => "SELECT 1 FROM DUAL",
        _ => "SELECT 1",
    }
}
