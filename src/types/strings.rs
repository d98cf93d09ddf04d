use aliri_braid::braid;

/// Name of a lab, i.e. the partition of the database which scopes all queries.
#[braid(serde)]
pub struct LabName;

/// Image name, usually the file name of the image without its extension,
/// e.g. `10-09-2018_00_21_57_TopA`
#[braid(serde)]
pub struct ImageName;

/// Breadboard API key.
#[braid(serde)]
pub struct ApiKey;
