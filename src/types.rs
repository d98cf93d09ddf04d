/// Primitive Breadboard API data types and NewType-patterns.
mod api_url;
mod ids;
mod strings;

pub use api_url::*;
pub use ids::*;
pub use strings::*;
