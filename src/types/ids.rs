use crate::errors::InvalidImageId;
use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;
use std::fmt::{Display, Formatter};

/// Breadboard run ID
#[derive(Copy, Clone, Shrinkwrap, Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RunId(pub u32);

/// Breadboard image ID
#[derive(Copy, Clone, Shrinkwrap, Serialize, Deserialize, Debug, Hash, Eq, PartialEq)]
pub struct ImageId(pub u32);

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Display for ImageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for RunId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<u32> for ImageId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Image IDs coming out of a table are often floating-point. The fractional
/// part is truncated, e.g. `10.0` and `10.7` name image 10.
impl TryFrom<f64> for ImageId {
    type Error = InvalidImageId;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value >= 0.0 && value < (u32::MAX as f64 + 1.0) {
            Ok(Self(value as u32))
        } else {
            Err(InvalidImageId(value))
        }
    }
}
