//! Image queries and the image table.

use crate::client::BreadboardClient;
use crate::constants::keys;
use crate::datetime::format_api_datetime;
use crate::errors::TransportError;
use crate::models::{string_list, ImageRecord};
use crate::table::{FallbackChain, FlatTable, ParamSelector, Row};
use crate::types::{ImageId, ImageName};
use itertools::Itertools;
use reqwest::{Method, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Name of the column holding the requested image names.
pub const IMAGE_NAME_COLUMN: &str = "imagename";

/// Fields of an image record which never become columns.
pub const REMOVED_IMAGE_COLUMNS: [&str; 8] = [
    "run",
    "name",
    "thumbnail",
    "atomsperpixel",
    "odpath",
    "settings",
    keys::LIST_BOUND_VARIABLES,
    "camera",
];

#[derive(Serialize)]
struct ImagesQuery<'a> {
    lab: &'a str,
    names: String,
}

#[derive(Serialize)]
struct NewImage<'a> {
    lab: &'a str,
    name: &'a str,
    created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filepath: Option<&'a str>,
}

/// Where to look for an image parameter: the parameters of the run which
/// produced the image, then the image record itself.
pub fn image_fallback_chain() -> FallbackChain<ImageRecord> {
    FallbackChain::<ImageRecord>::new()
        .then("run parameters", |image, param| {
            image.run_parameters()?.get(param).cloned()
        })
        .then("image field", |image, param| image.top_level(param))
}

impl BreadboardClient {
    /// Get the records of the named images.
    ///
    /// Records are in the order the server returns them, which is not
    /// necessarily the order of `names`.
    pub async fn fetch_images_raw(
        &self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Vec<ImageRecord>, TransportError> {
        let query = ImagesQuery {
            lab: self.lab_name.as_str(),
            names: names.into_iter().map(|n| n.as_ref().to_string()).join(","),
        };
        self.transport.get("/images", Some(&query)).await
    }

    /// Get a table of images, one row per name in `names`, with a column for
    /// each parameter chosen by `params`.
    ///
    /// A name without a matching record gets a row of nulls.
    pub async fn build_image_table(
        &self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
        params: impl Into<ParamSelector>,
    ) -> Result<FlatTable, TransportError> {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let records = self.fetch_images_raw(&names).await?;
        Ok(image_table(&names, &records, &params.into()))
    }

    /// Overwrite the name and parameters of an image. There is no check for
    /// concurrent edits: the last write wins.
    pub async fn update_image(
        &self,
        id: ImageId,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<Response, TransportError> {
        let mut payload = Map::new();
        payload.insert("name".to_string(), Value::String(name.to_string()));
        payload.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        let endpoint = format!("/images/{}/", id);
        self.transport
            .send_checked(Method::PUT, &endpoint, &payload)
            .await
    }

    /// Register a new image taken at `created`.
    pub async fn post_image(
        &self,
        name: &ImageName,
        created: OffsetDateTime,
        filepath: Option<&str>,
    ) -> Result<Response, TransportError> {
        let payload = NewImage {
            lab: self.lab_name.as_str(),
            name: name.as_str(),
            created: format_api_datetime(created),
            filepath,
        };
        self.transport
            .send_checked(Method::POST, "/images/", &payload)
            .await
    }
}

/// Columns of an image table, not counting [IMAGE_NAME_COLUMN].
pub(crate) fn image_columns(records: &[ImageRecord], params: &ParamSelector) -> BTreeSet<String> {
    let base = records.iter().flat_map(ImageRecord::top_level_keys);
    let mut columns: BTreeSet<String> = base.map(str::to_string).collect();
    match params {
        ParamSelector::All => {
            let run_params = records
                .iter()
                .filter_map(ImageRecord::run_parameters)
                .flat_map(|p| p.keys().cloned());
            columns.extend(run_params);
        }
        ParamSelector::ListBoundOnly => {
            let bound = records
                .iter()
                .filter_map(ImageRecord::run_parameters)
                .flat_map(|p| string_list(p.get(keys::LIST_BOUND_VARIABLES)))
                .map(str::to_string);
            columns.extend(bound);
        }
        ParamSelector::Explicit(given) => columns.extend(given.iter().cloned()),
    }
    for removed in REMOVED_IMAGE_COLUMNS {
        columns.remove(removed);
    }
    columns
}

fn find_record<'a>(records: &'a [ImageRecord], name: &str, index: usize) -> Option<&'a ImageRecord> {
    records
        .iter()
        .find(|r| r.name.as_deref() == Some(name))
        .or_else(|| records.get(index).filter(|r| r.name.is_none()))
}

pub(crate) fn image_table(
    names: &[String],
    records: &[ImageRecord],
    params: &ParamSelector,
) -> FlatTable {
    let columns = image_columns(records, params);
    let chain = image_fallback_chain();
    let header = std::iter::once(IMAGE_NAME_COLUMN.to_string()).chain(columns.iter().cloned());
    let mut table = FlatTable::new(header);
    for (i, name) in names.iter().enumerate() {
        let mut row = Row::new();
        row.insert(IMAGE_NAME_COLUMN.to_string(), Value::String(name.clone()));
        let record = find_record(records, name, i);
        if record.is_none() {
            log::warn!("No record found for image \"{}\", its row is left empty", name);
        }
        for column in &columns {
            let value = record
                .map(|r| chain.resolve_or_null(r, column))
                .unwrap_or(Value::Null);
            if value.is_null() {
                log::debug!("Image \"{}\" has no value for \"{}\"", name, column);
            }
            row.insert(column.clone(), value);
        }
        table.push_row(row);
    }
    table
}
