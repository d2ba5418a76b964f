//! Typed configuration models.
//!
//! Loads a hierarchy straight into a serde model and checks the model
//! against the data it was built from.

use crate::config::{LoaderOptions, YamlLoader};
use crate::diff::diff_values;
use crate::error::{ConfigError, Result};
use crate::keypath::{KeyPath, get_value_for_path};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

fn model_name<T>() -> String {
    std::any::type_name::<T>().to_string()
}

fn model_error<T, E: ToString>(message: E) -> ConfigError {
    let err = ConfigError::Model {
        model: model_name::<T>(),
        message: message.to_string(),
    };
    error!("{}", err);
    err
}

/// Load a hierarchical YAML file into the model `T`.
///
/// Keys the model does not use are tolerated: the model is serialized again
/// and any difference to the loaded data is logged as a warning.
pub fn load_and_verify<T>(file: &Path, options: &LoaderOptions) -> Result<T>
where
    T: DeserializeOwned + Serialize,
{
    let data = YamlLoader::new(options.clone()).load(file)?;
    let model: T = serde_json::from_value(data.clone()).map_err(model_error::<T, _>)?;

    let round_trip = serde_json::to_value(&model).map_err(model_error::<T, _>)?;
    let diff = diff_values(&data, &round_trip);
    if !diff.is_empty() {
        warn!(
            "Config {} contains unused parameters for {}:\n{}",
            file.display(),
            model_name::<T>(),
            diff
        );
    } else {
        debug!("Config {} matches {}", file.display(), model_name::<T>());
    }

    Ok(model)
}

/// Check that every key path exists in `model` and names an existing file or
/// directory.
pub fn verify_files_exist<T: Serialize>(model: &T, keys: &[KeyPath]) -> Result<()> {
    let data = serde_json::to_value(model).map_err(model_error::<T, _>)?;

    for key in keys {
        let file = match get_value_for_path(&data, key) {
            None => {
                let err = ConfigError::MissingKey {
                    path: key.to_string(),
                    model: model_name::<T>(),
                };
                error!("{}", err);
                return Err(err);
            }
            Some(Value::String(s)) => PathBuf::from(s),
            Some(other) => {
                return Err(model_error::<T, _>(format!("value of {} is not a path: {}", key, other)));
            }
        };

        if !file.exists() {
            let err = ConfigError::MissingFile {
                key: key.to_string(),
                file,
            };
            error!("{}", err);
            return Err(err);
        }
    }

    Ok(())
}
