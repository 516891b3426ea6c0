use chrono::NaiveDateTime;
use serde::Serialize;

use crate::git::{MAX_FIELD_LEN, UNKNOWN};
use crate::types::BuildVersionError;
use crate::utils::truncate_utf8;

/// Tool version, user name, project name, configuration, build mode.
pub const BUILD_ARGUMENT_NAMES: [&str; 5] =
    ["tool version", "user name", "project name", "configuration", "build mode"];

/// Build tools leave unexpanded macros such as `$(AS_USER_NAME)` in place.
const PLACEHOLDER_MARKER: char = '$';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    pub tool_version: String,
    pub user_name: String,
    pub project_name: String,
    pub configuration: String,
    pub build_mode: String,
    pub build_date: NaiveDateTime,
}

impl BuildMetadata {
    pub fn unknown(build_date: NaiveDateTime) -> Self {
        BuildMetadata {
            tool_version: UNKNOWN.to_string(),
            user_name: UNKNOWN.to_string(),
            project_name: UNKNOWN.to_string(),
            configuration: UNKNOWN.to_string(),
            build_mode: UNKNOWN.to_string(),
            build_date,
        }
    }
}

/// Validate the build-tool arguments.
///
/// Anything other than exactly five arguments leaves every field `Unknown`,
/// or fails when `error_on_missing` is set. Arguments that are blank or still
/// hold a placeholder become `Unknown` individually.
pub fn build_metadata(
    args: &[String],
    build_date: NaiveDateTime,
    error_on_missing: bool,
) -> Result<BuildMetadata, BuildVersionError> {
    let [tool_version, user_name, project_name, configuration, build_mode] = args else {
        let err = BuildVersionError::MissingArguments {
            expected: BUILD_ARGUMENT_NAMES.len(),
            received: args.len(),
        };
        if error_on_missing {
            return Err(err);
        }
        log::warn!("{}, build fields set to {}", err, UNKNOWN);
        return Ok(BuildMetadata::unknown(build_date));
    };

    let [n0, n1, n2, n3, n4] = BUILD_ARGUMENT_NAMES;
    Ok(BuildMetadata {
        tool_version: sanitize(n0, tool_version),
        user_name: sanitize(n1, user_name),
        project_name: sanitize(n2, project_name),
        configuration: sanitize(n3, configuration),
        build_mode: sanitize(n4, build_mode),
        build_date,
    })
}

fn sanitize(field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        log::warn!("{}: empty argument, using {}", field, UNKNOWN);
        return UNKNOWN.to_string();
    }
    if value.starts_with(PLACEHOLDER_MARKER) {
        log::warn!("{}: unexpanded placeholder {:?}, using {}", field, value, UNKNOWN);
        return UNKNOWN.to_string();
    }
    truncate_utf8(value, MAX_FIELD_LEN).to_string()
}
