// Wire records exchanged with the registry, plus the local `bentoml.yml`
// descriptor. Field names mirror the registry's JSON. Server-side records
// are lenient: missing fields fall back to defaults and empty strings in
// enum or timestamp positions read as `None`.

use chrono::NaiveDateTime;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp (de)serialization shared by every record.
pub mod datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
    const READ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.ffffff]` and the same with a
    /// `T` separator. Offsets are folded into UTC.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.naive_utc());
        }
        READ_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    pub fn format(dt: &NaiveDateTime) -> String {
        dt.format(WRITE_FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_str(&super::format(dt)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => super::parse(s)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}"))),
            }
        }
    }
}

fn empty_as_none<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => {
            let de = <String as IntoDeserializer<'de, D::Error>>::into_deserializer(s);
            T::deserialize(de).map(Some)
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    User,
    Organization,
    Cluster,
    Bento,
    BentoVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Failed,
}

/// Driven by the registry's image builder, never by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBuildStatus {
    Pending,
    Building,
    Success,
    Failed,
}

// ---------------------------------------------------------------------------
// Local descriptor (bentoml.yml)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BentoMlYamlMetadata {
    pub service_name: String,
    pub service_version: String,
    pub module_name: String,
    pub module_file: String,
    #[serde(default = "now", with = "datetime")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BentoMlYamlApi {
    pub name: String,
    pub docs: String,
    pub input_type: String,
    pub output_type: String,
}

/// Parsed `bentoml.yml`. Read-only input to a push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BentoMlYaml {
    pub version: String,
    pub kind: String,
    pub metadata: BentoMlYamlMetadata,
    pub apis: Vec<BentoMlYamlApi>,
}

// ---------------------------------------------------------------------------
// Registry records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BentoVersionManifest {
    pub metadata: BentoMlYamlMetadata,
    pub apis: Vec<BentoMlYamlApi>,
}

impl From<&BentoMlYaml> for BentoVersionManifest {
    fn from(yaml: &BentoMlYaml) -> Self {
        BentoVersionManifest {
            metadata: yaml.metadata.clone(),
            apis: yaml.apis.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
}

impl User {
    /// Full name when the registry knows one, login name otherwise.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.name.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub uid: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "datetime::option")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationList {
    pub start: u64,
    pub count: u64,
    pub total: u64,
    pub items: Vec<Organization>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bento {
    pub uid: String,
    pub name: String,
    pub description: Option<String>,
    pub latest_version: Option<Box<BentoVersion>>,
    #[serde(with = "datetime::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(with = "datetime::option")]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBento {
    pub name: String,
    pub description: String,
}

/// One server-side bento version. `presigned_s3_url` is only populated on
/// the presign response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BentoVersion {
    pub uid: String,
    pub description: Option<String>,
    pub version: String,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub image_build_status: Option<ImageBuildStatus>,
    #[serde(deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<UploadStatus>,
    pub upload_finished_reason: Option<String>,
    pub presigned_s3_url: Option<String>,
    pub manifest: Option<BentoVersionManifest>,
    #[serde(with = "datetime::option")]
    pub upload_started_at: Option<NaiveDateTime>,
    #[serde(with = "datetime::option")]
    pub upload_finished_at: Option<NaiveDateTime>,
    #[serde(with = "datetime::option")]
    pub build_at: Option<NaiveDateTime>,
    #[serde(with = "datetime::option")]
    pub created_at: Option<NaiveDateTime>,
}

impl BentoVersion {
    pub fn presigned_url(&self) -> Option<&str> {
        self.presigned_s3_url.as_deref().filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBentoVersion {
    pub description: String,
    pub version: String,
    #[serde(with = "datetime")]
    pub build_at: NaiveDateTime,
    pub manifest: BentoVersionManifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishUploadBentoVersion {
    pub status: UploadStatus,
    pub reason: String,
}
