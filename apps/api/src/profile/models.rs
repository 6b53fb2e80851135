use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form record as stored by the profile backend (internships, projects,
/// degrees, school results). Keys vary per form version.
pub type FieldMap = Map<String, Value>;

/// Explicit `null` reads as the field's default, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CareerPreferences {
    #[serde(deserialize_with = "null_as_default")]
    pub preferred_job_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub preferred_location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub availability_to_work: String,
    #[serde(flatten)]
    pub extra: FieldMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(deserialize_with = "null_as_default")]
    pub degrees: Vec<FieldMap>,
    #[serde(deserialize_with = "null_as_default")]
    pub class12: FieldMap,
    #[serde(deserialize_with = "null_as_default")]
    pub class10: FieldMap,
    #[serde(flatten)]
    pub extra: FieldMap,
}

/// Profile as returned by `GET /profile` on the profile backend.
/// Every scored field defaults so partial records still score; fields the
/// scorer does not know about are carried in `extra` and written back as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub career_preferences: CareerPreferences,
    #[serde(deserialize_with = "null_as_default")]
    pub profile_summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub key_skills: String,
    #[serde(deserialize_with = "null_as_default")]
    pub internships: Vec<FieldMap>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<FieldMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub education: Education,
    #[serde(flatten)]
    pub extra: FieldMap,
}

impl ProfileRecord {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_record_deserializes_with_defaults() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{ "keySkills": "Rust, SQL" }"#).unwrap();
        assert_eq!(record.key_skills, "Rust, SQL");
        assert!(record.resume_url.is_none());
        assert!(record.education.degrees.is_empty());
    }

    #[test]
    fn test_to_value_uses_camel_case() {
        let record = ProfileRecord {
            profile_summary: "Backend engineer".to_string(),
            ..Default::default()
        };
        let value = record.to_value();
        assert_eq!(value["profileSummary"], "Backend engineer");
        assert!(value["careerPreferences"].get("preferredJobType").is_some());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let record: ProfileRecord = serde_json::from_str(
            r#"{
                "keySkills": "Rust",
                "profileSummary": null,
                "careerPreferences": null,
                "internships": null,
                "resumeUrl": null,
                "education": { "degrees": null, "class12": null,
                               "class10": { "board": "CBSE" } }
            }"#,
        )
        .unwrap();
        assert_eq!(record.key_skills, "Rust");
        assert_eq!(record.profile_summary, "");
        assert_eq!(record.career_preferences, CareerPreferences::default());
        assert!(record.internships.is_empty());
        assert!(record.education.class12.is_empty());
        assert_eq!(record.education.class10["board"], "CBSE");
    }

    #[test]
    fn test_unmodelled_fields_survive_round_trip() {
        let raw = serde_json::json!({
            "fullName": "Asha Rao",
            "certifications": [{ "name": "AWS SAA" }],
            "keySkills": "Rust",
            "careerPreferences": { "preferredLocation": "Pune", "expectedSalary": 12 },
            "education": { "diploma": { "field": "CS" } }
        });
        let record: ProfileRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.extra["fullName"], "Asha Rao");

        let value = record.to_value();
        assert_eq!(value["fullName"], "Asha Rao");
        assert_eq!(value["certifications"][0]["name"], "AWS SAA");
        assert_eq!(value["careerPreferences"]["expectedSalary"], 12);
        assert_eq!(value["careerPreferences"]["preferredLocation"], "Pune");
        assert_eq!(value["education"]["diploma"]["field"], "CS");
    }
}
