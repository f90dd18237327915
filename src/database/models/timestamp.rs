//! Entity timestamps are unix seconds on the wire. Rows read through `row_to_json` carry
//! `timestamp` columns as ISO strings without an offset, which are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

fn parse(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| format!("invalid unix timestamp {}", n)),
        Value::String(s) => {
            if let Ok(at) = DateTime::parse_from_rfc3339(s) {
                return Ok(at.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| format!("invalid timestamp {}", s))
        }
        other => Err(format!("invalid timestamp {}", other)),
    }
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.timestamp())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse(&value).map_err(de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_i64(at.timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }
        parse(&value).map(Some).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::database::models::timestamp")]
        created_at: DateTime<Utc>,
        #[serde(default, with = "crate::database::models::timestamp::option")]
        updated_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn reads_postgres_and_unix_forms() {
        let from_row: Stamped =
            serde_json::from_value(json!({"created_at": "2023-11-14T22:13:20", "updated_at": null})).unwrap();
        assert_eq!(from_row.created_at.timestamp(), 1_700_000_000);
        assert!(from_row.updated_at.is_none());

        let from_unix: Stamped =
            serde_json::from_value(json!({"created_at": 1_700_000_000, "updated_at": "2023-11-14 22:13:20.5"}))
                .unwrap();
        assert_eq!(from_unix.updated_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn writes_unix_seconds() {
        let stamped = Stamped {
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: None,
        };
        assert_eq!(
            serde_json::to_value(&stamped).unwrap(),
            json!({"created_at": 1_700_000_000, "updated_at": null})
        );
    }
}
