pub mod job;
pub mod metric;
pub mod responses;
pub mod user;

/// Optional flag accepted either as a JSON boolean or as the integer 0/1
/// that SQLite-backed callers send.
pub(crate) mod flag {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Bool(b)) => Ok(Some(b)),
            Some(Raw::Int(0)) => Ok(Some(false)),
            Some(Raw::Int(1)) => Ok(Some(true)),
            Some(Raw::Int(n)) => Err(de::Error::custom(format!(
                "invalid flag `{n}`, expected a boolean or 0/1"
            ))),
        }
    }
}
