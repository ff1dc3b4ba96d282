use shared::types::ServiceRecord;

/// Result of reading a stored record. A value that does not parse still
/// yields a record, with no port bindings, so a corrupt registration never
/// aborts the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Ok(ServiceRecord),
    Malformed(ServiceRecord),
}

impl Decoded {
    pub fn into_record(self) -> ServiceRecord {
        match self {
            Decoded::Ok(record) | Decoded::Malformed(record) => record,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Decoded::Malformed(_))
    }
}

/// Serialize a record into the JSON shape stored in the directory
pub fn encode(record: &ServiceRecord) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

/// Parse a stored value; see [`Decoded`] for the malformed case
pub fn decode(value: &str) -> Decoded {
    match serde_json::from_str::<ServiceRecord>(value) {
        Ok(record) => Decoded::Ok(record),
        Err(e) => {
            tracing::debug!("Ignoring malformed service record: {}", e);
            Decoded::Malformed(ServiceRecord::default())
        }
    }
}
