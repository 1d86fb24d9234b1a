use std::fmt;

use json_syntax::Print;
use serde::{
    de::{self, MapAccess},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use sha2::{Digest, Sha256};

use super::{FieldDesignator, LicenseRecord};

impl LicenseRecord {
    /// Returns the value of the field with the given human-readable name.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.get(FieldDesignator::from_name(name)?)
    }

    /// Iterates over `(field name, value)` pairs, in table order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.iter().map(|(d, v)| (d.name(), v))
    }

    /// SHA-256 digest identifying the content of this record.
    ///
    /// Each present element is rendered as its designator followed by its
    /// value and a line feed, the entries are sorted and concatenated.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut data_to_canonicalize = Vec::with_capacity(self.len());

        for (field, data) in self.iter() {
            let mut entry = Vec::with_capacity(3 + data.len() + 1);
            entry.extend(field.id());
            entry.extend(data.as_bytes());
            entry.push(b'\n');

            data_to_canonicalize.push(entry);
        }

        data_to_canonicalize.sort_unstable();
        let canonical_data = data_to_canonicalize.as_slice().join([].as_slice());
        Sha256::digest(canonical_data).into()
    }

    /// Renders the record as an indented JSON object keyed by field name.
    pub fn to_json_pretty(&self) -> String {
        json_syntax::to_value(self)
            .expect("a string map always serializes")
            .pretty_print()
            .to_string()
    }
}

impl Serialize for LicenseRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LicenseRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = LicenseRecord;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of license field names to values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut record = LicenseRecord::new();

                while let Some((name, value)) = map.next_entry::<String, String>()? {
                    let designator = FieldDesignator::from_name(&name).ok_or_else(|| {
                        de::Error::custom(format!("unknown license field `{name}`"))
                    })?;
                    record.insert(designator, value);
                }

                Ok(record)
            }
        }

        deserializer.deserialize_map(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use json_syntax::Parse;

    use crate::aamva::parse;

    use super::*;

    const DL_SUBFILE: &str = "DACJOHN\nDADNONE\nDAG123 MAIN ST\nDAIANYVILLE\nDAJUTO\nDAKF87P20000\nDAQF987654321\nDAU069 IN\nDAYBRO\nDBA04192030\nDBB04191988\nDBC1\nDBD01012024\nDCAC\nDCBNONE\nDCDNONE\nDCFUTODOCDISCRIM\nDCGUTO\nDCSSMITH\nDDEN\nDDFN\nDDGN\r";

    #[test]
    fn serializes_by_field_name_in_table_order() {
        let record = parse("DCSDOE\nDAQ123");
        let json = record.to_json_pretty();

        let id = json.find("\"Customer ID (License Number)\"").unwrap();
        let last = json.find("\"Last Name\"").unwrap();
        assert!(id < last);
        assert!(json.contains("\"DOE\""));
    }

    #[test]
    fn deserialize_rejects_unknown_field_names() {
        let json = json_syntax::Value::parse_str(r#"{"Last Name": "DOE"}"#)
            .unwrap()
            .0;
        let record: LicenseRecord = json_syntax::from_value(json).unwrap();
        assert_eq!(record.last_name.as_deref(), Some("DOE"));

        let json = json_syntax::Value::parse_str(r#"{"Weight": "180"}"#)
            .unwrap()
            .0;
        assert!(json_syntax::from_value::<LicenseRecord>(json).is_err());
    }

    #[test]
    fn fingerprint_ignores_element_order() {
        let a = parse("DAQ1\nDCSDOE\nDACJOHN");
        let b = parse("DACJOHN\nDAQ1\nDCSDOE");
        let c = parse("DAQ2\nDCSDOE\nDACJOHN");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn parses_full_dl_subfile() {
        let record = parse(DL_SUBFILE);

        assert_eq!(record.get_by_name("First Name"), Some("JOHN"));
        assert_eq!(record.get_by_name("Street Address"), Some("123 MAIN ST"));
        assert_eq!(record.get_by_name("Postal Code"), Some("F87P20000"));
        assert_eq!(record.get_by_name("Document Discriminator"), Some("UTODOCDISCRIM"));
        assert_eq!(record.get_by_name("Weight"), None);

        // DCA, DCB, DCD and the truncation flags are not in the table.
        assert_eq!(record.len(), 16);
        assert!(record.named().all(|(name, _)| FieldDesignator::from_name(name).is_some()));
    }
}
