/// AAMVA DL/ID data element designators.
///
/// Each data element of a driver's license subfile starts with a three
/// character designator. Only the designators listed here are recognized;
/// any other element is ignored when building a [`LicenseRecord`].
///
/// See: <https://www.aamva.org/assets/best-practices,-guides,-standards,-manuals,-whitepapers/aamva-dl-id-card-design-standard-(2020)>
mod macros;
use std::collections::BTreeMap;

use lazy_static::lazy_static;
pub(crate) use macros::*;

designators! {
    /// Recognized data element designator.
    pub enum FieldDesignator, struct LicenseRecord {
        /// Customer ID Number (DAQ).
        customer_id_number => CustomerIdNumber: b"DAQ" = "Customer ID (License Number)",

        /// Customer Family Name (DCS).
        last_name => LastName: b"DCS" = "Last Name",

        /// Customer First Name (DAC).
        first_name => FirstName: b"DAC" = "First Name",

        /// Customer Middle Name(s) (DAD).
        middle_name => MiddleName: b"DAD" = "Middle Name",

        /// Document Issue Date (DBD).
        issue_date => IssueDate: b"DBD" = "Issue Date",

        /// Date of Birth (DBB).
        date_of_birth => DateOfBirth: b"DBB" = "Date of Birth",

        /// Document Expiration Date (DBA).
        expiration_date => ExpirationDate: b"DBA" = "Expiration Date",

        /// Physical Description – Sex (DBC).
        gender => Gender: b"DBC" = "Gender",

        /// Physical Description – Height (DAU).
        height => Height: b"DAU" = "Height",

        /// Physical Description – Eye Color (DAY).
        eye_color => EyeColor: b"DAY" = "Eye Color",

        /// Address – Street 1 (DAG).
        street_address => StreetAddress: b"DAG" = "Street Address",

        /// Address – City (DAI).
        city => City: b"DAI" = "City",

        /// Address – Jurisdiction Code (DAJ).
        state => State: b"DAJ" = "State",

        /// Address – Postal Code (DAK).
        postal_code => PostalCode: b"DAK" = "Postal Code",

        /// Document Discriminator (DCF).
        document_discriminator => DocumentDiscriminator: b"DCF" = "Document Discriminator",

        /// Country Identification (DCG).
        country => Country: b"DCG" = "Country",

        /// Jurisdiction-specific element (ZGZ).
        jurisdiction_specific_1 => JurisdictionSpecific1: b"ZGZ" = "Jurisdiction-Specific 1",

        /// Jurisdiction-specific element (ZGB).
        jurisdiction_specific_2 => JurisdictionSpecific2: b"ZGB" = "Jurisdiction-Specific 2",

        /// County (ZGD).
        county => County: b"ZGD" = "County",

        /// Jurisdiction-specific element (ZGE).
        jurisdiction_specific_3 => JurisdictionSpecific3: b"ZGE" = "Jurisdiction-Specific 3",

        /// Jurisdiction-specific element (ZGG).
        jurisdiction_specific_4 => JurisdictionSpecific4: b"ZGG" = "Jurisdiction-Specific 4",

        /// Street address, repeated in the jurisdiction subfile (ZGI).
        street_address_repeated => StreetAddressRepeated: b"ZGI" = "Street Address (Repeated)",

        /// City, repeated in the jurisdiction subfile (ZGJ).
        city_repeated => CityRepeated: b"ZGJ" = "City (Repeated)",

        /// State, repeated in the jurisdiction subfile (ZGK).
        state_repeated => StateRepeated: b"ZGK" = "State (Repeated)",

        /// Postal code, repeated in the jurisdiction subfile (ZGL).
        postal_code_repeated => PostalCodeRepeated: b"ZGL" = "Postal Code (Repeated)"
    }
}

impl FieldDesignator {
    /// Looks up the designator at the start of `line`, if any.
    pub fn from_prefix(line: &str) -> Option<Self> {
        DESIGNATORS_BY_CODE.get(line.get(..3)?).copied()
    }
}

lazy_static! {
    /// Designators sorted by their three character code.
    pub static ref DESIGNATORS_BY_CODE: BTreeMap<&'static str, FieldDesignator> = {
        let mut map = BTreeMap::new();

        for d in FieldDesignator::LIST {
            map.insert(d.string_id(), d);
        }

        map
    };
}
