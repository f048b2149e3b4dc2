use std::rc::Rc;

use ::serde::de::Error as _;
use ::serde::ser::Error as _;
use ::serde::{Deserialize, Deserializer, Serializer};

use crate::boc::Boc;
use crate::cell::Cell;

impl Boc {
    /// Serializes the cell as an encoded BOC in base64
    /// (for use with `#[serde(with = "Boc")]`).
    pub fn serialize<S>(cell: &Rc<Cell>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match Self::encode_base64(cell) {
            Ok(boc) => serializer.serialize_str(&boc),
            Err(e) => Err(S::Error::custom(e)),
        }
    }

    /// Deserializes the cell from an encoded BOC in base64
    /// (for use with `#[serde(with = "Boc")]`).
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Rc<Cell>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let boc = ok!(String::deserialize(deserializer));
        match Self::decode_base64(boc) {
            Ok(cell) => Ok(cell),
            Err(e) => Err(D::Error::custom(e)),
        }
    }
}
