//! # Serde module for HyperLogLog
//!
//! `HyperLogLog` is serialized as a tuple of its precision and register values:
//! `(u8, Vec<u8>)`. No other state is stored, calibration constants are looked up
//! again from the precision.
//!
//! During deserialization the tuple is validated the same way as `HyperLogLog::from_registers`:
//! precision must be supported, register count must match precision and every register must
//! hold a rank reachable for that precision.
use std::hash::Hasher;

use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::estimator::HyperLogLog;

impl<H: Hasher + Default> Serialize for HyperLogLog<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.precision().get())?;
        tup.serialize_element(self.registers())?;
        tup.end()
    }
}

impl<'de, H: Hasher + Default> Deserialize<'de> for HyperLogLog<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (precision, registers): (u8, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        HyperLogLog::from_registers(precision, registers).map_err(Error::custom)
    }
}
