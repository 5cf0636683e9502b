use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::format_number;

const MOD_ADLER: u32 = 65521;

/// A literal value a variant field is fixed to for one permutation.
///
/// Values come straight from the config file, so any JSON literal is
/// accepted; during specialization they are injected into the syntax
/// tree as the matching literal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Bool(bool),
    Number(f64),
    Str(String),
    Null,
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantValue::Bool(b) => write!(f, "{}", b),
            VariantValue::Number(n) => write!(f, "{}", format_number(*n)),
            VariantValue::Str(s) => write!(f, "{}", s),
            VariantValue::Null => write!(f, "null"),
        }
    }
}

/// A fixed assignment of build-time variant fields, e.g. `{debug: "on"}`.
///
/// Field order is preserved as defined, but the signature is
/// order-independent: two permutations with the same fields and values
/// produce the same signature (and therefore hit the same cache
/// entries) no matter the order the fields were added in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Permutation {
    fields: IndexMap<String, VariantValue>,
}

impl Permutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: VariantValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&VariantValue> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &VariantValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical signature: `name:value` entries sorted by field name,
    /// joined with `;`. Used as the cache-key component and in bundle
    /// headers.
    pub fn signature(&self) -> String {
        let mut entries: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect();
        entries.sort();
        entries.join(";")
    }

    /// Short checksum key for this permutation, suitable for
    /// disambiguating output filenames.
    ///
    /// Matches the client-side loader: Adler-32 over the signature,
    /// interpreted as a signed 32-bit value, rendered as `a<hex>` when
    /// negative and `b<hex>` otherwise.
    pub fn checksum(&self) -> String {
        let data = self.signature();
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for byte in data.as_bytes() {
            a = (a + u32::from(*byte)) % MOD_ADLER;
            b = (b + a) % MOD_ADLER;
        }
        let value = ((b << 16) | a) as i32;
        if value < 0 {
            format!("a{:x}", value.unsigned_abs())
        } else {
            format!("b{:x}", value)
        }
    }

    /// Inserts `-<checksum>` before the filename extension, or appends
    /// it when there is none.
    pub fn patch_filename(&self, filename: &str) -> String {
        let postfix = format!("-{}", self.checksum());
        match filename.rfind('.') {
            Some(pos) => format!("{}{}{}", &filename[..pos], postfix, &filename[pos..]),
            None => format!("{}{}", filename, postfix),
        }
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debug_on() -> Permutation {
        let mut perm = Permutation::new();
        perm.set("debug", VariantValue::Str("on".into()));
        perm
    }

    #[test]
    fn test_signature_is_order_independent() {
        let mut first = Permutation::new();
        first.set("debug", VariantValue::Str("on".into()));
        first.set("engine", VariantValue::Str("gecko".into()));

        let mut second = Permutation::new();
        second.set("engine", VariantValue::Str("gecko".into()));
        second.set("debug", VariantValue::Str("on".into()));

        assert_eq!(first.signature(), second.signature());
        assert_eq!(first.signature(), "debug:on;engine:gecko");
        assert_eq!(first.checksum(), second.checksum());
    }

    #[test]
    fn test_signature_renders_all_value_kinds() {
        let mut perm = Permutation::new();
        perm.set("debug", VariantValue::Bool(true));
        perm.set("version", VariantValue::Number(1.0));
        perm.set("theme", VariantValue::Null);

        assert_eq!(perm.signature(), "debug:true;theme:null;version:1");
    }

    #[test]
    fn test_checksum_known_value() {
        // Adler-32 of "debug:on" is a=799, b=3606 -> 0x0e16031f.
        assert_eq!(debug_on().checksum(), "be16031f");
    }

    #[test]
    fn test_checksum_differs_between_permutations() {
        let mut other = Permutation::new();
        other.set("debug", VariantValue::Str("off".into()));

        assert_ne!(debug_on().checksum(), other.checksum());
    }

    #[test]
    fn test_patch_filename() {
        let perm = debug_on();
        let key = perm.checksum();

        assert_eq!(
            perm.patch_filename("build.js"),
            format!("build-{}.js", key)
        );
        assert_eq!(perm.patch_filename("build"), format!("build-{}", key));
    }

    #[test]
    fn test_empty_permutation() {
        let perm = Permutation::new();
        assert!(perm.is_empty());
        assert_eq!(perm.signature(), "");
    }
}
