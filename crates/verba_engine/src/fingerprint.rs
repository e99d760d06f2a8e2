//! Canonical encoding of values and element trees for memo fingerprints.

use verba_common::FingerprintBuilder;

use crate::element::{Element, Kind, Props};
use crate::value::Value;

/// Types with a canonical, deep-structural byte encoding.
///
/// Structurally equal values must write identical bytes; the encoding is
/// tagged and length-prefixed so that unequal values never do.
pub trait Canonical {
    /// Writes this value's canonical encoding into `fp`.
    fn write_canonical(&self, fp: &mut FingerprintBuilder);
}

const VALUE_NULL: u8 = 0;
const VALUE_BOOL: u8 = 1;
const VALUE_INT: u8 = 2;
const VALUE_FLOAT: u8 = 3;
const VALUE_STR: u8 = 4;
const VALUE_LIST: u8 = 5;
const VALUE_MAP: u8 = 6;
const VALUE_ELEMENT: u8 = 7;

const KIND_PRIMITIVE: u8 = 0x10;
const KIND_CUSTOM: u8 = 0x11;

const DATA_ABSENT: u8 = 0x20;
const DATA_PRESENT: u8 = 0x21;

impl Canonical for Value {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        match self {
            Value::Null => {
                fp.tag(VALUE_NULL);
            }
            Value::Bool(b) => {
                fp.tag(VALUE_BOOL).bool(*b);
            }
            Value::Int(n) => {
                fp.tag(VALUE_INT).int(*n);
            }
            Value::Float(x) => {
                fp.tag(VALUE_FLOAT).float(*x);
            }
            Value::Str(s) => {
                fp.tag(VALUE_STR).str(s);
            }
            Value::List(items) => {
                fp.tag(VALUE_LIST).len(items.len());
                for item in items {
                    item.write_canonical(fp);
                }
            }
            Value::Map(map) => {
                fp.tag(VALUE_MAP);
                map.write_canonical(fp);
            }
            Value::Element(el) => {
                fp.tag(VALUE_ELEMENT);
                el.write_canonical(fp);
            }
        }
    }
}

impl Canonical for Props {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        // BTreeMap iterates in key order.
        fp.len(self.len());
        for (key, value) in self {
            fp.str(key);
            value.write_canonical(fp);
        }
    }
}

impl Canonical for Kind {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        match self {
            Kind::Primitive(p) => {
                fp.tag(KIND_PRIMITIVE).tag(p.tag());
            }
            Kind::Custom(ty) => {
                fp.tag(KIND_CUSTOM).u64(ty.id()).str(ty.name());
            }
        }
    }
}

impl Canonical for Element {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        fp.hash(self.content_hash());
    }
}

impl Canonical for [Element] {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        fp.len(self.len());
        for child in self {
            child.write_canonical(fp);
        }
    }
}

impl<T: Canonical> Canonical for Option<T> {
    fn write_canonical(&self, fp: &mut FingerprintBuilder) {
        match self {
            None => {
                fp.tag(DATA_ABSENT);
            }
            Some(value) => {
                fp.tag(DATA_PRESENT);
                value.write_canonical(fp);
            }
        }
    }
}
