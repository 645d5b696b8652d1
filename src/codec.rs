//! Literal codec
//!
//! Converts scalar [`BeanValue`]s to RDF literals and back. The codec is a
//! seam: a custom [`LiteralCodec`] can change lexical forms or datatype
//! choices without touching the engines.

use crate::model::BeanValue;
use chrono::{DateTime, Utc};
use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNodeRef};
use tracing::warn;

/// Scalar value encoding seam between beans and literals.
///
/// `to_literal` returns `None` for values the codec does not treat as
/// scalars (references, URIs, collections); the marshalling engine then
/// handles them structurally. `from_literal` returns `None` only when a
/// literal should be skipped outright; implementations are expected to
/// degrade to a string value instead wherever the lexical form is usable.
pub trait LiteralCodec: Send + Sync {
    fn to_literal(&self, value: &BeanValue) -> Option<Literal>;
    fn from_literal(&self, literal: &Literal) -> Option<BeanValue>;
}

/// XSD-based codec used unless the manager is given another one.
///
/// Encoding: strings become plain literals, integers `xsd:integer`, floats
/// `xsd:double`, booleans `xsd:boolean` and timestamps `xsd:dateTime` in
/// RFC 3339 form. Decoding accepts the whole XSD numeric family and falls
/// back to the raw lexical form as a string when a datatype is unknown or
/// its lexical form does not parse.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

const INTEGER_DATATYPES: [NamedNodeRef<'static>; 13] = [
    xsd::INTEGER,
    xsd::LONG,
    xsd::INT,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

const FLOAT_DATATYPES: [NamedNodeRef<'static>; 3] = [xsd::DOUBLE, xsd::FLOAT, xsd::DECIMAL];

impl LiteralCodec for DefaultCodec {
    fn to_literal(&self, value: &BeanValue) -> Option<Literal> {
        match value {
            BeanValue::String(s) => Some(Literal::new_simple_literal(s.as_str())),
            BeanValue::Int(i) => Some(Literal::new_typed_literal(i.to_string(), xsd::INTEGER)),
            BeanValue::Float(f) => Some(Literal::new_typed_literal(f.to_string(), xsd::DOUBLE)),
            BeanValue::Bool(b) => Some(Literal::new_typed_literal(b.to_string(), xsd::BOOLEAN)),
            BeanValue::DateTime(dt) => {
                Some(Literal::new_typed_literal(dt.to_rfc3339(), xsd::DATE_TIME))
            }
            BeanValue::Uri(_) | BeanValue::Ref(_) | BeanValue::Collection(_) => None,
        }
    }

    fn from_literal(&self, literal: &Literal) -> Option<BeanValue> {
        let lexical = literal.value();
        if literal.language().is_some() {
            return Some(BeanValue::String(lexical.to_string()));
        }

        let datatype = literal.datatype();
        if datatype == xsd::STRING {
            return Some(BeanValue::String(lexical.to_string()));
        }
        if INTEGER_DATATYPES.contains(&datatype) {
            return match lexical.parse::<i64>() {
                Ok(i) => Some(BeanValue::Int(i)),
                Err(_) => {
                    warn!(lexical, datatype = %datatype, "unparseable integer literal, keeping lexical form");
                    Some(BeanValue::String(lexical.to_string()))
                }
            };
        }
        if FLOAT_DATATYPES.contains(&datatype) {
            return match lexical.parse::<f64>() {
                Ok(f) => Some(BeanValue::Float(f)),
                Err(_) => {
                    warn!(lexical, datatype = %datatype, "unparseable float literal, keeping lexical form");
                    Some(BeanValue::String(lexical.to_string()))
                }
            };
        }
        if datatype == xsd::BOOLEAN {
            return match lexical {
                "true" | "1" => Some(BeanValue::Bool(true)),
                "false" | "0" => Some(BeanValue::Bool(false)),
                _ => {
                    warn!(lexical, "unparseable boolean literal, keeping lexical form");
                    Some(BeanValue::String(lexical.to_string()))
                }
            };
        }
        if datatype == xsd::DATE_TIME {
            return match DateTime::parse_from_rfc3339(lexical) {
                Ok(dt) => Some(BeanValue::DateTime(dt.with_timezone(&Utc))),
                Err(_) => {
                    warn!(lexical, "unparseable dateTime literal, keeping lexical form");
                    Some(BeanValue::String(lexical.to_string()))
                }
            };
        }

        // Unknown datatype: keep the lexical form rather than lose the value
        Some(BeanValue::String(lexical.to_string()))
    }
}
