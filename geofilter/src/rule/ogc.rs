//! OGC Filter Encoding for WFS 1.1.0 requests.
//!
//! Produces the `FILTER` parameter of a `GetFeature` request from a
//! [`Predicate`] tree plus an optional bounding-box constraint.

use super::predicate::{CompareOp, Predicate};
use crate::feature::value::as_text;
use crate::feature::Extent;
use serde_json::Value;

const OGC_NS: &str = "http://www.opengis.net/ogc";
const GML_NS: &str = "http://www.opengis.net/gml";

/// Spatial restriction of a query to a map extent.
#[derive(Debug, Clone)]
pub struct SpatialConstraint<'a> {
    pub geometry_name: &'a str,
    pub extent: Extent,
    pub srs_name: Option<&'a str>,
}

/// Namespace used to qualify property names.
#[derive(Debug, Clone, Copy)]
pub struct PropertyNamespace<'a> {
    pub prefix: &'a str,
    pub uri: &'a str,
}

/// Encodes a complete `<Filter>` document.
///
/// Returns `None` when neither a predicate nor a spatial constraint applies,
/// in which case the request carries no filter at all.
pub fn encode_filter(
    predicate: Option<&Predicate>,
    spatial: Option<&SpatialConstraint<'_>>,
    namespace: Option<PropertyNamespace<'_>>,
) -> Option<String> {
    let namespace = namespace.filter(|ns| !ns.prefix.is_empty() && !ns.uri.is_empty());

    let mut parts = Vec::new();
    if let Some(encoded) = predicate.and_then(|p| encode_predicate(p, namespace)) {
        parts.push(encoded);
    }
    if let Some(spatial) = spatial {
        parts.push(encode_bbox(spatial, namespace));
    }

    let body = match parts.len() {
        0 => return None,
        1 => parts.remove(0),
        _ => format!("<And>{}</And>", parts.concat()),
    };

    let ns_decl = namespace
        .map(|ns| format!(" xmlns:{}=\"{}\"", ns.prefix, escape(ns.uri)))
        .unwrap_or_default();

    Some(format!(
        "<Filter xmlns=\"{}\" xmlns:gml=\"{}\"{}>{}</Filter>",
        OGC_NS, GML_NS, ns_decl, body
    ))
}

/// Encodes a predicate tree without the surrounding `<Filter>` element.
///
/// Returns `None` when the predicate cannot be expressed on the server and
/// must not restrict the request. That is the case for ordering and range
/// comparisons on delimited attributes; callers re-check those locally with
/// [`Predicate::matches`].
pub fn encode_predicate(
    predicate: &Predicate,
    namespace: Option<PropertyNamespace<'_>>,
) -> Option<String> {
    match predicate {
        Predicate::Compare {
            attribute,
            op,
            value,
            delimiter,
        } => {
            let property = property_name(attribute, namespace);
            match delimiter {
                Some(d) => encode_segment_compare(&property, *op, value, d),
                None => Some(encode_compare(&property, *op, value)),
            }
        }
        // Segments cannot be split server-side
        Predicate::Between {
            delimiter: Some(_), ..
        } => None,
        Predicate::Between {
            attribute,
            min,
            max,
            delimiter: None,
        } => Some(format!(
            "<PropertyIsBetween><PropertyName>{}</PropertyName>\
             <LowerBoundary><Literal>{}</Literal></LowerBoundary>\
             <UpperBoundary><Literal>{}</Literal></UpperBoundary></PropertyIsBetween>",
            property_name(attribute, namespace),
            literal(min),
            literal(max)
        )),
        Predicate::Or(members) => {
            // One unrestricted member leaves the whole disjunction unrestricted
            let inner = members
                .iter()
                .map(|m| encode_predicate(m, namespace))
                .collect::<Option<Vec<_>>>()?;
            Some(group("Or", inner))
        }
        Predicate::And(members) => {
            let inner: Vec<String> = members
                .iter()
                .filter_map(|m| encode_predicate(m, namespace))
                .collect();
            if inner.is_empty() {
                None
            } else {
                Some(group("And", inner))
            }
        }
    }
}

fn encode_compare(property: &str, op: CompareOp, value: &Value) -> String {
    match op {
        CompareOp::Eq => binary("PropertyIsEqualTo", property, value),
        CompareOp::Ne => binary("PropertyIsNotEqualTo", property, value),
        CompareOp::Gt => binary("PropertyIsGreaterThan", property, value),
        CompareOp::Ge => binary("PropertyIsGreaterThanOrEqualTo", property, value),
        CompareOp::Lt => binary("PropertyIsLessThan", property, value),
        CompareOp::Le => binary("PropertyIsLessThanOrEqualTo", property, value),
        CompareOp::Contains => like(property, &format!("*{}*", like_escape(&as_text(value)))),
        CompareOp::StartsWith => like(property, &format!("{}*", like_escape(&as_text(value)))),
        CompareOp::EndsWith => like(property, &format!("*{}", like_escape(&as_text(value)))),
    }
}

/// Comparison against the segments of a delimited attribute.
///
/// Equality matches a whole segment: the entire value, or the value bounded
/// by delimiters or the ends of the string. Text operators match anywhere in
/// the stored string, a superset of matching a segment.
fn encode_segment_compare(
    property: &str,
    op: CompareOp,
    value: &Value,
    delimiter: &str,
) -> Option<String> {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let [first, last, inner] = segment_patterns(value, delimiter);
            let segment = format!(
                "<Or>{}{}{}{}</Or>",
                binary("PropertyIsEqualTo", property, value),
                like(property, &first),
                like(property, &last),
                like(property, &inner),
            );
            Some(if op == CompareOp::Ne {
                format!("<Not>{}</Not>", segment)
            } else {
                segment
            })
        }
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => Some(like(
            property,
            &format!("*{}*", like_escape(&as_text(value))),
        )),
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => None,
    }
}

/// LIKE patterns for `value` as the first, last or an inner segment.
fn segment_patterns(value: &Value, delimiter: &str) -> [String; 3] {
    let v = like_escape(&as_text(value));
    let d = like_escape(delimiter);
    [
        format!("{v}{d}*"),
        format!("*{d}{v}"),
        format!("*{d}{v}{d}*"),
    ]
}

fn group(tag: &str, members: Vec<String>) -> String {
    if members.len() < 2 {
        members.concat()
    } else {
        format!("<{tag}>{}</{tag}>", members.concat())
    }
}

fn encode_bbox(spatial: &SpatialConstraint<'_>, namespace: Option<PropertyNamespace<'_>>) -> String {
    let srs = spatial
        .srs_name
        .map(|s| format!(" srsName=\"{}\"", escape(s)))
        .unwrap_or_default();
    let e = spatial.extent;
    format!(
        "<BBOX><PropertyName>{}</PropertyName><gml:Envelope{}>\
         <gml:lowerCorner>{} {}</gml:lowerCorner>\
         <gml:upperCorner>{} {}</gml:upperCorner></gml:Envelope></BBOX>",
        property_name(spatial.geometry_name, namespace),
        srs,
        e.min_x,
        e.min_y,
        e.max_x,
        e.max_y
    )
}

fn binary(tag: &str, property: &str, value: &Value) -> String {
    format!(
        "<{tag}><PropertyName>{property}</PropertyName><Literal>{}</Literal></{tag}>",
        literal(value)
    )
}

fn like(property: &str, pattern: &str) -> String {
    format!(
        "<PropertyIsLike wildCard=\"*\" singleChar=\".\" escapeChar=\"!\">\
         <PropertyName>{}</PropertyName><Literal>{}</Literal></PropertyIsLike>",
        property,
        escape(pattern)
    )
}

fn property_name(attribute: &str, namespace: Option<PropertyNamespace<'_>>) -> String {
    match namespace {
        Some(ns) => format!("{}:{}", ns.prefix, escape(attribute)),
        None => escape(attribute),
    }
}

fn literal(value: &Value) -> String {
    escape(&as_text(value))
}

/// Escapes the LIKE wildcard characters of a literal.
fn like_escape(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if matches!(c, '*' | '.' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{FilterQuery, FilterRule, Operator};
    use serde_json::json;

    fn encode_rule(rule: FilterRule) -> String {
        try_encode_rule(rule).unwrap()
    }

    fn try_encode_rule(rule: FilterRule) -> Option<String> {
        encode_predicate(&Predicate::from_rule(&rule).unwrap(), None)
    }

    /// Server-side LIKE with `*` as wildcard and `!` as escape character.
    fn like_matches(pattern: &str, text: &str) -> bool {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '!' => tokens.push(Some(chars.next().unwrap())),
                '*' => tokens.push(None),
                other => tokens.push(Some(other)),
            }
        }
        fn walk(tokens: &[Option<char>], text: &[char]) -> bool {
            match tokens.split_first() {
                None => text.is_empty(),
                Some((None, rest)) => (0..=text.len()).any(|i| walk(rest, &text[i..])),
                Some((Some(c), rest)) => text.first() == Some(c) && walk(rest, &text[1..]),
            }
        }
        let text: Vec<char> = text.chars().collect();
        walk(&tokens, &text)
    }

    /// Emulates the server for segment equality: the full-value comparison
    /// or any of the three LIKE patterns.
    fn server_segment_eq(stored: &str, value: &str, delimiter: &str) -> bool {
        stored == value
            || segment_patterns(&json!(value), delimiter)
                .iter()
                .any(|p| like_matches(p, stored))
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            encode_rule(FilterRule::any_of("district", ["A"])),
            "<PropertyIsEqualTo><PropertyName>district</PropertyName>\
             <Literal>A</Literal></PropertyIsEqualTo>"
        );
    }

    #[test]
    fn test_or_of_equalities() {
        let xml = encode_rule(FilterRule::any_of("district", ["A", "B"]));
        assert!(xml.starts_with("<Or><PropertyIsEqualTo>"));
        assert!(xml.ends_with("</PropertyIsEqualTo></Or>"));
        assert_eq!(xml.matches("<PropertyIsEqualTo>").count(), 2);
    }

    #[test]
    fn test_between() {
        let xml = encode_rule(FilterRule::between("area", 10, 20.5));
        assert!(xml.contains("<LowerBoundary><Literal>10</Literal></LowerBoundary>"));
        assert!(xml.contains("<UpperBoundary><Literal>20.5</Literal></UpperBoundary>"));
    }

    #[test]
    fn test_delimited_equality_matches_whole_segments() {
        let xml = encode_rule(FilterRule::equals("uses", "park").with_delimiter("|"));
        assert!(xml.starts_with("<Or><PropertyIsEqualTo>"));
        assert!(xml.contains("<Literal>park|*</Literal>"));
        assert!(xml.contains("<Literal>*|park</Literal>"));
        assert!(xml.contains("<Literal>*|park|*</Literal>"));
        assert!(!xml.contains("<Literal>*park*</Literal>"));

        let xml = encode_rule(
            FilterRule::equals("uses", "park")
                .with_delimiter("|")
                .with_operator(Operator::Ne),
        );
        assert!(xml.starts_with("<Not><Or>"));
    }

    #[test]
    fn test_segment_patterns_agree_with_local_matching() {
        let stored = [
            "park",
            "parking",
            "parking|school",
            "school|park",
            "school|park|library",
            "school|parking|library",
            "skatepark|school",
            "a*b|park",
        ];
        for value in ["park", "a*b"] {
            let predicate =
                Predicate::from_rule(&FilterRule::equals("uses", value).with_delimiter("|"))
                    .unwrap();
            for text in stored {
                let feature = crate::feature::Feature::new("f").with_property("uses", text);
                assert_eq!(
                    server_segment_eq(text, value, "|"),
                    predicate.matches(&feature),
                    "value {:?} against stored {:?}",
                    value,
                    text
                );
            }
        }
    }

    #[test]
    fn test_delimited_ordering_is_left_to_local_matching() {
        assert_eq!(
            try_encode_rule(FilterRule::between("years", 2000, 2005).with_delimiter("|")),
            None
        );
        assert_eq!(
            try_encode_rule(
                FilterRule::equals("years", 2000)
                    .with_delimiter("|")
                    .with_operator(Operator::Gt)
            ),
            None
        );

        // An unrestricted member drops out of an And, and widens an Or
        let query = FilterQuery::new(vec![
            FilterRule::equals("district", "A"),
            FilterRule::between("years", 2000, 2005).with_delimiter("|"),
        ]);
        let xml = encode_predicate(&Predicate::from_query(&query).unwrap(), None).unwrap();
        assert!(xml.starts_with("<PropertyIsEqualTo>"));
        assert!(!xml.contains("PropertyIsBetween"));

        let either = Predicate::Or(vec![
            Predicate::from_rule(&FilterRule::equals("district", "A")).unwrap(),
            Predicate::from_rule(&FilterRule::between("years", 2000, 2005).with_delimiter("|"))
                .unwrap(),
        ]);
        assert_eq!(encode_predicate(&either, None), None);
        assert!(encode_filter(Some(&either), None, None).is_none());
    }

    #[test]
    fn test_like_escaping() {
        let xml = encode_rule(FilterRule::equals("uses", "a*b").with_operator(Operator::In));
        assert!(xml.contains("<Literal>*a!*b*</Literal>"));
        assert!(like_matches("*a!*b*", "xa*by"));
        assert!(!like_matches("*a!*b*", "xaZby"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let xml = encode_rule(FilterRule::equals("name", "A & <B>"));
        assert!(xml.contains("<Literal>A &amp; &lt;B&gt;</Literal>"));
    }

    #[test]
    fn test_full_filter_with_namespace_and_bbox() {
        let query = FilterQuery::new(vec![FilterRule::equals("district", "A")]);
        let predicate = Predicate::from_query(&query);
        let spatial = SpatialConstraint {
            geometry_name: "geom",
            extent: Extent::new(1.0, 2.0, 3.0, 4.0),
            srs_name: Some("EPSG:25832"),
        };
        let ns = PropertyNamespace {
            prefix: "app",
            uri: "http://example.org",
        };

        let xml = encode_filter(predicate.as_ref(), Some(&spatial), Some(ns)).unwrap();
        assert!(xml.starts_with("<Filter xmlns=\"http://www.opengis.net/ogc\""));
        assert!(xml.contains("xmlns:app=\"http://example.org\""));
        assert!(xml.contains("<And><PropertyIsEqualTo><PropertyName>app:district</PropertyName>"));
        assert!(xml.contains("<gml:Envelope srsName=\"EPSG:25832\">"));
        assert!(xml.contains("<gml:lowerCorner>1 2</gml:lowerCorner>"));
        assert!(xml.contains("<PropertyName>app:geom</PropertyName>"));
    }

    #[test]
    fn test_nothing_to_encode() {
        assert!(encode_filter(None, None, None).is_none());
    }

    #[test]
    fn test_numeric_literal() {
        let xml = encode_rule(FilterRule::equals("floors", json!(3)).with_operator(Operator::Ge));
        assert!(xml.contains("<PropertyIsGreaterThanOrEqualTo>"));
        assert!(xml.contains("<Literal>3</Literal>"));
    }
}
