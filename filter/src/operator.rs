use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use value::Value;

use crate::FilterValue;

/// The closed set of comparison operators a filter can apply to a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Nin,
    ];

    /// Selectivity weight in (0, 100). Equality narrows a result set the
    /// most, ranges less, negations barely. Kept strictly below 100 so a
    /// per-filter score never reaches 1.
    pub fn weight(&self) -> u8 {
        match self {
            Operator::Eq => 50,
            Operator::In => 40,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => 20,
            Operator::Ne | Operator::Nin => 10,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::Nin)
    }

    /// Parses a raw query value. List operators split on the separator first,
    /// every element then goes through literal inference.
    pub fn parse(&self, raw: &str, list_separator: char) -> FilterValue {
        if self.is_list() {
            FilterValue::List(
                raw.split(list_separator)
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(Value::infer)
                    .collect(),
            )
        } else {
            FilterValue::Scalar(Value::infer(raw))
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
        };
        f.write_str(name)
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "in" => Ok(Operator::In),
            "nin" => Ok(Operator::Nin),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_names() {
        for operator in Operator::ALL {
            assert_eq!(operator.to_string().parse::<Operator>(), Ok(operator));
        }
        assert!("like".parse::<Operator>().is_err());
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(Operator::Eq.parse("42", ','), FilterValue::Scalar(Value::int(42)));
        assert_eq!(Operator::Gt.parse("1.5", ','), FilterValue::Scalar(Value::float(1.5)));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            Operator::In.parse("1,2, 3", ','),
            FilterValue::List(vec![Value::int(1), Value::int(2), Value::int(3)])
        );
        assert_eq!(
            Operator::Nin.parse("a|b", '|'),
            FilterValue::List(vec![Value::text("a"), Value::text("b")])
        );
    }

    #[test]
    fn test_weights_stay_below_hundred() {
        for operator in Operator::ALL {
            assert!(operator.weight() < 100);
        }
    }
}
