use serde::Serialize;

use crate::Operator;

/// A named attribute of a resource: public `key`, internal storage `path`,
/// selectivity weight, operator support and optional relation metadata.
#[derive(Clone, Debug, Serialize)]
pub struct Field {
    pub key: String,
    pub path: String,
    pub weight: u8,
    pub primary: bool,
    pub filterable: bool,
    pub operators: Vec<Operator>,
    pub relation: Option<Relation>,
}

impl Field {
    pub fn new(key: &str) -> Self {
        Field {
            key: key.to_string(),
            path: key.to_string(),
            weight: 1,
            primary: false,
            filterable: true,
            operators: Operator::ALL.to_vec(),
            relation: None,
        }
    }

    /// Primary key fields carry the maximum weight.
    pub fn primary(key: &str) -> Self {
        let mut field = Field::new(key);
        field.primary = true;
        field.weight = 100;
        field
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight.clamp(1, 100);
        self
    }

    pub fn with_operators(mut self, operators: Vec<Operator>) -> Self {
        self.operators = operators;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }
}

/// Relation metadata on a field. Targets are resource names resolved through
/// a registry at evaluation time, never direct references.
#[derive(Clone, Debug, Serialize)]
pub enum Relation {
    /// The forward key lives on this resource and references `to_key` on the
    /// related resource.
    ToOne { to: String, from_key: String, to_key: String },
    /// The forward key lives on the related resource (`to_key`) and points
    /// back at this resource's primary key.
    ToMany { to: String, to_key: String },
    /// Many-to-many via a join resource `via`: `through_key` holds this
    /// resource's key, `other_through_key` the related resource's key.
    Through {
        to: String,
        to_key: String,
        via: String,
        through_key: String,
        other_through_key: String,
    },
}

impl Relation {
    pub fn to_one(to: &str, from_key: &str, to_key: &str) -> Self {
        Relation::ToOne {
            to: to.to_string(),
            from_key: from_key.to_string(),
            to_key: to_key.to_string(),
        }
    }

    pub fn to_many(to: &str, to_key: &str) -> Self {
        Relation::ToMany { to: to.to_string(), to_key: to_key.to_string() }
    }

    pub fn through(to: &str, to_key: &str, via: &str, through_key: &str, other_through_key: &str) -> Self {
        Relation::Through {
            to: to.to_string(),
            to_key: to_key.to_string(),
            via: via.to_string(),
            through_key: through_key.to_string(),
            other_through_key: other_through_key.to_string(),
        }
    }

    /// Name of the related resource.
    pub fn to(&self) -> &str {
        match self {
            Relation::ToOne { to, .. } => to,
            Relation::ToMany { to, .. } => to,
            Relation::Through { to, .. } => to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let field = Field::new("email");
        assert_eq!(field.weight, 1);
        assert_eq!(field.path, "email");
        assert!(field.filterable);
        assert!(!field.primary);
    }

    #[test]
    fn test_primary_weight() {
        let field = Field::primary("theId");
        assert_eq!(field.weight, 100);
        assert!(field.primary);
    }

    #[test]
    fn test_weight_clamped() {
        assert_eq!(Field::new("a").with_weight(0).weight, 1);
        assert_eq!(Field::new("a").with_weight(200).weight, 100);
    }

    #[test]
    fn test_operator_support() {
        let field = Field::new("email").with_operators(vec![Operator::Eq]);
        assert!(field.supports(Operator::Eq));
        assert!(!field.supports(Operator::In));
    }
}
