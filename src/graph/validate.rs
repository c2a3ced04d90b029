//! Structural rules for datamodel declarations
//!
//! Each check returns the first violation it finds; the caller aborts the
//! compilation on it.

use crate::dsl::{Field, TypeExpr};
use crate::error::{CompilerError, Result};
use crate::names;

/// Type names must not shadow generated metadata names
pub fn check_type_name(package: &str, name: &str) -> Result<()> {
    if names::is_reserved(name) {
        return Err(CompilerError::ReservedNameUsed {
            name: name.to_string(),
            context: format!("type {} in package {}", name, package),
        });
    }
    Ok(())
}

/// Field names must not shadow generated metadata names
pub fn check_field_name(node: &str, field: &Field) -> Result<()> {
    if names::is_reserved(&field.name) {
        return Err(CompilerError::ReservedNameUsed {
            name: field.name.clone(),
            context: format!("field {} in node {}", field.name, node),
        });
    }
    Ok(())
}

/// A child or link field must name its target type directly
///
/// Plural relations are expressed with `children`/`links`, never with a
/// container type.
pub fn check_relation_shape(node: &str, field: &Field) -> Result<()> {
    match field.ty.container_shape() {
        Some(shape) => Err(CompilerError::InvalidFieldShape {
            node: node.to_string(),
            field: field.name.clone(),
            ty: field.ty.to_string(),
            shape,
        }),
        None => Ok(()),
    }
}

/// Named relations can't point at a singleton
pub fn check_named_target(node: &str, field: &Field, named: bool, target_is_singleton: bool) -> Result<()> {
    if named && target_is_singleton {
        let target = match &field.ty {
            TypeExpr::Named { name, .. } => name.clone(),
            other => other.to_string(),
        };
        return Err(CompilerError::SingletonCannotBeNamed {
            node: node.to_string(),
            field: field.name.clone(),
            target,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: TypeExpr) -> Field {
        Field {
            name: name.to_string(),
            ty,
            annotations: Vec::new(),
        }
    }

    #[test]
    fn test_reserved_names() {
        assert!(check_type_name("config", "Config").is_ok());
        assert!(matches!(
            check_type_name("config", "ObjectMeta"),
            Err(CompilerError::ReservedNameUsed { .. })
        ));
        assert!(matches!(
            check_field_name("Config", &field("Kind", TypeExpr::named("string"))),
            Err(CompilerError::ReservedNameUsed { .. })
        ));
    }

    #[test]
    fn test_relation_shapes() {
        assert!(check_relation_shape("Root", &field("Config", TypeExpr::named("Config"))).is_ok());

        let cases = [
            (TypeExpr::Array(Box::new(TypeExpr::named("Config"))), "array"),
            (TypeExpr::Pointer(Box::new(TypeExpr::named("Config"))), "pointer"),
            (
                TypeExpr::Map(Box::new(TypeExpr::named("string")), Box::new(TypeExpr::named("Config"))),
                "map",
            ),
        ];
        for (ty, expected) in cases {
            match check_relation_shape("Root", &field("Config", ty)).unwrap_err() {
                CompilerError::InvalidFieldShape { shape, node, .. } => {
                    assert_eq!(shape, expected);
                    assert_eq!(node, "Root");
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_named_singleton() {
        let f = field("Configs", TypeExpr::qualified("config", "Config"));
        assert!(check_named_target("Root", &f, false, true).is_ok());
        assert!(check_named_target("Root", &f, true, false).is_ok());
        match check_named_target("Root", &f, true, true).unwrap_err() {
            CompilerError::SingletonCannotBeNamed { target, .. } => assert_eq!(target, "Config"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
