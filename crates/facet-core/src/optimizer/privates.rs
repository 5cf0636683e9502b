use indexmap::IndexMap;

use crate::ast::{NodeKind, SyntaxTree};

/// Renames `__private` members and identifiers to `$<classId><n>`,
/// consistently within the class. The class identifier keys the scheme
/// so two obfuscated classes cannot collide on member names unless
/// their identifiers collide.
pub fn optimize(tree: &mut SyntaxTree, class_id: &str) {
    let mut renames: IndexMap<String, String> = IndexMap::new();

    for id in 0..tree.len() {
        match tree.kind(id) {
            NodeKind::Member { property, .. } if is_private(property) => {
                let property = property.clone();
                let crypted = crypt(&mut renames, class_id, &property);
                if let NodeKind::Member { property, .. } = tree.kind_mut(id) {
                    *property = crypted;
                }
            }
            NodeKind::Ident { name } if is_private(name) => {
                let name = name.clone();
                let crypted = crypt(&mut renames, class_id, &name);
                if let NodeKind::Ident { name } = tree.kind_mut(id) {
                    *name = crypted;
                }
            }
            _ => {}
        }
    }
}

fn is_private(name: &str) -> bool {
    name.starts_with("__")
}

fn crypt(renames: &mut IndexMap<String, String>, class_id: &str, name: &str) -> String {
    let next = renames.len();
    renames
        .entry(name.to_string())
        .or_insert_with(|| format!("${}{}", class_id, next))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::compress;
    use indoc::indoc;

    #[test]
    fn test_private_members_are_crypted() {
        let mut tree = parse(
            indoc! {r#"
                main.App = function() {
                    this.__count = 0;
                    this.__count = this.__count + 1;
                };
            "#},
            "main.App",
        )
        .unwrap();
        optimize(&mut tree, "Xy");
        assert_eq!(
            compress(&tree),
            "main.App=function(){this.$Xy0=0;this.$Xy0=this.$Xy0+1;};"
        );
    }

    #[test]
    fn test_distinct_privates_get_distinct_names() {
        let mut tree = parse("this.__a = this.__b;", "main.App").unwrap();
        optimize(&mut tree, "Q");
        assert_eq!(compress(&tree), "this.$Q0=this.$Q1;");
    }

    #[test]
    fn test_public_members_are_untouched() {
        let mut tree = parse("this.count = this._count;", "main.App").unwrap();
        optimize(&mut tree, "Q");
        assert_eq!(compress(&tree), "this.count=this._count;");
    }
}
