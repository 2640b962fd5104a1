//! Required-field validation, run before graph extraction.

use crate::error::{Error, Result};
use crate::stack::{FieldKind, Fields, Stack, field_path};

/// Fail with [`Error::MissingRequired`] listing every required field that
/// is empty, anywhere in the stack.
pub fn required_fields(stack: &dyn Stack) -> Result<()> {
    let mut missing = Vec::new();
    collect_missing(stack, "", &mut missing);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingRequired { paths: missing })
    }
}

fn collect_missing(stack: &dyn Stack, prefix: &str, missing: &mut Vec<String>) {
    for field in Fields::of(stack) {
        let path = field_path(prefix, field.name);
        if field.required && field.kind.is_empty() {
            missing.push(path.clone());
        }
        match field.kind {
            FieldKind::Nested(Some(nested)) => collect_missing(nested, &path, missing),
            FieldKind::NestedList(stacks) => {
                for (i, nested) in stacks.into_iter().enumerate() {
                    collect_missing(nested, &format!("{path}[{i}]"), missing);
                }
            }
            FieldKind::Embedded(embedded) => collect_missing(embedded, prefix, missing),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{Provider, Resource};

    struct Database {
        primary: Option<Resource<()>>,
        replicas: Vec<Resource<()>>,
    }

    impl Stack for Database {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .optional("primary", &self.primary)
                .required()
                .components("replicas", &self.replicas);
        }
    }

    struct Shared {
        provider: Option<Provider>,
    }

    impl Stack for Shared {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields.optional("provider", &self.provider).required();
        }
    }

    struct App {
        shared: Shared,
        databases: Vec<Database>,
        cache: Option<Database>,
    }

    impl Stack for App {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .embed("shared", &self.shared)
                .nested_list("databases", &self.databases)
                .optional_nested("cache", &self.cache)
                .required();
        }
    }

    #[test]
    fn test_all_missing_paths_reported() {
        let app = App {
            shared: Shared { provider: None },
            databases: vec![
                Database {
                    primary: Some(Resource::new("db", "a", ())),
                    replicas: vec![],
                },
                Database {
                    primary: None,
                    replicas: vec![],
                },
            ],
            cache: None,
        };

        let err = required_fields(&app).unwrap_err();
        let Error::MissingRequired { paths } = err else {
            panic!("expected MissingRequired");
        };
        assert_eq!(paths, vec!["provider", "databases[1].primary", "cache"]);
    }

    #[test]
    fn test_complete_stack_passes() {
        let app = App {
            shared: Shared {
                provider: Some(Provider::new("null", "hashicorp/null", "", ())),
            },
            databases: vec![],
            cache: Some(Database {
                primary: Some(Resource::new("db", "a", ())),
                replicas: vec![],
            }),
        };
        assert!(required_fields(&app).is_ok());
    }
}
