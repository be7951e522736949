//! Per-kind create and update policy
//!
//! A strategy decides what a valid object of its kind looks like and fills
//! in defaults before the object is written. The registry calls the helpers
//! here, never the trait methods directly, so the namespace rule and the
//! conversion of field errors into `ValidationFailed` stay in one place.

use kindstore_core::Context;
use uuid::Uuid;

use crate::config::NameFn;
use crate::error::{FieldError, RegistryError, RegistryResult};

/// Upper bound on generated names
pub const MAX_NAME_LENGTH: usize = 63;

/// Length of the random suffix on generated names
pub const RANDOM_SUFFIX_LENGTH: usize = 5;

/// Create policy for one resource kind
pub trait CreateStrategy<T>: Send + Sync {
    /// True if objects of this kind live inside a namespace
    fn namespace_scoped(&self) -> bool {
        true
    }

    /// Normalize the object before validation; may assign a generated name
    fn prepare_for_create(&self, _obj: &mut T) {}

    /// Field errors for a new object; empty means valid
    fn validate(&self, ctx: &Context, obj: &T) -> Vec<FieldError>;

    /// True if `obj`'s name was generated rather than chosen by the caller
    fn uses_generated_name(&self, _obj: &T) -> bool {
        false
    }
}

/// Update policy for one resource kind
pub trait UpdateStrategy<T>: Send + Sync {
    /// True if objects of this kind live inside a namespace
    fn namespace_scoped(&self) -> bool {
        true
    }

    /// True if Update on an absent object should create it
    fn allow_create_on_update(&self) -> bool {
        false
    }

    /// Carry over or reset fields from `old` before validation
    fn prepare_for_update(&self, _obj: &mut T, _old: &T) {}

    /// Field errors for replacing `old` with `obj`; empty means valid
    fn validate_update(&self, ctx: &Context, obj: &T, old: &T) -> Vec<FieldError>;
}

fn display_name<T>(name_fn: &NameFn<T>, obj: &T) -> String {
    name_fn(obj).unwrap_or_default()
}

fn check_namespace(scoped: bool, ctx: &Context, kind: &str, name: &str) -> RegistryResult<()> {
    if scoped && !ctx.has_namespace() {
        return Err(RegistryError::bad_request(
            kind,
            name,
            "the namespace of the object is required for a namespaced kind",
        ));
    }
    Ok(())
}

/// Run the create strategy against `obj`
///
/// Checks the namespace rule, prepares, then validates.
pub fn before_create<T, S>(
    strategy: &S,
    kind: &str,
    name_fn: &NameFn<T>,
    ctx: &Context,
    obj: &mut T,
) -> RegistryResult<()>
where
    S: CreateStrategy<T> + ?Sized,
{
    check_namespace(
        strategy.namespace_scoped(),
        ctx,
        kind,
        &display_name(name_fn, obj),
    )?;
    strategy.prepare_for_create(obj);

    let errors = strategy.validate(ctx, obj);
    if !errors.is_empty() {
        return Err(RegistryError::invalid(
            kind,
            &display_name(name_fn, obj),
            errors,
        ));
    }
    Ok(())
}

/// Run the update strategy against `obj`, which replaces `old`
pub fn before_update<T, S>(
    strategy: &S,
    kind: &str,
    name_fn: &NameFn<T>,
    ctx: &Context,
    obj: &mut T,
    old: &T,
) -> RegistryResult<()>
where
    S: UpdateStrategy<T> + ?Sized,
{
    let name = display_name(name_fn, obj);
    check_namespace(strategy.namespace_scoped(), ctx, kind, &name)?;
    strategy.prepare_for_update(obj, old);

    let errors = strategy.validate_update(ctx, obj, old);
    if !errors.is_empty() {
        return Err(RegistryError::invalid(kind, &name, errors));
    }
    Ok(())
}

/// Turn a collision on a generated name into a retryable error
///
/// Anything else passes through unchanged.
pub fn check_generated_name_error<T, S>(strategy: &S, err: RegistryError, obj: &T) -> RegistryError
where
    S: CreateStrategy<T> + ?Sized,
{
    match err {
        RegistryError::AlreadyExists { kind, name } if strategy.uses_generated_name(obj) => {
            RegistryError::server_timeout(&kind, &name, "create")
        }
        other => other,
    }
}

/// `base` plus a random lowercase suffix, kept within `MAX_NAME_LENGTH`
pub fn generate_name(base: &str) -> String {
    let max_base = MAX_NAME_LENGTH - RANDOM_SUFFIX_LENGTH;
    let base = match base.char_indices().nth(max_base) {
        Some((cut, _)) => &base[..cut],
        None => base,
    };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", base, &suffix[..RANDOM_SUFFIX_LENGTH])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Thing {
        name: String,
        generate_name: String,
        size: i64,
    }

    struct ThingStrategy {
        create_on_update: bool,
    }

    impl CreateStrategy<Thing> for ThingStrategy {
        fn prepare_for_create(&self, obj: &mut Thing) {
            if obj.name.is_empty() && !obj.generate_name.is_empty() {
                obj.name = generate_name(&obj.generate_name);
            }
        }

        fn validate(&self, _ctx: &Context, obj: &Thing) -> Vec<FieldError> {
            let mut errors = Vec::new();
            if obj.name.is_empty() {
                errors.push(FieldError::required("name"));
            }
            if obj.size < 0 {
                errors.push(FieldError::invalid("size", obj.size, "must be non-negative"));
            }
            errors
        }

        fn uses_generated_name(&self, obj: &Thing) -> bool {
            !obj.generate_name.is_empty()
        }
    }

    impl UpdateStrategy<Thing> for ThingStrategy {
        fn allow_create_on_update(&self) -> bool {
            self.create_on_update
        }

        fn prepare_for_update(&self, obj: &mut Thing, old: &Thing) {
            obj.generate_name = old.generate_name.clone();
        }

        fn validate_update(&self, _ctx: &Context, obj: &Thing, old: &Thing) -> Vec<FieldError> {
            if obj.size < old.size {
                vec![FieldError::invalid("size", obj.size, "may not shrink")]
            } else {
                Vec::new()
            }
        }
    }

    fn name_fn() -> NameFn<Thing> {
        Arc::new(|t: &Thing| Ok(t.name.clone()))
    }

    fn ns() -> Context {
        Context::with_namespace("ns1")
    }

    #[test]
    fn test_defaults() {
        let s = ThingStrategy { create_on_update: false };
        assert!(CreateStrategy::namespace_scoped(&s));
        assert!(!s.allow_create_on_update());
        assert!(!s.uses_generated_name(&Thing::default()));
    }

    #[test]
    fn test_before_create_generates_name() {
        let s = ThingStrategy { create_on_update: false };
        let mut obj = Thing {
            generate_name: "widget-".into(),
            ..Default::default()
        };
        before_create(&s, "widgets", &name_fn(), &ns(), &mut obj).unwrap();
        assert!(obj.name.starts_with("widget-"));
        assert_eq!(obj.name.len(), "widget-".len() + RANDOM_SUFFIX_LENGTH);
    }

    #[test]
    fn test_before_create_requires_namespace() {
        let s = ThingStrategy { create_on_update: false };
        let mut obj = Thing {
            name: "a".into(),
            ..Default::default()
        };
        let err = before_create(&s, "widgets", &name_fn(), &Context::new(), &mut obj).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_before_create_collects_field_errors() {
        let s = ThingStrategy { create_on_update: false };
        let mut obj = Thing {
            size: -1,
            ..Default::default()
        };
        let err = before_create(&s, "widgets", &name_fn(), &ns(), &mut obj).unwrap_err();
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_before_update_sees_old() {
        let s = ThingStrategy { create_on_update: true };
        let old = Thing {
            name: "a".into(),
            generate_name: "w-".into(),
            size: 5,
        };
        let mut grown = Thing {
            name: "a".into(),
            size: 6,
            ..Default::default()
        };
        before_update(&s, "widgets", &name_fn(), &ns(), &mut grown, &old).unwrap();
        assert_eq!(grown.generate_name, "w-");

        let mut shrunk = Thing {
            name: "a".into(),
            size: 4,
            ..Default::default()
        };
        let err = before_update(&s, "widgets", &name_fn(), &ns(), &mut shrunk, &old).unwrap_err();
        assert!(matches!(err, RegistryError::ValidationFailed { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_generated_name_collision_becomes_timeout() {
        let s = ThingStrategy { create_on_update: false };
        let generated = Thing {
            name: "w-abcde".into(),
            generate_name: "w-".into(),
            size: 0,
        };
        let chosen = Thing {
            name: "w".into(),
            ..Default::default()
        };

        let err = check_generated_name_error(
            &s,
            RegistryError::already_exists("widgets", "w-abcde"),
            &generated,
        );
        assert_eq!(err.status_code(), 504);

        let err = check_generated_name_error(&s, RegistryError::already_exists("widgets", "w"), &chosen);
        assert!(err.is_already_exists());

        let err = check_generated_name_error(
            &s,
            RegistryError::internal("widgets", "w-abcde", "boom"),
            &generated,
        );
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_generate_name_truncates_base() {
        let base = "x".repeat(100);
        let name = generate_name(&base);
        assert_eq!(name.len(), MAX_NAME_LENGTH);
        assert_ne!(generate_name("a-"), generate_name("a-"));
    }
}
